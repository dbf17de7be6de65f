//! FundsService - deposits and withdrawals against an account's cash balance

use tracing::info;

use crate::config::TradingRules;
use crate::domain::entities::account::normalize_email;
use crate::domain::entities::transaction::TransactionKind;
use crate::domain::errors::{BrokerError, ValidationError};
use crate::domain::services::refused_balance_change;
use crate::domain::value_objects::amount::Amount;
use crate::persistence::models::{AccountRecord, CreateTransaction};
use crate::persistence::repository::{AccountRepository, TransactionRepository};
use crate::persistence::DbPool;

/// A deposit or withdrawal request
#[derive(Debug, Clone)]
pub struct FundsMovement {
    pub email: String,
    pub amount: Amount,
    pub mode: String,
}

#[derive(Clone)]
pub struct FundsService {
    pool: DbPool,
    accounts: AccountRepository,
    rules: TradingRules,
}

impl FundsService {
    pub fn new(pool: DbPool, rules: TradingRules) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            pool,
            rules,
        }
    }

    pub async fn deposit(&self, movement: FundsMovement) -> Result<AccountRecord, BrokerError> {
        self.apply(TransactionKind::Deposit, movement).await
    }

    /// Mirror image of a deposit; refused when it would overdraw the account
    pub async fn withdraw(&self, movement: FundsMovement) -> Result<AccountRecord, BrokerError> {
        self.apply(TransactionKind::Withdrawal, movement).await
    }

    async fn apply(
        &self,
        kind: TransactionKind,
        movement: FundsMovement,
    ) -> Result<AccountRecord, BrokerError> {
        let amount = Amount::positive(movement.amount.value())?.value();
        let mode = movement.mode.trim();
        if mode.is_empty() {
            return Err(ValidationError::MissingField("mode").into());
        }

        let email = normalize_email(&movement.email)?;
        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(BrokerError::AccountNotFound)?;

        let floor = match kind {
            TransactionKind::Withdrawal => self.rules.balance_floor(),
            _ => None,
        };

        let mut tx = self.pool.begin().await?;

        let delta = kind.balance_sign() * amount;
        let updated =
            match AccountRepository::adjust_balance_with(&mut *tx, &account.id, delta, floor).await? {
                Some(updated) => updated,
                None => return Err(refused_balance_change(&mut *tx, &account.id, delta).await),
            };

        TransactionRepository::create_with(
            &mut *tx,
            CreateTransaction {
                account_id: account.id.clone(),
                kind: kind.to_string(),
                payment_mode: mode.to_string(),
                amount,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            "{} of {} via {} for {}, balance now {}",
            kind, amount, mode, updated.id, updated.balance
        );
        Ok(updated)
    }
}
