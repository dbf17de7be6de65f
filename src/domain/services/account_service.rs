//! AccountService - registration, credential checks and per-account reads

use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::domain::entities::account::{normalize_email, NewAccount};
use crate::domain::errors::{BrokerError, ValidationError};
use crate::persistence::models::{AccountRecord, CreateAccount, OrderRecord, PositionRecord, TransactionRecord};
use crate::persistence::repository::{
    AccountRepository, OrderRepository, PositionRepository, TransactionRepository,
};
use crate::persistence::{DatabaseError, DbPool};

/// Registration form as received from a client
pub struct Registration {
    pub username: String,
    pub email: String,
    pub usertype: String,
    pub password: Zeroizing<String>,
    pub tax_id: Option<String>,
}

#[derive(Clone)]
pub struct AccountService {
    accounts: AccountRepository,
    positions: PositionRepository,
    orders: OrderRepository,
    transactions: TransactionRepository,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(pool: DbPool, bcrypt_cost: u32) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            positions: PositionRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool),
            bcrypt_cost,
        }
    }

    /// Register a new account. Email and tax id must both be unused.
    pub async fn register(&self, form: Registration) -> Result<AccountRecord, BrokerError> {
        let new_account = NewAccount::new(
            &form.username,
            &form.email,
            &form.usertype,
            form.tax_id.as_deref(),
        )?;
        if form.password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        if self.accounts.find_by_email(&new_account.email).await?.is_some() {
            warn!("Registration refused, email already in use: {}", new_account.email);
            return Err(BrokerError::EmailTaken);
        }
        if let Some(tax_id) = &new_account.tax_id {
            if self.accounts.find_by_tax_id(tax_id).await?.is_some() {
                warn!("Registration refused, tax id already in use");
                return Err(BrokerError::TaxIdTaken);
            }
        }

        let password_hash = hash_password(form.password, self.bcrypt_cost).await?;

        let created = self
            .accounts
            .create(CreateAccount {
                username: new_account.username,
                email: new_account.email,
                role: new_account.role.to_string(),
                tax_id: new_account.tax_id,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                DatabaseError::UniqueViolation(msg) if msg.contains("tax_id") => BrokerError::TaxIdTaken,
                DatabaseError::UniqueViolation(_) => BrokerError::EmailTaken,
                other => BrokerError::Database(other),
            })?;

        info!("Registered {} account {}", created.role, created.id);
        Ok(created)
    }

    /// Check credentials and return the matching account. No session is created.
    pub async fn login(
        &self,
        email: &str,
        password: Zeroizing<String>,
    ) -> Result<AccountRecord, BrokerError> {
        let email = normalize_email(email)?;
        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(BrokerError::UnknownLogin)?;

        if !verify_password(password, account.password_hash.clone()).await? {
            warn!("Failed login for account {}", account.id);
            return Err(BrokerError::InvalidCredentials);
        }

        info!("Account {} logged in", account.id);
        Ok(account)
    }

    pub async fn get_account(&self, id: &str) -> Result<AccountRecord, BrokerError> {
        self.accounts
            .get(id)
            .await?
            .ok_or(BrokerError::AccountNotFound)
    }

    pub async fn portfolio(&self, account_id: &str) -> Result<Vec<PositionRecord>, BrokerError> {
        Ok(self.positions.list_by_account(account_id).await?)
    }

    pub async fn orders(&self, account_id: &str) -> Result<Vec<OrderRecord>, BrokerError> {
        Ok(self.orders.list_by_account(account_id).await?)
    }

    pub async fn transactions(&self, account_id: &str) -> Result<Vec<TransactionRecord>, BrokerError> {
        Ok(self.transactions.list_by_account(account_id).await?)
    }
}

/// bcrypt is deliberately slow, so it runs on the blocking pool
async fn hash_password(password: Zeroizing<String>, cost: u32) -> Result<String, BrokerError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password.as_str(), cost))
        .await
        .map_err(|e| BrokerError::Hashing(e.to_string()))?
        .map_err(BrokerError::from)
}

async fn verify_password(password: Zeroizing<String>, hash: String) -> Result<bool, BrokerError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password.as_str(), &hash))
        .await
        .map_err(|e| BrokerError::Hashing(e.to_string()))?
        .map_err(BrokerError::from)
}
