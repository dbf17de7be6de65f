pub mod account_service;
pub mod admin_aggregator;
pub mod funds_service;
pub mod trade_processor;

use sqlx::SqliteConnection;
use tracing::warn;

use crate::domain::entities::position::Holding;
use crate::domain::errors::{BrokerError, ValidationError};
use crate::persistence::models::PositionRecord;
use crate::persistence::repository::AccountRepository;

pub(crate) fn holding_of(position: &PositionRecord) -> Holding {
    Holding {
        units: position.units,
        unit_price: position.unit_price,
        total_value: position.total_value,
    }
}

/// Work out why a balance change of `delta` matched no row: unknown account,
/// a result outside the i64 range, or not enough cash.
pub(crate) async fn refused_balance_change(
    conn: &mut SqliteConnection,
    account_id: &str,
    delta: i64,
) -> BrokerError {
    let account = match AccountRepository::get_with(conn, account_id).await {
        Ok(Some(account)) => account,
        Ok(None) => return BrokerError::AccountNotFound,
        Err(e) => return BrokerError::Database(e),
    };

    if account.balance.checked_add(delta).is_none() {
        warn!(
            "Balance change of {} refused for {}: out of range from {}",
            delta, account_id, account.balance
        );
        return ValidationError::InvalidAmount(
            "balance would exceed the supported range".to_string(),
        )
        .into();
    }

    warn!(
        "Balance change of {} refused for {}: has {}",
        delta, account_id, account.balance
    );
    BrokerError::InsufficientBalance {
        required: delta.saturating_neg(),
        available: account.balance,
    }
}
