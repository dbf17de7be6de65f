//! Database Repository
//!
//! Data access layer for accounts, positions, orders and the transaction ledger.
//!
//! Methods ending in `_with` take a connection so they can run inside a caller's
//! database transaction; the others use the pool directly.

use super::models::*;
use super::{DatabaseError, DbPool};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, error};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Account repository
#[derive(Clone)]
pub struct AccountRepository {
    pool: DbPool,
}

impl AccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new account with a zero balance
    pub async fn create(&self, account: CreateAccount) -> Result<AccountRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, AccountRecord>(
            r#"
            INSERT INTO accounts (
                id, username, email, role, tax_id, password_hash,
                balance, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.role)
        .bind(&account.tax_id)
        .bind(&account.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create account for {}: {}", account.email, e);
            DatabaseError::from_insert("Failed to create account", e)
        })?;

        debug!("Created account: {} ({})", record.id, record.email);
        Ok(record)
    }

    /// Get account by ID
    pub async fn get(&self, id: &str) -> Result<Option<AccountRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, AccountRecord>("SELECT * FROM accounts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get account {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to get account: {}", e))
            })?;

        Ok(record)
    }

    /// Get account by (normalized) email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, DatabaseError> {
        let record =
            sqlx::query_as::<_, AccountRecord>("SELECT * FROM accounts WHERE email = ?1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    error!("Failed to look up account by email: {}", e);
                    DatabaseError::QueryError(format!("Failed to get account: {}", e))
                })?;

        Ok(record)
    }

    /// Get account by tax id
    pub async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<AccountRecord>, DatabaseError> {
        let record =
            sqlx::query_as::<_, AccountRecord>("SELECT * FROM accounts WHERE tax_id = ?1")
                .bind(tax_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    error!("Failed to look up account by tax id: {}", e);
                    DatabaseError::QueryError(format!("Failed to get account: {}", e))
                })?;

        Ok(record)
    }

    /// Get account by ID on the given connection
    pub async fn get_with(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> Result<Option<AccountRecord>, DatabaseError> {
        sqlx::query_as::<_, AccountRecord>("SELECT * FROM accounts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to get account: {}", e)))
    }

    /// Add `delta` to the balance in a single statement.
    ///
    /// When `floor` is set the update only applies if the resulting balance stays
    /// at or above it. Returns `None` if the account does not exist, the floor
    /// would be crossed, or the new balance would not fit in an `i64`.
    pub async fn adjust_balance_with(
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
        floor: Option<i64>,
    ) -> Result<Option<AccountRecord>, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, AccountRecord>(
            r#"
            UPDATE accounts
            SET balance = balance + ?1, updated_at = ?2
            WHERE id = ?3
              AND (?4 IS NULL OR balance + ?1 >= ?4)
              AND (?1 <= 0 OR balance <= 9223372036854775807 - ?1)
              AND (?1 >= 0 OR balance >= (-9223372036854775807 - 1) - ?1)
            RETURNING *
            "#,
        )
        .bind(delta)
        .bind(now)
        .bind(id)
        .bind(floor)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to adjust balance of {}: {}", id, e);
            DatabaseError::QueryError(format!("Failed to update balance: {}", e))
        })?;

        if let Some(ref r) = record {
            debug!("Balance of {} moved by {} to {}", id, delta, r.balance);
        }
        Ok(record)
    }

    /// Count accounts with the given role
    pub async fn count_by_role(&self, role: &str) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE role = ?1")
            .bind(role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to count accounts: {}", e)))?;
        Ok(count)
    }

    /// Count accounts with the given role updated after `since`
    pub async fn count_by_role_updated_since(
        &self,
        role: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE role = ?1 AND updated_at > ?2")
                .bind(role)
                .bind(since)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    DatabaseError::QueryError(format!("Failed to count active accounts: {}", e))
                })?;
        Ok(count)
    }

    /// Count accounts with the given role created after `since`
    pub async fn count_by_role_created_since(
        &self,
        role: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE role = ?1 AND created_at > ?2")
                .bind(role)
                .bind(since)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    DatabaseError::QueryError(format!("Failed to count new accounts: {}", e))
                })?;
        Ok(count)
    }
}

/// Position repository
#[derive(Clone)]
pub struct PositionRepository {
    pool: DbPool,
}

impl PositionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// All positions held by an account
    pub async fn list_by_account(&self, account_id: &str) -> Result<Vec<PositionRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, PositionRecord>(
            "SELECT * FROM positions WHERE account_id = ?1 ORDER BY symbol ASC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get positions for {}: {}", account_id, e);
            DatabaseError::QueryError(format!("Failed to get positions: {}", e))
        })?;

        Ok(records)
    }

    /// Every position of every account
    pub async fn list_all(&self) -> Result<Vec<PositionRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, PositionRecord>(
            "SELECT * FROM positions ORDER BY account_id ASC, symbol ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("Failed to list positions: {}", e)))?;

        Ok(records)
    }

    /// Position for (account, symbol) on the given connection
    pub async fn find_with(
        conn: &mut SqliteConnection,
        account_id: &str,
        symbol: &str,
    ) -> Result<Option<PositionRecord>, DatabaseError> {
        sqlx::query_as::<_, PositionRecord>(
            "SELECT * FROM positions WHERE account_id = ?1 AND symbol = ?2",
        )
        .bind(account_id)
        .bind(symbol)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("Failed to get position: {}", e)))
    }

    /// Insert the position, or overwrite the holding of the existing (account, symbol) row
    pub async fn upsert_with(
        conn: &mut SqliteConnection,
        position: UpsertPosition,
    ) -> Result<PositionRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, PositionRecord>(
            r#"
            INSERT INTO positions (
                id, account_id, symbol, name, unit_price, units,
                total_value, exchange, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            ON CONFLICT (account_id, symbol) DO UPDATE SET
                name = COALESCE(excluded.name, positions.name),
                unit_price = excluded.unit_price,
                units = excluded.units,
                total_value = excluded.total_value,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&position.account_id)
        .bind(&position.symbol)
        .bind(&position.name)
        .bind(position.unit_price)
        .bind(position.units)
        .bind(position.total_value)
        .bind(&position.exchange)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to upsert position {}: {}", position.symbol, e);
            DatabaseError::QueryError(format!("Failed to save position: {}", e))
        })?;

        debug!(
            "Position {} for {} now holds {} units",
            record.symbol, record.account_id, record.units
        );
        Ok(record)
    }

    /// Update units and value of an existing position
    pub async fn update_holding_with(
        conn: &mut SqliteConnection,
        id: &str,
        units: i64,
        total_value: i64,
    ) -> Result<(), DatabaseError> {
        let rows_affected = sqlx::query(
            "UPDATE positions SET units = ?1, total_value = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(units)
        .bind(total_value)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("Failed to update position: {}", e)))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::QueryError(format!("Position not found: {}", id)));
        }
        Ok(())
    }

    /// Remove a position once every unit is sold
    pub async fn delete_with(conn: &mut SqliteConnection, id: &str) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM positions WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to delete position: {}", e)))?;

        debug!("Deleted position: {}", id);
        Ok(())
    }
}

/// Order repository
#[derive(Clone)]
pub struct OrderRepository {
    pool: DbPool,
}

impl OrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Orders placed by an account, newest first
    pub async fn list_by_account(&self, account_id: &str) -> Result<Vec<OrderRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, OrderRecord>(
            "SELECT * FROM orders WHERE account_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get orders for {}: {}", account_id, e);
            DatabaseError::QueryError(format!("Failed to get orders: {}", e))
        })?;

        Ok(records)
    }

    /// Append an order on the given connection
    pub async fn create_with(
        conn: &mut SqliteConnection,
        order: CreateOrder,
    ) -> Result<OrderRecord, DatabaseError> {
        let record = sqlx::query_as::<_, OrderRecord>(
            r#"
            INSERT INTO orders (id, account_id, kind, units, unit_value, symbol, name, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&order.account_id)
        .bind(&order.kind)
        .bind(order.units)
        .bind(order.unit_value)
        .bind(&order.symbol)
        .bind(&order.name)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to create order: {}", e);
            DatabaseError::QueryError(format!("Failed to create order: {}", e))
        })?;

        debug!("Created order: {} {} {}", record.id, record.kind, record.symbol);
        Ok(record)
    }
}

/// Per-kind ledger totals. The amount is widened since many large entries can
/// sum past `i64::MAX`.
#[derive(Debug, Clone, PartialEq)]
pub struct KindTotals {
    pub kind: String,
    pub count: i64,
    pub total_amount: i128,
}

/// Transaction ledger repository
#[derive(Clone)]
pub struct TransactionRepository {
    pool: DbPool,
}

impl TransactionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append a ledger entry on the given connection
    pub async fn create_with(
        conn: &mut SqliteConnection,
        entry: CreateTransaction,
    ) -> Result<TransactionRecord, DatabaseError> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            INSERT INTO transactions (id, account_id, kind, payment_mode, amount, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&entry.account_id)
        .bind(&entry.kind)
        .bind(&entry.payment_mode)
        .bind(entry.amount)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to create transaction: {}", e);
            DatabaseError::QueryError(format!("Failed to create transaction: {}", e))
        })?;

        debug!(
            "Recorded {} of {} for {}",
            record.kind, record.amount, record.account_id
        );
        Ok(record)
    }

    /// Ledger entries of an account, newest first
    pub async fn list_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<TransactionRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM transactions WHERE account_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get transactions for {}: {}", account_id, e);
            DatabaseError::QueryError(format!("Failed to get transactions: {}", e))
        })?;

        Ok(records)
    }

    /// Every ledger entry, newest first
    pub async fn list_all(&self) -> Result<Vec<TransactionRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM transactions ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get transactions: {}", e);
            DatabaseError::QueryError(format!("Failed to get transactions: {}", e))
        })?;

        Ok(records)
    }

    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DatabaseError::QueryError(format!("Failed to count transactions: {}", e))
            })?;
        Ok(count)
    }

    pub async fn count_since(&self, since: DateTime<Utc>) -> Result<i64, DatabaseError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE created_at > ?1")
                .bind(since)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    DatabaseError::QueryError(format!("Failed to count transactions: {}", e))
                })?;
        Ok(count)
    }

    /// Count and amount per transaction kind, ordered by kind
    pub async fn totals_by_kind(&self) -> Result<Vec<KindTotals>, DatabaseError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT kind, amount FROM transactions ORDER BY kind")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    DatabaseError::QueryError(format!("Failed to aggregate transactions: {}", e))
                })?;

        let mut totals: Vec<KindTotals> = Vec::new();
        for (kind, amount) in rows {
            match totals.last_mut() {
                Some(last) if last.kind == kind => {
                    last.count += 1;
                    last.total_amount += i128::from(amount);
                }
                _ => totals.push(KindTotals {
                    kind,
                    count: 1,
                    total_amount: i128::from(amount),
                }),
            }
        }
        Ok(totals)
    }
}
