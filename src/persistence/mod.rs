//! Persistence Layer
//!
//! SQLite storage for accounts, positions, orders and the transaction ledger,
//! accessed asynchronously through sqlx.
//!
//! # Database Schema
//!
//! ## Accounts Table
//! - id: UUID
//! - username, email (unique), role ("Admin" or "Customer")
//! - tax_id: optional, unique when present
//! - password_hash: bcrypt hash
//! - balance: integer cash balance
//! - created_at / updated_at: timestamps, updated_at moves on every balance change
//!
//! ## Positions Table
//! One row per (account_id, symbol) with units, unit_price and total_value.
//!
//! ## Orders Table
//! Append-only buy/sell intents.
//!
//! ## Transactions Table
//! Append-only ledger of deposits, withdrawals, buys and sells.

pub mod models;
pub mod repository;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Database connection pool
pub type DbPool = SqlitePool;

/// Database error
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
}

impl DatabaseError {
    /// Map a sqlx error raised by an insert, surfacing unique-index violations
    pub(crate) fn from_insert(context: &str, e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return DatabaseError::UniqueViolation(db.message().to_string());
            }
        }
        DatabaseError::QueryError(format!("{}: {}", context, e))
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://data/brokersky.db")
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Log every statement at debug level
    pub log_queries: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/brokersky.db".to_string(),
            max_connections: 5,
            log_queries: cfg!(debug_assertions),
        }
    }
}

impl DatabaseConfig {
    /// In-memory database, used by tests
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            log_queries: false,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Initialize the database connection pool and bring the schema up to date
pub async fn init_database(config: &DatabaseConfig) -> Result<DbPool, DatabaseError> {
    info!("Initializing database: {}", config.url);

    // Ensure data directory exists
    if let Some(db_path) = config.url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Sqlx(sqlx::Error::Configuration(Box::new(e)))
                })?;
            }
        }
    }

    let mut options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    if !config.log_queries {
        options = options.disable_statement_logging();
    }

    // Every connection to ":memory:" is a separate database, so tests share a single
    // connection that is never recycled
    let pool_options = if config.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options = options.journal_mode(SqliteJournalMode::Wal);
        SqlitePoolOptions::new().max_connections(config.max_connections.max(1))
    };

    let pool = pool_options.connect_with(options).await?;

    run_migrations(&pool).await?;

    info!("✓ Database initialized successfully");

    Ok(pool)
}

const SCHEMA: &[(&str, &str)] = &[
    (
        "accounts table",
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL CHECK(role IN ('Admin', 'Customer')),
            tax_id TEXT UNIQUE,
            password_hash TEXT NOT NULL,
            balance INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    ),
    (
        "positions table",
        r#"
        CREATE TABLE IF NOT EXISTS positions (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL,
            symbol TEXT NOT NULL,
            name TEXT,
            unit_price INTEGER NOT NULL,
            units INTEGER NOT NULL CHECK(units > 0),
            total_value INTEGER NOT NULL,
            exchange TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            UNIQUE (account_id, symbol),
            FOREIGN KEY (account_id) REFERENCES accounts(id)
        )
        "#,
    ),
    (
        "orders table",
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('Buy', 'Sell')),
            units INTEGER NOT NULL,
            unit_value INTEGER NOT NULL,
            symbol TEXT NOT NULL,
            name TEXT,
            created_at DATETIME NOT NULL,
            FOREIGN KEY (account_id) REFERENCES accounts(id)
        )
        "#,
    ),
    (
        "transactions table",
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('Buy', 'Sell', 'Deposit', 'Withdrawal')),
            payment_mode TEXT NOT NULL,
            amount INTEGER NOT NULL,
            created_at DATETIME NOT NULL,
            FOREIGN KEY (account_id) REFERENCES accounts(id)
        )
        "#,
    ),
    (
        "index",
        "CREATE INDEX IF NOT EXISTS idx_accounts_role ON accounts(role)",
    ),
    (
        "index",
        "CREATE INDEX IF NOT EXISTS idx_orders_account ON orders(account_id, created_at)",
    ),
    (
        "index",
        "CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id, created_at)",
    ),
    (
        "index",
        "CREATE INDEX IF NOT EXISTS idx_transactions_kind ON transactions(kind)",
    ),
];

/// Run database migrations
async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    info!("Running database migrations...");

    for (what, statement) in SCHEMA {
        sqlx::query(statement).execute(pool).await.map_err(|e| {
            DatabaseError::MigrationError(format!("Failed to create {}: {}", what, e))
        })?;
    }

    info!("✓ Database migrations completed successfully");

    Ok(())
}
