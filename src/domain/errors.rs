use thiserror::Error;

use crate::persistence::DatabaseError;

/// Errors raised by the account, funds and trade services
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User does not exist")]
    AccountNotFound,

    /// Login attempted with an email nobody registered
    #[error("User does not exist")]
    UnknownLogin,

    #[error("User already exists")]
    EmailTaken,

    #[error("Tax id already registered")]
    TaxIdTaken,

    #[error("Incorrect password or email")]
    InvalidCredentials,

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Stock not found or insufficient quantity")]
    PositionNotFound { symbol: String },

    #[error("Not enough stock units to sell")]
    InsufficientUnits {
        symbol: String,
        held: i64,
        requested: i64,
    },

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for BrokerError {
    fn from(e: sqlx::Error) -> Self {
        BrokerError::Database(DatabaseError::from(e))
    }
}

impl From<ValidationError> for BrokerError {
    fn from(e: ValidationError) -> Self {
        BrokerError::InvalidInput(e.to_string())
    }
}

impl From<bcrypt::BcryptError> for BrokerError {
    fn from(e: bcrypt::BcryptError) -> Self {
        BrokerError::Hashing(e.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid units: {0}")]
    InvalidUnits(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Unknown {field}: {value}")]
    UnknownVariant { field: &'static str, value: String },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),
}
