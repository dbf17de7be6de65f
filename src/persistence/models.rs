//! Database Models
//!
//! Rows as stored, serialized with the field names the web clients read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "usertype")]
    pub role: String, // "Admin" or "Customer"
    #[serde(rename = "panCardNumber")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Position ("stock") record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "user")]
    pub account_id: String,
    pub symbol: String,
    pub name: Option<String>,
    #[serde(rename = "price")]
    pub unit_price: i64,
    pub units: i64,
    #[serde(rename = "totalPrice")]
    pub total_value: i64,
    #[serde(rename = "stockExchange")]
    pub exchange: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "user")]
    pub account_id: String,
    #[serde(rename = "type")]
    pub kind: String, // "Buy" or "Sell"
    pub units: i64,
    #[serde(rename = "price")]
    pub unit_value: i64,
    pub symbol: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ledger record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "user")]
    pub account_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub payment_mode: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Create account input
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub username: String,
    pub email: String,
    pub role: String,
    pub tax_id: Option<String>,
    pub password_hash: String,
}

/// Create or merge position input
#[derive(Debug, Clone)]
pub struct UpsertPosition {
    pub account_id: String,
    pub symbol: String,
    pub name: Option<String>,
    pub unit_price: i64,
    pub units: i64,
    pub total_value: i64,
    pub exchange: String,
}

/// Create order input
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub account_id: String,
    pub kind: String,
    pub units: i64,
    pub unit_value: i64,
    pub symbol: String,
    pub name: Option<String>,
}

/// Create ledger entry input
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub account_id: String,
    pub kind: String,
    pub payment_mode: String,
    pub amount: i64,
}
