use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::errors::ValidationError;
use crate::domain::value_objects::{amount::Amount, units::Units};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Buy,
    Sell,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Buy => "Buy",
            OrderKind::Sell => "Sell",
        }
    }
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(OrderKind::Buy),
            "sell" => Ok(OrderKind::Sell),
            _ => Err(ValidationError::UnknownVariant {
                field: "type",
                value: s.to_string(),
            }),
        }
    }
}

/// A buy or sell intent as submitted by a client.
///
/// `amount` is the total for the whole trade (units times unit price), computed
/// by the client and trusted as-is.
#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub account_id: String,
    pub kind: OrderKind,
    pub units: Units,
    pub amount: Amount,
    pub symbol: String,
    pub name: Option<String>,
}

impl TradeRequest {
    pub fn new(
        account_id: &str,
        kind: OrderKind,
        units: Units,
        amount: Amount,
        symbol: &str,
        name: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(ValidationError::MissingField("user"));
        }

        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(ValidationError::InvalidSymbol("symbol must not be empty".to_string()));
        }
        if !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^'))
        {
            return Err(ValidationError::InvalidSymbol(symbol.to_string()));
        }

        Ok(TradeRequest {
            account_id: account_id.to_string(),
            kind,
            units,
            amount,
            symbol: symbol.to_uppercase(),
            name: name.map(str::trim).filter(|n| !n.is_empty()).map(String::from),
        })
    }
}
