use serde::{Deserialize, Serialize};

use super::lenient::LenientInt;
use crate::domain::errors::ValidationError;

/// Whole-currency amount moved by a deposit, withdrawal or trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "LenientInt", into = "i64")]
pub struct Amount(i64);

impl Amount {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value >= 0 {
            Ok(Amount(value))
        } else {
            Err(ValidationError::InvalidAmount(format!(
                "{} (must be non-negative)",
                value
            )))
        }
    }

    /// Amount that must move money, used by deposits and withdrawals
    pub fn positive(value: i64) -> Result<Self, ValidationError> {
        if value > 0 {
            Ok(Amount(value))
        } else {
            Err(ValidationError::InvalidAmount(format!(
                "{} (must be greater than zero)",
                value
            )))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<LenientInt> for Amount {
    type Error = ValidationError;

    fn try_from(raw: LenientInt) -> Result<Self, Self::Error> {
        Amount::new(raw.0)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_new_valid() {
        assert_eq!(Amount::new(100).unwrap().value(), 100);
        assert_eq!(Amount::new(0).unwrap().value(), 0);
    }

    #[test]
    fn test_amount_new_negative() {
        let err = Amount::new(-10).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAmount(_)));
    }

    #[test]
    fn test_amount_positive_rejects_zero() {
        assert!(Amount::positive(0).is_err());
        assert!(Amount::positive(1).is_ok());
    }

    #[test]
    fn test_amount_deserializes_truncated() {
        let amount: Amount = serde_json::from_str("1999.99").unwrap();
        assert_eq!(amount.value(), 1999);

        let amount: Amount = serde_json::from_str("\"500\"").unwrap();
        assert_eq!(amount.value(), 500);

        assert!(serde_json::from_str::<Amount>("-5").is_err());
    }

    #[test]
    fn test_amount_serializes_as_plain_integer() {
        let json = serde_json::to_string(&Amount::new(42).unwrap()).unwrap();
        assert_eq!(json, "42");
    }
}
