use serde::{Deserialize, Serialize};

use super::lenient::LenientInt;
use crate::domain::errors::ValidationError;

/// Number of shares in a trade; always at least one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "LenientInt", into = "i64")]
pub struct Units(i64);

impl Units {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value > 0 {
            Ok(Units(value))
        } else {
            Err(ValidationError::InvalidUnits(format!(
                "{} (must be at least 1)",
                value
            )))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<LenientInt> for Units {
    type Error = ValidationError;

    fn try_from(raw: LenientInt) -> Result<Self, Self::Error> {
        Units::new(raw.0)
    }
}

impl From<Units> for i64 {
    fn from(units: Units) -> Self {
        units.0
    }
}
