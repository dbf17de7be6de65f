//! Holding arithmetic for a single (account, symbol) position.

use crate::domain::errors::ValidationError;
use crate::domain::value_objects::{amount::Amount, units::Units};

/// Units held for one symbol together with their cost basis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holding {
    pub units: i64,
    pub unit_price: i64,
    pub total_value: i64,
}

/// Result of taking units out of a holding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellOutcome {
    /// Units remain; the holding is updated
    Reduced(Holding),
    /// Every unit was sold; the holding should be removed
    Closed,
    /// Fewer units are held than requested
    Insufficient { held: i64 },
}

impl Holding {
    /// Holding created by a first purchase. Unit price is the integer share of the total.
    pub fn open(units: Units, amount: Amount) -> Self {
        Holding {
            units: units.value(),
            unit_price: amount.value() / units.value(),
            total_value: amount.value(),
        }
    }

    /// Fold another purchase of the same symbol into this holding.
    ///
    /// Fails when the combined units or value no longer fit in an `i64`.
    pub fn merge_buy(&self, units: Units, amount: Amount) -> Result<Self, ValidationError> {
        let units = self.units.checked_add(units.value()).ok_or_else(|| {
            ValidationError::InvalidUnits("position would exceed the largest unit count".to_string())
        })?;
        let total_value = self.total_value.checked_add(amount.value()).ok_or_else(|| {
            ValidationError::InvalidAmount("position would exceed the largest value".to_string())
        })?;
        Ok(Holding {
            units,
            unit_price: total_value / units,
            total_value,
        })
    }

    /// Remove `units` from the holding, revaluing what remains at the stored unit price
    pub fn sell(&self, units: Units) -> SellOutcome {
        let requested = units.value();
        if self.units < requested {
            return SellOutcome::Insufficient { held: self.units };
        }

        let remaining = self.units - requested;
        if remaining == 0 {
            return SellOutcome::Closed;
        }

        SellOutcome::Reduced(Holding {
            units: remaining,
            unit_price: self.unit_price,
            total_value: remaining * self.unit_price,
        })
    }

    /// Market value at the stored unit price, widened so sums over many holdings cannot overflow
    pub fn market_value(&self) -> i128 {
        i128::from(self.units) * i128::from(self.unit_price)
    }
}
