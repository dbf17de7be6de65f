use serde::{Deserialize, Serialize};

use super::order::OrderKind;

/// Payment mode recorded for trade-driven ledger entries
pub const TRADE_PAYMENT_MODE: &str = "stock";

/// Kind of balance-affecting event in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Buy,
    Sell,
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Buy => "Buy",
            TransactionKind::Sell => "Sell",
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Withdrawal => "Withdrawal",
        }
    }

    /// Sign applied to the account balance
    pub fn balance_sign(&self) -> i64 {
        match self {
            TransactionKind::Sell | TransactionKind::Deposit => 1,
            TransactionKind::Buy | TransactionKind::Withdrawal => -1,
        }
    }
}

impl From<OrderKind> for TransactionKind {
    fn from(kind: OrderKind) -> Self {
        match kind {
            OrderKind::Buy => TransactionKind::Buy,
            OrderKind::Sell => TransactionKind::Sell,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_sign() {
        assert_eq!(TransactionKind::Deposit.balance_sign(), 1);
        assert_eq!(TransactionKind::Sell.balance_sign(), 1);
        assert_eq!(TransactionKind::Withdrawal.balance_sign(), -1);
        assert_eq!(TransactionKind::Buy.balance_sign(), -1);
    }

    #[test]
    fn test_from_order_kind() {
        assert_eq!(TransactionKind::from(OrderKind::Buy), TransactionKind::Buy);
        assert_eq!(TransactionKind::from(OrderKind::Sell), TransactionKind::Sell);
    }
}
