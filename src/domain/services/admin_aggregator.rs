//! AdminAggregator - read-only statistics for the admin dashboard

use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::StatsConfig;
use crate::domain::entities::account::Role;
use crate::domain::errors::BrokerError;
use crate::domain::services::holding_of;
use crate::persistence::models::TransactionRecord;
use crate::persistence::repository::{AccountRepository, PositionRepository, TransactionRepository};
use crate::persistence::DbPool;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindSummary {
    pub count: i64,
    /// Rendered with two decimals
    pub total_amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionStats {
    pub total: i64,
    pub recent: i64,
    /// Keyed by transaction kind; kinds never seen are absent
    pub details: BTreeMap<String, KindSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: i64,
    pub active_users: i64,
    pub inactive_users: i64,
    pub new_users: i64,
    pub total_portfolio_value: String,
    pub transactions: TransactionStats,
}

#[derive(Clone)]
pub struct AdminAggregator {
    accounts: AccountRepository,
    positions: PositionRepository,
    transactions: TransactionRepository,
    windows: StatsConfig,
}

impl AdminAggregator {
    pub fn new(pool: DbPool, windows: StatsConfig) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            positions: PositionRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool),
            windows,
        }
    }

    /// Only Customer accounts count as users
    pub async fn stats(&self) -> Result<AdminStats, BrokerError> {
        let now = Utc::now();
        let active_since = now - Duration::days(self.windows.active_window_days);
        let new_since = now - Duration::days(self.windows.new_window_days);
        let customer = Role::Customer.as_str();

        let total_users = self.accounts.count_by_role(customer).await?;
        let active_users = self
            .accounts
            .count_by_role_updated_since(customer, active_since)
            .await?;
        let new_users = self
            .accounts
            .count_by_role_created_since(customer, new_since)
            .await?;
        let portfolio_value: i128 = self
            .positions
            .list_all()
            .await?
            .iter()
            .map(|p| holding_of(p).market_value())
            .sum();

        let total = self.transactions.count().await?;
        // Recent transactions share the active-user window
        let recent = self.transactions.count_since(active_since).await?;
        let details = self
            .transactions
            .totals_by_kind()
            .await?
            .into_iter()
            .map(|t| {
                (
                    t.kind,
                    KindSummary {
                        count: t.count,
                        total_amount: two_decimals(t.total_amount),
                    },
                )
            })
            .collect();

        Ok(AdminStats {
            total_users,
            active_users,
            inactive_users: total_users - active_users,
            new_users,
            total_portfolio_value: two_decimals(portfolio_value),
            transactions: TransactionStats {
                total,
                recent,
                details,
            },
        })
    }

    pub async fn all_transactions(&self) -> Result<Vec<TransactionRecord>, BrokerError> {
        Ok(self.transactions.list_all().await?)
    }
}

/// Amounts are whole numbers, so the fraction is always zero
fn two_decimals(value: i128) -> String {
    format!("{}.00", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TradingRules;
    use crate::domain::entities::order::{OrderKind, TradeRequest};
    use crate::domain::services::funds_service::{FundsMovement, FundsService};
    use crate::domain::services::trade_processor::TradeProcessor;
    use crate::domain::value_objects::{amount::Amount, units::Units};
    use crate::persistence::models::{CreateAccount, UpsertPosition};
    use crate::persistence::{init_database, DatabaseConfig};

    async fn seed_account(pool: &DbPool, email: &str, role: &str) -> String {
        AccountRepository::new(pool.clone())
            .create(CreateAccount {
                username: "user".to_string(),
                email: email.to_string(),
                role: role.to_string(),
                tax_id: None,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[test]
    fn test_two_decimals() {
        assert_eq!(two_decimals(0), "0.00");
        assert_eq!(two_decimals(2000), "2000.00");
        assert_eq!(two_decimals(-15), "-15.00");
    }

    #[tokio::test]
    async fn test_stats_on_empty_store() {
        let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        let stats = AdminAggregator::new(pool, StatsConfig::default())
            .stats()
            .await
            .unwrap();

        assert_eq!(stats.total_users, 0);
        assert_eq!(stats.inactive_users, 0);
        assert_eq!(stats.total_portfolio_value, "0.00");
        assert_eq!(stats.transactions.total, 0);
        assert!(stats.transactions.details.is_empty());
    }

    #[tokio::test]
    async fn test_stats_count_customers_and_ledger() {
        let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        let customer = seed_account(&pool, "erin@example.com", "Customer").await;
        seed_account(&pool, "frank@example.com", "Customer").await;
        seed_account(&pool, "root@example.com", "Admin").await;

        let funds = FundsService::new(pool.clone(), TradingRules::default());
        funds
            .deposit(FundsMovement {
                email: "erin@example.com".to_string(),
                amount: Amount::new(5000).unwrap(),
                mode: "UPI".to_string(),
            })
            .await
            .unwrap();

        let trades = TradeProcessor::new(pool.clone(), TradingRules::default());
        let buy = TradeRequest::new(
            &customer,
            OrderKind::Buy,
            Units::new(10).unwrap(),
            Amount::new(2000).unwrap(),
            "AAPL",
            None,
        )
        .unwrap();
        trades.execute(buy).await.unwrap();

        let aggregator = AdminAggregator::new(pool, StatsConfig::default());
        let stats = aggregator.stats().await.unwrap();

        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.active_users, 2);
        assert_eq!(stats.inactive_users, 0);
        assert_eq!(stats.new_users, 2);
        assert_eq!(stats.total_portfolio_value, "2000.00");
        assert_eq!(stats.transactions.total, 2);
        assert_eq!(stats.transactions.recent, 2);
        assert_eq!(
            stats.transactions.details.get("Deposit"),
            Some(&KindSummary {
                count: 1,
                total_amount: "5000.00".to_string()
            })
        );
        assert_eq!(stats.transactions.details["Buy"].total_amount, "2000.00");
        assert!(!stats.transactions.details.contains_key("Sell"));

        assert_eq!(aggregator.all_transactions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stats_sum_past_largest_single_value() {
        let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        let customer = seed_account(&pool, "hank@example.com", "Customer").await;

        let mut conn = pool.acquire().await.unwrap();
        for symbol in ["AAPL", "MSFT"] {
            PositionRepository::upsert_with(
                &mut *conn,
                UpsertPosition {
                    account_id: customer.clone(),
                    symbol: symbol.to_string(),
                    name: None,
                    unit_price: i64::MAX,
                    units: 1,
                    total_value: i64::MAX,
                    exchange: "NASDAQ".to_string(),
                },
            )
            .await
            .unwrap();
        }
        drop(conn);

        seed_account(&pool, "ivy@example.com", "Customer").await;
        let funds = FundsService::new(pool.clone(), TradingRules::default());
        for email in ["hank@example.com", "ivy@example.com"] {
            let movement = FundsMovement {
                email: email.to_string(),
                amount: Amount::new(i64::MAX).unwrap(),
                mode: "UPI".to_string(),
            };
            funds.deposit(movement).await.unwrap();
        }

        let stats = AdminAggregator::new(pool, StatsConfig::default())
            .stats()
            .await
            .unwrap();

        let double_max = 2 * i128::from(i64::MAX);
        assert_eq!(stats.total_portfolio_value, format!("{}.00", double_max));
        assert_eq!(
            stats.transactions.details["Deposit"].total_amount,
            format!("{}.00", double_max)
        );
    }

    #[test]
    fn test_stats_serialize_with_dashboard_names() {
        let stats = AdminStats {
            total_users: 3,
            active_users: 1,
            inactive_users: 2,
            new_users: 0,
            total_portfolio_value: "10.00".to_string(),
            transactions: TransactionStats {
                total: 0,
                recent: 0,
                details: BTreeMap::new(),
            },
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalUsers"], 3);
        assert_eq!(json["inactiveUsers"], 2);
        assert_eq!(json["totalPortfolioValue"], "10.00");
        assert!(json["transactions"]["details"].is_object());
    }
}
