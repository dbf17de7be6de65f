//! TradeProcessor - applies a buy or sell to the account balance, the position
//! store, the order ledger and the transaction ledger in one database transaction.
//!
//! The trade total is supplied by the caller and trusted; no market price is
//! looked up here.

use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::config::TradingRules;
use crate::domain::entities::order::{OrderKind, TradeRequest};
use crate::domain::entities::position::{Holding, SellOutcome};
use crate::domain::services::{holding_of, refused_balance_change};
use crate::domain::entities::transaction::{TransactionKind, TRADE_PAYMENT_MODE};
use crate::domain::errors::BrokerError;
use crate::persistence::models::{
    AccountRecord, CreateOrder, CreateTransaction, OrderRecord, PositionRecord, TransactionRecord,
    UpsertPosition,
};
use crate::persistence::repository::{
    AccountRepository, OrderRepository, PositionRepository, TransactionRepository,
};
use crate::persistence::DbPool;

/// Everything written by one trade
#[derive(Debug, Clone)]
pub struct TradeReceipt {
    pub account: AccountRecord,
    pub order: OrderRecord,
    pub transaction: TransactionRecord,
    /// Position after the trade; `None` once a sell closes it
    pub position: Option<PositionRecord>,
}

#[derive(Clone)]
pub struct TradeProcessor {
    pool: DbPool,
    rules: TradingRules,
}

impl TradeProcessor {
    pub fn new(pool: DbPool, rules: TradingRules) -> Self {
        Self { pool, rules }
    }

    /// Execute a trade. On any error nothing is persisted.
    pub async fn execute(&self, request: TradeRequest) -> Result<TradeReceipt, BrokerError> {
        let mut tx = self.pool.begin().await?;

        let (account, position) = match request.kind {
            OrderKind::Buy => self.buy(&mut *tx, &request).await?,
            OrderKind::Sell => self.sell(&mut *tx, &request).await?,
        };

        let transaction = TransactionRepository::create_with(
            &mut *tx,
            CreateTransaction {
                account_id: account.id.clone(),
                kind: TransactionKind::from(request.kind).to_string(),
                payment_mode: TRADE_PAYMENT_MODE.to_string(),
                amount: request.amount.value(),
            },
        )
        .await?;

        let order = OrderRepository::create_with(
            &mut *tx,
            CreateOrder {
                account_id: account.id.clone(),
                kind: request.kind.to_string(),
                units: request.units.value(),
                unit_value: request.amount.value(),
                symbol: request.symbol.clone(),
                name: request.name.clone(),
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            "{} {} x {} for {} (total {}), balance now {}",
            request.kind,
            request.units.value(),
            request.symbol,
            account.id,
            request.amount.value(),
            account.balance
        );

        Ok(TradeReceipt {
            account,
            order,
            transaction,
            position,
        })
    }

    async fn buy(
        &self,
        conn: &mut SqliteConnection,
        request: &TradeRequest,
    ) -> Result<(AccountRecord, Option<PositionRecord>), BrokerError> {
        let amount = request.amount.value();

        // The balance update goes first so that concurrent trades on the same
        // database queue on the write lock instead of failing a lock upgrade
        let account = match AccountRepository::adjust_balance_with(
            conn,
            &request.account_id,
            -amount,
            self.rules.balance_floor(),
        )
        .await?
        {
            Some(account) => account,
            None => return Err(refused_balance_change(conn, &request.account_id, -amount).await),
        };

        let existing = PositionRepository::find_with(conn, &account.id, &request.symbol).await?;
        let (holding, exchange) = match &existing {
            Some(p) => (
                holding_of(p)
                    .merge_buy(request.units, request.amount)
                    .map_err(BrokerError::from)?,
                p.exchange.clone(),
            ),
            None => (
                Holding::open(request.units, request.amount),
                self.rules.default_exchange.clone(),
            ),
        };

        let position = PositionRepository::upsert_with(
            conn,
            UpsertPosition {
                account_id: account.id.clone(),
                symbol: request.symbol.clone(),
                name: request.name.clone(),
                unit_price: holding.unit_price,
                units: holding.units,
                total_value: holding.total_value,
                exchange,
            },
        )
        .await?;

        Ok((account, Some(position)))
    }

    async fn sell(
        &self,
        conn: &mut SqliteConnection,
        request: &TradeRequest,
    ) -> Result<(AccountRecord, Option<PositionRecord>), BrokerError> {
        let credit = request.amount.value();
        let account =
            match AccountRepository::adjust_balance_with(conn, &request.account_id, credit, None)
                .await?
            {
                Some(account) => account,
                None => return Err(refused_balance_change(conn, &request.account_id, credit).await),
            };

        let position = PositionRepository::find_with(conn, &account.id, &request.symbol)
            .await?
            .ok_or_else(|| {
                warn!("Sell refused for {}: no {} position", account.id, request.symbol);
                BrokerError::PositionNotFound {
                    symbol: request.symbol.clone(),
                }
            })?;

        match holding_of(&position).sell(request.units) {
            SellOutcome::Insufficient { held } => {
                warn!(
                    "Sell refused for {}: holds {} {}, asked {}",
                    account.id,
                    held,
                    request.symbol,
                    request.units.value()
                );
                Err(BrokerError::InsufficientUnits {
                    symbol: request.symbol.clone(),
                    held,
                    requested: request.units.value(),
                })
            }
            SellOutcome::Closed => {
                PositionRepository::delete_with(conn, &position.id).await?;
                Ok((account, None))
            }
            SellOutcome::Reduced(rest) => {
                PositionRepository::update_holding_with(
                    conn,
                    &position.id,
                    rest.units,
                    rest.total_value,
                )
                .await?;
                let updated = PositionRecord {
                    units: rest.units,
                    total_value: rest.total_value,
                    ..position
                };
                Ok((account, Some(updated)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{amount::Amount, units::Units};
    use crate::persistence::models::CreateAccount;
    use crate::persistence::{init_database, DatabaseConfig};

    struct Fixture {
        pool: DbPool,
        processor: TradeProcessor,
        account_id: String,
    }

    async fn fixture_with(balance: i64, rules: TradingRules) -> Fixture {
        let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        let account = AccountRepository::new(pool.clone())
            .create(CreateAccount {
                username: "dave".to_string(),
                email: "dave@example.com".to_string(),
                role: "Customer".to_string(),
                tax_id: None,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        AccountRepository::adjust_balance_with(&mut *conn, &account.id, balance, None)
            .await
            .unwrap();
        drop(conn);

        Fixture {
            processor: TradeProcessor::new(pool.clone(), rules),
            pool,
            account_id: account.id,
        }
    }

    async fn fixture(balance: i64) -> Fixture {
        fixture_with(balance, TradingRules::default()).await
    }

    fn request(account_id: &str, kind: OrderKind, units: i64, amount: i64, symbol: &str) -> TradeRequest {
        TradeRequest::new(
            account_id,
            kind,
            Units::new(units).unwrap(),
            Amount::new(amount).unwrap(),
            symbol,
            Some("Test Corp"),
        )
        .unwrap()
    }

    async fn counts(pool: &DbPool) -> (i64, i64, i64) {
        let (positions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM positions")
            .fetch_one(pool)
            .await
            .unwrap();
        let (orders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(pool)
            .await
            .unwrap();
        let (transactions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions")
            .fetch_one(pool)
            .await
            .unwrap();
        (positions, orders, transactions)
    }

    async fn balance(f: &Fixture) -> i64 {
        AccountRepository::new(f.pool.clone())
            .get(&f.account_id)
            .await
            .unwrap()
            .unwrap()
            .balance
    }

    #[tokio::test]
    async fn test_buy_debits_balance_and_opens_position() {
        let f = fixture(5000).await;

        let receipt = f
            .processor
            .execute(request(&f.account_id, OrderKind::Buy, 10, 2000, "AAPL"))
            .await
            .unwrap();

        assert_eq!(receipt.account.balance, 3000);
        let position = receipt.position.unwrap();
        assert_eq!(position.units, 10);
        assert_eq!(position.total_value, 2000);
        assert_eq!(position.unit_price, 200);
        assert_eq!(position.exchange, "NASDAQ");
        assert_eq!(receipt.order.kind, "Buy");
        assert_eq!(receipt.order.unit_value, 2000);
        assert_eq!(receipt.transaction.kind, "Buy");
        assert_eq!(receipt.transaction.payment_mode, "stock");

        assert_eq!(balance(&f).await, 3000);
        assert_eq!(counts(&f.pool).await, (1, 1, 1));
    }

    #[tokio::test]
    async fn test_second_buy_merges_into_existing_position() {
        let f = fixture(10_000).await;
        f.processor
            .execute(request(&f.account_id, OrderKind::Buy, 10, 2000, "AAPL"))
            .await
            .unwrap();
        let receipt = f
            .processor
            .execute(request(&f.account_id, OrderKind::Buy, 10, 3000, "aapl"))
            .await
            .unwrap();

        let position = receipt.position.unwrap();
        assert_eq!(position.units, 20);
        assert_eq!(position.total_value, 5000);
        assert_eq!(position.unit_price, 250);
        assert_eq!(counts(&f.pool).await, (1, 2, 2));
        assert_eq!(balance(&f).await, 5000);
    }

    #[tokio::test]
    async fn test_buy_without_funds_is_refused_without_writes() {
        let f = fixture(1000).await;

        let err = f
            .processor
            .execute(request(&f.account_id, OrderKind::Buy, 10, 2000, "AAPL"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BrokerError::InsufficientBalance { required: 2000, available: 1000 }
        ));
        assert_eq!(balance(&f).await, 1000);
        assert_eq!(counts(&f.pool).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_buy_may_overdraw_when_allowed() {
        let rules = TradingRules {
            allow_negative_balance: true,
            ..TradingRules::default()
        };
        let f = fixture_with(1000, rules).await;

        let receipt = f
            .processor
            .execute(request(&f.account_id, OrderKind::Buy, 10, 2000, "AAPL"))
            .await
            .unwrap();
        assert_eq!(receipt.account.balance, -1000);
    }

    #[tokio::test]
    async fn test_partial_sell_credits_and_reduces() {
        let f = fixture(5000).await;
        f.processor
            .execute(request(&f.account_id, OrderKind::Buy, 10, 2000, "AAPL"))
            .await
            .unwrap();

        let receipt = f
            .processor
            .execute(request(&f.account_id, OrderKind::Sell, 4, 1000, "AAPL"))
            .await
            .unwrap();

        assert_eq!(receipt.account.balance, 4000);
        let position = receipt.position.unwrap();
        assert_eq!(position.units, 6);
        assert_eq!(position.total_value, 1200);
        assert_eq!(receipt.transaction.kind, "Sell");
        assert_eq!(counts(&f.pool).await, (1, 2, 2));
    }

    #[tokio::test]
    async fn test_selling_every_unit_removes_position() {
        let f = fixture(5000).await;
        f.processor
            .execute(request(&f.account_id, OrderKind::Buy, 10, 2000, "AAPL"))
            .await
            .unwrap();

        let receipt = f
            .processor
            .execute(request(&f.account_id, OrderKind::Sell, 10, 2500, "AAPL"))
            .await
            .unwrap();

        assert!(receipt.position.is_none());
        assert_eq!(receipt.account.balance, 5500);
        assert_eq!(counts(&f.pool).await, (0, 2, 2));
    }

    #[tokio::test]
    async fn test_oversell_is_refused_without_writes() {
        let f = fixture(5000).await;
        f.processor
            .execute(request(&f.account_id, OrderKind::Buy, 5, 1000, "AAPL"))
            .await
            .unwrap();

        let err = f
            .processor
            .execute(request(&f.account_id, OrderKind::Sell, 6, 1200, "AAPL"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BrokerError::InsufficientUnits { held: 5, requested: 6, .. }
        ));
        assert_eq!(balance(&f).await, 4000);
        assert_eq!(counts(&f.pool).await, (1, 1, 1));
    }

    #[tokio::test]
    async fn test_sell_without_position_is_refused() {
        let f = fixture(5000).await;

        let err = f
            .processor
            .execute(request(&f.account_id, OrderKind::Sell, 1, 100, "MSFT"))
            .await
            .unwrap_err();

        assert!(matches!(err, BrokerError::PositionNotFound { .. }));
        assert_eq!(balance(&f).await, 5000);
        assert_eq!(counts(&f.pool).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let f = fixture(0).await;

        for kind in [OrderKind::Buy, OrderKind::Sell] {
            let err = f
                .processor
                .execute(request("no-such-account", kind, 1, 10, "AAPL"))
                .await
                .unwrap_err();
            assert!(matches!(err, BrokerError::AccountNotFound));
        }
    }

    #[tokio::test]
    async fn test_buy_past_largest_position_value_is_refused_without_writes() {
        let f = fixture(i64::MAX).await;
        f.processor
            .execute(request(&f.account_id, OrderKind::Buy, 1, i64::MAX, "AAPL"))
            .await
            .unwrap();

        let mut conn = f.pool.acquire().await.unwrap();
        AccountRepository::adjust_balance_with(&mut *conn, &f.account_id, 10, None)
            .await
            .unwrap();
        drop(conn);

        let err = f
            .processor
            .execute(request(&f.account_id, OrderKind::Buy, 1, 10, "AAPL"))
            .await
            .unwrap_err();

        assert!(matches!(err, BrokerError::InvalidInput(_)));
        assert_eq!(balance(&f).await, 10);
        assert_eq!(counts(&f.pool).await, (1, 1, 1));
    }

    #[tokio::test]
    async fn test_sell_credit_past_largest_balance_is_refused() {
        let f = fixture(1000).await;
        f.processor
            .execute(request(&f.account_id, OrderKind::Buy, 5, 1000, "AAPL"))
            .await
            .unwrap();

        let mut conn = f.pool.acquire().await.unwrap();
        AccountRepository::adjust_balance_with(&mut *conn, &f.account_id, i64::MAX, None)
            .await
            .unwrap();
        drop(conn);

        let err = f
            .processor
            .execute(request(&f.account_id, OrderKind::Sell, 1, 10, "AAPL"))
            .await
            .unwrap_err();

        assert!(matches!(err, BrokerError::InvalidInput(_)));
        assert_eq!(balance(&f).await, i64::MAX);
        assert_eq!(counts(&f.pool).await, (1, 1, 1));
    }

    #[tokio::test]
    async fn test_concurrent_buys_cannot_overdraw() {
        let path = std::env::temp_dir().join(format!("brokersky-{}.db", uuid::Uuid::new_v4()));
        let config = DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            max_connections: 4,
            log_queries: false,
        };
        let pool = init_database(&config).await.unwrap();
        let account = AccountRepository::new(pool.clone())
            .create(CreateAccount {
                username: "gina".to_string(),
                email: "gina@example.com".to_string(),
                role: "Customer".to_string(),
                tax_id: None,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let mut conn = pool.acquire().await.unwrap();
        AccountRepository::adjust_balance_with(&mut *conn, &account.id, 1000, None)
            .await
            .unwrap();
        drop(conn);

        let first = TradeProcessor::new(pool.clone(), TradingRules::default());
        let second = first.clone();
        let (a, b) = tokio::join!(
            first.execute(request(&account.id, OrderKind::Buy, 1, 600, "AAPL")),
            second.execute(request(&account.id, OrderKind::Buy, 1, 600, "MSFT")),
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(BrokerError::InsufficientBalance { required: 600, .. }))));

        let stored = AccountRepository::new(pool.clone())
            .get(&account.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.balance, 400);
        assert!(stored.balance >= 0);
        assert_eq!(counts(&pool).await, (1, 1, 1));

        pool.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
