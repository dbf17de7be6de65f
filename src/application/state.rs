use crate::config::AppConfig;
use crate::domain::services::{
    account_service::AccountService, admin_aggregator::AdminAggregator,
    funds_service::FundsService, trade_processor::TradeProcessor,
};
use crate::persistence::DbPool;

/// Services shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub accounts: AccountService,
    pub funds: FundsService,
    pub trades: TradeProcessor,
    pub admin: AdminAggregator,
}

impl AppState {
    pub fn new(pool: DbPool, config: &AppConfig) -> Self {
        Self {
            accounts: AccountService::new(pool.clone(), config.bcrypt_cost),
            funds: FundsService::new(pool.clone(), config.trading.clone()),
            trades: TradeProcessor::new(pool.clone(), config.trading.clone()),
            admin: AdminAggregator::new(pool.clone(), config.stats.clone()),
            pool,
        }
    }
}
