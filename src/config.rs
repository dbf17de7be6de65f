use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::persistence::DatabaseConfig;
use crate::rate_limit::RateLimiterConfig;

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3002,
            max_body_bytes: 64 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Rules applied by the trade processor and funds handler
#[derive(Debug, Clone)]
pub struct TradingRules {
    /// Let buys and withdrawals push the balance below zero
    pub allow_negative_balance: bool,
    /// Exchange recorded on newly opened positions
    pub default_exchange: String,
}

impl Default for TradingRules {
    fn default() -> Self {
        Self {
            allow_negative_balance: false,
            default_exchange: "NASDAQ".to_string(),
        }
    }
}

impl TradingRules {
    /// Lowest balance a debit may leave behind, if any
    pub fn balance_floor(&self) -> Option<i64> {
        if self.allow_negative_balance {
            None
        } else {
            Some(0)
        }
    }
}

/// Time windows used by the admin dashboard statistics
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// A customer updated within this many days counts as active
    pub active_window_days: i64,
    /// A customer created within this many days counts as new
    pub new_window_days: i64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            active_window_days: 30,
            new_window_days: 7,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub trading: TradingRules,
    pub stats: StatsConfig,
    pub rate_limit: RateLimiterConfig,
    /// bcrypt work factor for password hashes
    pub bcrypt_cost: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            trading: TradingRules::default(),
            stats: StatsConfig::default(),
            rate_limit: RateLimiterConfig::default(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl AppConfig {
    /// Configuration for tests: in-memory database and the cheapest bcrypt cost
    pub fn for_tests() -> Self {
        Self {
            database: DatabaseConfig::in_memory(),
            bcrypt_cost: 4,
            rate_limit: RateLimiterConfig {
                requests_per_minute: 10_000,
            },
            ..Self::default()
        }
    }

    /// Load configuration from environment variables, keeping defaults for
    /// anything missing or invalid
    pub fn from_env() -> AppConfig {
        let mut config = AppConfig::default();

        config.server.host = parse_env("HOST", config.server.host, |_| true);
        config.server.port = parse_env("PORT", config.server.port, |p| *p > 0);
        config.server.max_body_bytes = parse_env("MAX_BODY_BYTES", config.server.max_body_bytes, |v| {
            (1024..=10 * 1024 * 1024).contains(v)
        });

        if let Ok(url) = std::env::var("DATABASE_URL") {
            if url.starts_with("sqlite:") {
                config.database.url = url;
            } else {
                tracing::warn!(
                    "Unsupported DATABASE_URL '{}' (expected sqlite:...), using default: {}",
                    url,
                    config.database.url
                );
            }
        }
        if std::env::var("MONGO_DB_URL").is_ok() {
            tracing::warn!("MONGO_DB_URL is set but ignored; configure DATABASE_URL instead");
        }
        config.database.max_connections = parse_env(
            "DATABASE_MAX_CONNECTIONS",
            config.database.max_connections,
            |v| (1..=64).contains(v),
        );
        config.database.log_queries =
            parse_flag("DATABASE_LOG_QUERIES", config.database.log_queries);

        config.trading.allow_negative_balance =
            parse_flag("ALLOW_NEGATIVE_BALANCE", config.trading.allow_negative_balance);
        if let Ok(exchange) = std::env::var("DEFAULT_STOCK_EXCHANGE") {
            let exchange = exchange.trim();
            if !exchange.is_empty() {
                config.trading.default_exchange = exchange.to_uppercase();
            }
        }

        config.stats.active_window_days = parse_env(
            "ACTIVE_USER_WINDOW_DAYS",
            config.stats.active_window_days,
            |v| (1..=365).contains(v),
        );
        config.stats.new_window_days = parse_env(
            "NEW_USER_WINDOW_DAYS",
            config.stats.new_window_days,
            |v| (1..=365).contains(v),
        );

        config.rate_limit.requests_per_minute = parse_env(
            "RATE_LIMIT_PER_MINUTE",
            config.rate_limit.requests_per_minute,
            |v| *v > 0,
        );

        config.bcrypt_cost = parse_env("BCRYPT_COST", config.bcrypt_cost, |v| (4..=31).contains(v));

        config
    }
}

/// Read and validate one variable, warning and keeping `default` when it is unusable
fn parse_env<T>(key: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Ok(raw) = std::env::var(key) else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        Ok(value) => {
            tracing::warn!("Invalid {} value: {}, using default: {}", key, value, default);
            default
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse {} '{}': {}, using default: {}",
                key,
                raw,
                e,
                default
            );
            default
        }
    }
}

fn parse_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(value) => value.to_lowercase() == "true" || value == "1",
        Err(_) => default,
    }
}
