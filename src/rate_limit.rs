use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::application::response::ApiError;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum requests per minute, shared by every client
    pub requests_per_minute: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 600,
        }
    }
}

/// Global rate limiter
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a new rate limiter. A zero rate is treated as one request per minute.
pub fn create_rate_limiter(config: &RateLimiterConfig) -> GlobalRateLimiter {
    let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)))
}

/// Middleware rejecting requests once the quota is spent
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!("Rate limit exceeded on {}", request.uri().path());
            ApiError::RateLimited.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = create_rate_limiter(&RateLimiterConfig {
            requests_per_minute: 50,
        });
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_rate_limiter_exhausts_quota() {
        let limiter = create_rate_limiter(&RateLimiterConfig {
            requests_per_minute: 2,
        });
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_zero_rate_does_not_panic() {
        let limiter = create_rate_limiter(&RateLimiterConfig {
            requests_per_minute: 0,
        });
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_default_config() {
        assert_eq!(RateLimiterConfig::default().requests_per_minute, 600);
    }
}
