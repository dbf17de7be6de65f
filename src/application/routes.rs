//! API Routes

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{self, admin_handler, user_handler};
use super::state::AppState;
use crate::config::AppConfig;
use crate::rate_limit::{create_rate_limiter, rate_limit_middleware};

pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let limiter = create_rate_limiter(&config.rate_limit);

    let user_routes = Router::new()
        .route("/register", post(user_handler::register))
        .route("/login", post(user_handler::login))
        .route("/deposit", post(user_handler::deposit))
        .route("/withdraw", post(user_handler::withdraw))
        .route("/order", post(user_handler::place_order))
        .route("/order/:id", get(user_handler::get_orders))
        .route("/portfolio/:id", get(user_handler::get_portfolio))
        .route("/transactions/:id", get(user_handler::get_transactions))
        .route("/:id", get(user_handler::get_user));

    let admin_routes = Router::new()
        .route("/stats", get(admin_handler::get_stats))
        .route("/stats/transaction", get(admin_handler::get_all_transactions));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/user", user_routes)
        .nest("/api/admin", admin_routes)
        // Oversized JSON bodies surface as a 413 rejection inside the handlers
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        // Middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware)),
        )
        .with_state(state)
}
