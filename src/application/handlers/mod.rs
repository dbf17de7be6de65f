pub mod admin_handler;
pub mod user_handler;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::error;

use super::state::AppState;

/// Health check endpoint; reports whether the database answers
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "running", "database": "ok" })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": e.to_string() })),
            )
        }
    }
}
