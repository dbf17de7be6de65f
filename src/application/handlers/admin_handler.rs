use axum::{extract::State, http::StatusCode};

use crate::application::response::{respond, ApiResult};
use crate::application::state::AppState;
use crate::domain::services::admin_aggregator::AdminStats;
use crate::persistence::models::TransactionRecord;

pub async fn get_stats(State(state): State<AppState>) -> ApiResult<AdminStats> {
    let stats = state.admin.stats().await?;
    respond(StatusCode::OK, "Admin stats retrieved successfully", stats)
}

pub async fn get_all_transactions(
    State(state): State<AppState>,
) -> ApiResult<Vec<TransactionRecord>> {
    let transactions = state.admin.all_transactions().await?;
    respond(StatusCode::OK, "Received all transactions", transactions)
}
