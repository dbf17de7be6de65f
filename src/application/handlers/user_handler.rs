use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::application::response::{respond, ApiResult};
use crate::application::state::AppState;
use crate::domain::entities::order::{OrderKind, TradeRequest};
use crate::domain::errors::BrokerError;
use crate::domain::services::account_service::Registration;
use crate::domain::services::funds_service::FundsMovement;
use crate::domain::value_objects::{amount::Amount, units::Units};
use crate::persistence::models::{AccountRecord, OrderRecord, PositionRecord, TransactionRecord};

/// Registration body. Missing text fields default to empty and fail validation.
#[derive(Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub usertype: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "panCardNum", default)]
    pub pan_card_num: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Body of both deposit and withdraw
#[derive(Debug, Deserialize)]
pub struct FundsBody {
    #[serde(default)]
    pub email: String,
    pub amount: Amount,
    #[serde(default)]
    pub mode: String,
}

/// `price` is the total for the whole order, not a unit price
#[derive(Debug, Deserialize)]
pub struct OrderBody {
    #[serde(default)]
    pub user: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub units: Units,
    pub price: Amount,
    #[serde(default)]
    pub symbol: String,
    pub name: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterBody>, JsonRejection>,
) -> ApiResult<AccountRecord> {
    let Json(body) = payload?;
    let account = state
        .accounts
        .register(Registration {
            username: body.username,
            email: body.email,
            usertype: body.usertype,
            password: Zeroizing::new(body.password),
            tax_id: body.pan_card_num,
        })
        .await?;
    respond(StatusCode::CREATED, "User successfully registered", account)
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginBody>, JsonRejection>,
) -> ApiResult<AccountRecord> {
    let Json(body) = payload?;
    let account = state
        .accounts
        .login(&body.email, Zeroizing::new(body.password))
        .await?;
    respond(StatusCode::OK, "User successfully logged in", account)
}

pub async fn deposit(
    State(state): State<AppState>,
    payload: Result<Json<FundsBody>, JsonRejection>,
) -> ApiResult<AccountRecord> {
    let Json(body) = payload?;
    let account = state.funds.deposit(movement(body)).await?;
    respond(StatusCode::OK, "Money successfully deposited", account)
}

pub async fn withdraw(
    State(state): State<AppState>,
    payload: Result<Json<FundsBody>, JsonRejection>,
) -> ApiResult<AccountRecord> {
    let Json(body) = payload?;
    let account = state.funds.withdraw(movement(body)).await?;
    respond(StatusCode::OK, "Money successfully withdrawn", account)
}

fn movement(body: FundsBody) -> FundsMovement {
    FundsMovement {
        email: body.email,
        amount: body.amount,
        mode: body.mode,
    }
}

pub async fn place_order(
    State(state): State<AppState>,
    payload: Result<Json<OrderBody>, JsonRejection>,
) -> ApiResult<OrderRecord> {
    let Json(body) = payload?;
    let kind: OrderKind = body.kind.parse().map_err(BrokerError::from)?;
    let request = TradeRequest::new(
        &body.user,
        kind,
        body.units,
        body.price,
        &body.symbol,
        body.name.as_deref(),
    )
    .map_err(BrokerError::from)?;

    let receipt = state.trades.execute(request).await?;
    respond(StatusCode::OK, "Order Placed", receipt.order)
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AccountRecord> {
    let account = state.accounts.get_account(&id).await?;
    respond(StatusCode::OK, "User Details", account)
}

pub async fn get_portfolio(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<PositionRecord>> {
    let positions = state.accounts.portfolio(&id).await?;
    respond(StatusCode::OK, "Received all stocks", positions)
}

pub async fn get_orders(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<OrderRecord>> {
    let orders = state.accounts.orders(&id).await?;
    respond(StatusCode::OK, "Received all orders", orders)
}

pub async fn get_transactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<TransactionRecord>> {
    let transactions = state.accounts.transactions(&id).await?;
    respond(StatusCode::OK, "All user transactions", transactions)
}
