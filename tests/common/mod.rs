#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use brokersky::application::{routes::build_router, state::AppState};
use brokersky::config::AppConfig;
use brokersky::persistence::init_database;

pub async fn app_with(config: AppConfig) -> Router {
    let pool = init_database(&config.database).await.unwrap();
    build_router(AppState::new(pool, &config), &config)
}

pub async fn app() -> Router {
    app_with(AppConfig::for_tests()).await
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

/// Register a customer and return its id
pub async fn register(app: &Router, email: &str) -> String {
    let (status, body) = post(
        app,
        "/api/user/register",
        serde_json::json!({
            "username": "tester",
            "email": email,
            "usertype": "Customer",
            "password": "hunter2"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["_id"].as_str().unwrap().to_string()
}

pub async fn deposit(app: &Router, email: &str, amount: i64) -> Value {
    let (status, body) = post(
        app,
        "/api/user/deposit",
        serde_json::json!({ "email": email, "amount": amount, "mode": "UPI" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}
