//! Route table and CORS for the HTTP boundary.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

use super::handlers::{book, health, markets, orders, wallets};
use super::openapi::ApiDoc;
use super::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = match state.config.gateway.cors_origin.as_deref() {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new().allow_origin(value),
            Err(_) => {
                tracing::warn!(origin, "invalid cors_origin, falling back to any");
                CorsLayer::new().allow_origin(Any)
            }
        },
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/api/v1/openapi.json", get(openapi_json))
        .route("/api/v1/orders", post(orders::place_order))
        .route("/api/v1/orders/cancel", post(orders::cancel_order))
        .route("/api/v1/orders/{order_id}/trades", get(orders::order_trades))
        .route("/api/v1/users/{user_id}/orders", get(orders::user_orders))
        .route(
            "/api/v1/orderbook/{market_id}/{selection_id}",
            get(book::get_orderbook),
        )
        .route("/api/v1/markets/{market_id}", get(markets::get_market))
        .route(
            "/api/v1/matches/{match_id}/markets",
            get(markets::markets_of_match),
        )
        .route("/api/v1/wallets/{user_id}", get(wallets::get_wallet))
        .route("/api/v1/ledger/{user_id}", get(wallets::get_ledger))
        .route("/api/v1/admin/matches", post(markets::create_match))
        .route(
            "/api/v1/admin/matches/{match_id}/status",
            post(markets::transition_match),
        )
        .route("/api/v1/admin/markets", post(markets::create_market))
        .route(
            "/api/v1/admin/markets/{market_id}/status",
            post(markets::transition_market),
        )
        .route(
            "/api/v1/admin/markets/{market_id}/settle",
            post(markets::settle_market),
        )
        .route(
            "/api/v1/admin/markets/{market_id}/exposure/{user_id}",
            get(markets::user_market_exposure),
        )
        .route("/api/v1/admin/users", post(wallets::create_user))
        .route("/api/v1/admin/wallets/credit", post(wallets::credit_wallet))
        .route("/api/v1/admin/wallets/debit", post(wallets::debit_wallet))
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
