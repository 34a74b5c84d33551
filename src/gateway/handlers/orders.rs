//! Order placement and cancellation handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use super::super::state::AppState;
use super::super::types::{ok, ApiResult, CancelOrderRequest, PlaceOrderRequest};
use crate::models::{Order, Trade};
use crate::service::orders::{CancelOrderResult, PlaceOrderResult};

/// Place an order and match it against the book.
///
/// POST /api/v1/orders
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 200, description = "Order placed; fill state and trades returned"),
        (status = 400, description = "Invalid parameters or insufficient funds"),
        (status = 404, description = "Market or runner not found"),
        (status = 409, description = "Market not open")
    ),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaceOrderRequest>,
) -> ApiResult<PlaceOrderResult> {
    let result = state
        .orders
        .place_order(
            req.user_id,
            req.market_id,
            req.selection_id,
            req.side,
            req.price,
            req.stake,
        )
        .await?;
    ok(result)
}

/// Cancel an OPEN or PARTIAL order.
///
/// POST /api/v1/orders/cancel
#[utoipa::path(
    post,
    path = "/api/v1/orders/cancel",
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled; released exposure returned"),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order not cancellable")
    ),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CancelOrderRequest>,
) -> ApiResult<CancelOrderResult> {
    let result = state.orders.cancel_order(req.user_id, req.order_id).await?;
    ok(result)
}

/// Recent orders of a user.
///
/// GET /api/v1/users/{user_id}/orders
pub async fn user_orders(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<Order>> {
    let orders = state.orders.user_orders(user_id, 100).await?;
    ok(orders)
}

/// Trades an order participated in.
///
/// GET /api/v1/orders/{order_id}/trades
pub async fn order_trades(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<i64>,
) -> ApiResult<Vec<Trade>> {
    let trades = state.orders.order_trades(order_id).await?;
    ok(trades)
}
