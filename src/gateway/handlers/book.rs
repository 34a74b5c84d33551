//! Order book query handler.

use std::sync::Arc;

use axum::extract::{Path, State};

use super::super::state::AppState;
use super::super::types::{ok, ApiResult};
use crate::orderbook::{self, OrderBook};

/// Aggregated price levels for one selection.
///
/// GET /api/v1/orderbook/{market_id}/{selection_id}
#[utoipa::path(
    get,
    path = "/api/v1/orderbook/{market_id}/{selection_id}",
    params(
        ("market_id" = i64, Path, description = "Market id"),
        ("selection_id" = i64, Path, description = "Runner id")
    ),
    responses(
        (status = 200, description = "Back and lay price levels", body = OrderBook)
    ),
    tag = "Market data"
)]
pub async fn get_orderbook(
    State(state): State<Arc<AppState>>,
    Path((market_id, selection_id)): Path<(i64, i64)>,
) -> ApiResult<OrderBook> {
    let book = orderbook::snapshot(&state.pool, market_id, selection_id).await?;
    ok(book)
}
