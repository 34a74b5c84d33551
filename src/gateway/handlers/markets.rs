//! Admin handlers for matches, markets and settlement.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{
    ok, ApiResult, CreateMarketRequest, CreateMatchRequest, MarketTransitionRequest,
    MatchTransitionRequest, SettleMarketRequest,
};
use crate::models::{Fixture, Market, Runner};

#[derive(Debug, Serialize, ToSchema)]
pub struct MatchData {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fixture: Fixture,
    /// False when an existing match was found under the same external id.
    pub created: bool,
}

/// Create a match. A duplicate external id resolves to the existing match
/// and reports 409 with the existing row.
///
/// POST /api/v1/admin/matches
#[utoipa::path(
    post,
    path = "/api/v1/admin/matches",
    request_body = CreateMatchRequest,
    responses(
        (status = 200, description = "Match created"),
        (status = 409, description = "External id already known; existing match returned"),
        (status = 403, description = "Actor is not an admin")
    ),
    tag = "Admin"
)]
pub async fn create_match(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<super::super::types::ApiResponse<MatchData>>), super::super::types::ApiError>
{
    let result = state
        .markets
        .create_fixture(
            req.acting_user,
            req.external_id.as_deref(),
            &req.sport_key,
            &req.home_team,
            &req.away_team,
            req.start_time,
        )
        .await?;

    let status = if result.created {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };
    Ok((
        status,
        Json(super::super::types::ApiResponse::success(MatchData {
            fixture: result.fixture,
            created: result.created,
        })),
    ))
}

/// Transition a match through its state machine.
///
/// POST /api/v1/admin/matches/{match_id}/status
#[utoipa::path(
    post,
    path = "/api/v1/admin/matches/{match_id}/status",
    request_body = MatchTransitionRequest,
    params(("match_id" = i64, Path, description = "Match id")),
    responses(
        (status = 200, description = "Transition applied"),
        (status = 409, description = "Illegal transition")
    ),
    tag = "Admin"
)]
pub async fn transition_match(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<i64>,
    Json(req): Json<MatchTransitionRequest>,
) -> ApiResult<Fixture> {
    let fixture = state
        .markets
        .transition_match(req.acting_user, match_id, req.status)
        .await?;
    ok(fixture)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarketData {
    #[schema(value_type = Object)]
    pub market: Market,
    #[schema(value_type = Vec<Object>)]
    pub runners: Vec<Runner>,
}

/// Create a market with its runners under a match.
///
/// POST /api/v1/admin/markets
#[utoipa::path(
    post,
    path = "/api/v1/admin/markets",
    request_body = CreateMarketRequest,
    responses(
        (status = 200, description = "Market created with runners"),
        (status = 400, description = "Fewer than two runners")
    ),
    tag = "Admin"
)]
pub async fn create_market(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMarketRequest>,
) -> ApiResult<MarketData> {
    let (market, runners) = state
        .markets
        .create_market(req.acting_user, req.match_id, &req.name, &req.runners)
        .await?;
    ok(MarketData { market, runners })
}

/// Transition a market through its state machine.
///
/// POST /api/v1/admin/markets/{market_id}/status
#[utoipa::path(
    post,
    path = "/api/v1/admin/markets/{market_id}/status",
    request_body = MarketTransitionRequest,
    params(("market_id" = i64, Path, description = "Market id")),
    responses(
        (status = 200, description = "Transition applied"),
        (status = 409, description = "Illegal transition")
    ),
    tag = "Admin"
)]
pub async fn transition_market(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<i64>,
    Json(req): Json<MarketTransitionRequest>,
) -> ApiResult<Market> {
    let market = state
        .markets
        .transition_market(req.acting_user, market_id, req.status)
        .await?;
    ok(market)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettlementData {
    pub market_id: i64,
    pub settled_trades: usize,
    pub cancelled_orders: usize,
}

/// Settle a market. An empty winner list refunds all trades.
///
/// POST /api/v1/admin/markets/{market_id}/settle
#[utoipa::path(
    post,
    path = "/api/v1/admin/markets/{market_id}/settle",
    request_body = SettleMarketRequest,
    params(("market_id" = i64, Path, description = "Market id")),
    responses(
        (status = 200, description = "Market settled"),
        (status = 409, description = "Market already settled")
    ),
    tag = "Admin"
)]
pub async fn settle_market(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<i64>,
    Json(req): Json<SettleMarketRequest>,
) -> ApiResult<SettlementData> {
    let report = state
        .settlement
        .settle_market(req.acting_user, market_id, &req.winner_selection_ids)
        .await?;
    ok(SettlementData {
        market_id: report.market_id,
        settled_trades: report.settled_trades,
        cancelled_orders: report.cancelled_orders,
    })
}

/// A market with its runners and display prices.
///
/// GET /api/v1/markets/{market_id}
pub async fn get_market(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<i64>,
) -> ApiResult<MarketData> {
    let (market, runners) = state.markets.market_with_runners(market_id).await?;
    ok(MarketData { market, runners })
}

/// Markets of a match.
///
/// GET /api/v1/matches/{match_id}/markets
pub async fn markets_of_match(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<i64>,
) -> ApiResult<Vec<Market>> {
    let markets = state.markets.markets_for_fixture(match_id).await?;
    ok(markets)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarketExposureData {
    pub user_id: i64,
    pub market_id: i64,
    #[schema(value_type = String)]
    pub exposure: rust_decimal::Decimal,
}

/// Locked exposure of one user on one market.
///
/// GET /api/v1/admin/markets/{market_id}/exposure/{user_id}
pub async fn user_market_exposure(
    State(state): State<Arc<AppState>>,
    Path((market_id, user_id)): Path<(i64, i64)>,
) -> ApiResult<MarketExposureData> {
    let exposure = state
        .markets
        .user_market_exposure(user_id, market_id)
        .await?;
    ok(match exposure {
        Some(row) => MarketExposureData {
            user_id: row.user_id,
            market_id: row.market_id,
            exposure: row.exposure,
        },
        None => MarketExposureData {
            user_id,
            market_id,
            exposure: rust_decimal::Decimal::ZERO,
        },
    })
}
