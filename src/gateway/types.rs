//! Gateway DTOs and the unified response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::CoreError;
use crate::models::{MarketStatus, MatchStatus, Role, Side};

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper.
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }
}

/// Error codes
pub mod error_codes {
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;

    // Auth errors (2xxx)
    pub const PERMISSION_DENIED: i32 = 2003;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4004;
    pub const INVALID_STATE: i32 = 4005;
    pub const CONFLICT: i32 = 4009;

    // Server errors (5xxx)
    pub const INTERNAL: i32 = 5000;
    pub const TIMEOUT: i32 = 5004;
}

/// Gateway error carrying the HTTP status and the envelope code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        use error_codes::*;
        let (status, code) = match &e {
            CoreError::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND),
            CoreError::InvalidState(_) => (StatusCode::CONFLICT, INVALID_STATE),
            CoreError::InvalidInput(_) => (StatusCode::BAD_REQUEST, INVALID_PARAMETER),
            CoreError::InsufficientFunds { .. } => (StatusCode::BAD_REQUEST, INSUFFICIENT_BALANCE),
            CoreError::PermissionDenied(_) => (StatusCode::FORBIDDEN, PERMISSION_DENIED),
            CoreError::Conflict(_) => (StatusCode::CONFLICT, CONFLICT),
            CoreError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, TIMEOUT),
            CoreError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL),
        };
        // Internal errors keep their detail in the logs, not the wire.
        let msg = if matches!(e, CoreError::Database(_)) {
            tracing::error!("database error surfaced to gateway: {}", e);
            "internal error".to_string()
        } else {
            e.to_string()
        };
        Self::new(status, code, msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiResponse::<()> {
            code: self.code,
            msg: self.msg,
            data: None,
        });
        (self.status, body).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

// ============================================================================
// Requests
// ============================================================================

/// New order. The acting user is passed explicitly; authentication lives in
/// the surrounding layer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub user_id: i64,
    pub market_id: i64,
    pub selection_id: i64,
    /// "BACK" | "LAY"
    pub side: Side,
    #[schema(value_type = String)]
    pub price: Decimal,
    #[schema(value_type = String)]
    pub stake: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub user_id: i64,
    pub order_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMatchRequest {
    pub acting_user: i64,
    pub external_id: Option<String>,
    pub sport_key: String,
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMarketRequest {
    pub acting_user: i64,
    pub match_id: i64,
    pub name: String,
    pub runners: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MatchTransitionRequest {
    pub acting_user: i64,
    pub status: MatchStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarketTransitionRequest {
    pub acting_user: i64,
    pub status: MarketStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SettleMarketRequest {
    pub acting_user: i64,
    /// Empty list refunds every trade (abandoned market).
    #[serde(default)]
    pub winner_selection_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub acting_user: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WalletMovementRequest {
    pub acting_user: i64,
    pub user_id: i64,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub notes: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletData {
    pub user_id: i64,
    #[schema(value_type = String)]
    pub balance: Decimal,
    #[schema(value_type = String)]
    pub exposure: Decimal,
    #[schema(value_type = String)]
    pub available_balance: Decimal,
}

impl From<crate::models::Wallet> for WalletData {
    fn from(w: crate::models::Wallet) -> Self {
        Self {
            user_id: w.user_id,
            balance: w.balance,
            exposure: w.exposure,
            available_balance: w.available(),
        }
    }
}
