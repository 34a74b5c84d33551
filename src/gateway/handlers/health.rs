//! Liveness/readiness handler.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;

use super::super::state::AppState;
use super::super::types::{error_codes, ok, ApiError, ApiResult};

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<&'static str> {
    sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("health check failed: {}", e);
            ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::INTERNAL,
                "database unreachable",
            )
        })?;
    ok("healthy")
}
