//! User and wallet admin handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use super::super::state::AppState;
use super::super::types::{
    ok, ApiResult, CreateUserRequest, WalletData, WalletMovementRequest,
};
use crate::models::{LedgerEntry, User};

/// Create a user with their wallet.
///
/// POST /api/v1/admin/users
#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created"),
        (status = 409, description = "Email already registered"),
        (status = 403, description = "Actor is not an admin")
    ),
    tag = "Admin"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<User> {
    let user = state
        .wallets
        .create_user(
            req.acting_user,
            &req.email,
            &req.name,
            req.role,
            req.parent_id,
        )
        .await?;
    ok(user)
}

/// Credit a wallet.
///
/// POST /api/v1/admin/wallets/credit
#[utoipa::path(
    post,
    path = "/api/v1/admin/wallets/credit",
    request_body = WalletMovementRequest,
    responses((status = 200, description = "Wallet credited", body = WalletData)),
    tag = "Admin"
)]
pub async fn credit_wallet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WalletMovementRequest>,
) -> ApiResult<WalletData> {
    let wallet = state
        .wallets
        .credit(req.acting_user, req.user_id, req.amount, req.notes.as_deref())
        .await?;
    ok(wallet.into())
}

/// Debit a wallet; locked exposure is not spendable.
///
/// POST /api/v1/admin/wallets/debit
#[utoipa::path(
    post,
    path = "/api/v1/admin/wallets/debit",
    request_body = WalletMovementRequest,
    responses(
        (status = 200, description = "Wallet debited", body = WalletData),
        (status = 400, description = "Insufficient available balance")
    ),
    tag = "Admin"
)]
pub async fn debit_wallet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WalletMovementRequest>,
) -> ApiResult<WalletData> {
    let wallet = state
        .wallets
        .debit(req.acting_user, req.user_id, req.amount, req.notes.as_deref())
        .await?;
    ok(wallet.into())
}

/// Wallet snapshot.
///
/// GET /api/v1/wallets/{user_id}
#[utoipa::path(
    get,
    path = "/api/v1/wallets/{user_id}",
    params(("user_id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Current balance and exposure", body = WalletData)),
    tag = "Wallets"
)]
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ApiResult<WalletData> {
    let wallet = state.wallets.wallet(user_id).await?;
    ok(wallet.into())
}

/// Newest-first ledger page.
///
/// GET /api/v1/ledger/{user_id}
pub async fn get_ledger(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<LedgerEntry>> {
    let entries = state.wallets.ledger_entries(user_id, 100).await?;
    ok(entries)
}
