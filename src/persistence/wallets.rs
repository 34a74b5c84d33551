//! Wallet row operations.
//!
//! Callers that mutate a wallet must hold its row lock for the rest of the
//! transaction; `lock_wallet` is the only way in.

use rust_decimal::Decimal;
use sqlx::Row;

use super::Conn;
use crate::error::{CoreError, CoreResult};
use crate::models::Wallet;

fn wallet_from_row(row: &sqlx::postgres::PgRow) -> Wallet {
    Wallet {
        user_id: row.get("user_id"),
        balance: row.get("balance"),
        exposure: row.get("exposure"),
    }
}

pub async fn create_wallet(conn: &mut Conn, user_id: i64) -> CoreResult<()> {
    sqlx::query("INSERT INTO wallets (user_id) VALUES ($1)")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Read a wallet without locking. Snapshot only; do not mutate from this.
pub async fn get_wallet(conn: &mut Conn, user_id: i64) -> CoreResult<Wallet> {
    let row = sqlx::query("SELECT user_id, balance, exposure FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or(CoreError::NotFound("wallet"))?;
    Ok(wallet_from_row(&row))
}

/// Take the exclusive row lock on a wallet and return its current state.
pub async fn lock_wallet(conn: &mut Conn, user_id: i64) -> CoreResult<Wallet> {
    let row = sqlx::query(
        "SELECT user_id, balance, exposure FROM wallets WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or(CoreError::NotFound("wallet"))?;
    Ok(wallet_from_row(&row))
}

/// Write back both columns of a locked wallet.
pub async fn update_wallet(
    conn: &mut Conn,
    user_id: i64,
    balance: Decimal,
    exposure: Decimal,
) -> CoreResult<()> {
    sqlx::query(
        "UPDATE wallets SET balance = $1, exposure = $2, updated_at = NOW() WHERE user_id = $3",
    )
    .bind(balance)
    .bind(exposure)
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Lock the wallet and release up to `amount` of exposure, clamping at zero
/// so the exposure >= 0 invariant survives the incoming side's
/// placement-time overestimate. Returns the wallet after the release and
/// the amount actually released.
pub async fn release_exposure(
    conn: &mut Conn,
    user_id: i64,
    amount: Decimal,
) -> CoreResult<(Wallet, Decimal)> {
    let wallet = lock_wallet(conn, user_id).await?;
    let released = amount.min(wallet.exposure);
    let exposure = wallet.exposure - released;
    update_wallet(conn, user_id, wallet.balance, exposure).await?;
    Ok((Wallet { exposure, ..wallet }, released))
}
