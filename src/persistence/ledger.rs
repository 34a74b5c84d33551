//! Append-only ledger.
//!
//! Entries are written in the same transaction as the wallet mutation they
//! record and are never updated or deleted. `post_balance` is the balance
//! after the entry; for exposure-only movements it equals the unchanged
//! balance.

use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use super::Conn;
use crate::error::CoreResult;
use crate::models::{LedgerEntry, LedgerKind};

pub async fn append(
    conn: &mut Conn,
    user_id: i64,
    amount: Decimal,
    kind: LedgerKind,
    post_balance: Decimal,
    notes: Option<&str>,
) -> CoreResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO ledger (user_id, amount, kind, post_balance, notes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(i16::from(kind))
    .bind(post_balance)
    .bind(notes)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

fn entry_from_row(row: &sqlx::postgres::PgRow) -> CoreResult<LedgerEntry> {
    let kind: i16 = row.get("kind");
    let kind = LedgerKind::try_from(kind)
        .map_err(|v| crate::error::CoreError::InvalidState(format!("unknown ledger kind {}", v)))?;
    Ok(LedgerEntry {
        id: row.get("id"),
        user_id: row.get("user_id"),
        amount: row.get("amount"),
        kind,
        post_balance: row.get("post_balance"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
    })
}

/// Newest-first page of a user's ledger.
pub async fn entries_for_user(
    pool: &PgPool,
    user_id: i64,
    limit: i64,
) -> CoreResult<Vec<LedgerEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, amount, kind, post_balance, notes, created_at
        FROM ledger
        WHERE user_id = $1
        ORDER BY id DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(entry_from_row).collect()
}
