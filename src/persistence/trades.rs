//! Trade rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use super::Conn;
use crate::error::CoreResult;
use crate::models::Trade;

fn trade_from_row(row: &sqlx::postgres::PgRow) -> Trade {
    Trade {
        id: row.get("id"),
        back_order_id: row.get("back_order_id"),
        lay_order_id: row.get("lay_order_id"),
        market_id: row.get("market_id"),
        selection_id: row.get("selection_id"),
        price: row.get("price"),
        stake: row.get("stake"),
        settled: row.get("settled"),
        settled_at: row.get("settled_at"),
        created_at: row.get("created_at"),
    }
}

const TRADE_COLUMNS: &str = "id, back_order_id, lay_order_id, market_id, selection_id, \
     price, stake, settled, settled_at, created_at";

pub async fn insert(
    conn: &mut Conn,
    back_order_id: i64,
    lay_order_id: i64,
    market_id: i64,
    selection_id: i64,
    price: Decimal,
    stake: Decimal,
) -> CoreResult<Trade> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO trades
            (back_order_id, lay_order_id, market_id, selection_id, price, stake)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {TRADE_COLUMNS}
        "#
    ))
    .bind(back_order_id)
    .bind(lay_order_id)
    .bind(market_id)
    .bind(selection_id)
    .bind(price)
    .bind(stake)
    .fetch_one(conn)
    .await?;
    Ok(trade_from_row(&row))
}

/// One unsettled trade with the two participants resolved through its
/// orders.
#[derive(Debug, Clone)]
pub struct UnsettledTrade {
    pub trade: Trade,
    pub back_user_id: i64,
    pub lay_user_id: i64,
    /// `is_winner` of the trade's selection at settlement time.
    pub winner: Option<bool>,
}

/// All unsettled trades of a market, oldest first, joined to their orders
/// and to the settlement flag of their runner.
pub async fn unsettled_for_market(
    conn: &mut Conn,
    market_id: i64,
) -> CoreResult<Vec<UnsettledTrade>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.back_order_id, t.lay_order_id, t.market_id, t.selection_id,
               t.price, t.stake, t.settled, t.settled_at, t.created_at,
               ob.user_id AS back_user_id,
               ol.user_id AS lay_user_id,
               r.is_winner
        FROM trades t
        JOIN orders ob ON ob.id = t.back_order_id
        JOIN orders ol ON ol.id = t.lay_order_id
        JOIN runners r ON r.id = t.selection_id
        WHERE t.market_id = $1 AND t.settled = FALSE
        ORDER BY t.id
        "#,
    )
    .bind(market_id)
    .fetch_all(conn)
    .await?;

    Ok(rows
        .iter()
        .map(|row| UnsettledTrade {
            trade: trade_from_row(row),
            back_user_id: row.get("back_user_id"),
            lay_user_id: row.get("lay_user_id"),
            winner: row.get("is_winner"),
        })
        .collect())
}

pub async fn mark_settled(
    conn: &mut Conn,
    trade_id: i64,
    settled_at: DateTime<Utc>,
) -> CoreResult<()> {
    sqlx::query("UPDATE trades SET settled = TRUE, settled_at = $1 WHERE id = $2")
        .bind(settled_at)
        .bind(trade_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Trades an order participated in, either side.
pub async fn trades_for_order(pool: &PgPool, order_id: i64) -> CoreResult<Vec<Trade>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {TRADE_COLUMNS} FROM trades
        WHERE back_order_id = $1 OR lay_order_id = $1
        ORDER BY id
        "#
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(trade_from_row).collect())
}
