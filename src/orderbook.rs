//! Order book aggregation.
//!
//! Read-only price-level view over the resting (OPEN/PARTIAL) orders of a
//! (market, selection). Takes no locks; the result is a snapshot that may
//! race with concurrent matching.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Row};
use utoipa::ToSchema;

use crate::error::CoreResult;
use crate::models::{OrderStatus, Side};

/// One aggregated price level.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookLevel {
    #[schema(value_type = String)]
    pub price: Decimal,
    /// Sum of unmatched stake resting at this price.
    #[schema(value_type = String)]
    pub available_stake: Decimal,
    pub order_count: i64,
}

/// Both sides of the book for one selection. BACK levels are best-first
/// descending (highest price a layer can take), LAY levels ascending.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderBook {
    pub market_id: i64,
    pub selection_id: i64,
    pub back: Vec<BookLevel>,
    pub lay: Vec<BookLevel>,
}

async fn levels(
    pool: &PgPool,
    market_id: i64,
    selection_id: i64,
    side: Side,
) -> CoreResult<Vec<BookLevel>> {
    let direction = match side {
        Side::Back => "DESC",
        Side::Lay => "ASC",
    };
    let sql = format!(
        r#"
        SELECT price, SUM(remaining_stake) AS available_stake, COUNT(*) AS order_count
        FROM orders
        WHERE market_id = $1 AND selection_id = $2 AND side = $3 AND status IN ($4, $5)
        GROUP BY price
        ORDER BY price {direction}
        "#
    );

    let rows = sqlx::query(&sql)
        .bind(market_id)
        .bind(selection_id)
        .bind(i16::from(side))
        .bind(i16::from(OrderStatus::Open))
        .bind(i16::from(OrderStatus::Partial))
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| BookLevel {
            price: row.get("price"),
            available_stake: row.get::<Decimal, _>("available_stake"),
            order_count: row.get("order_count"),
        })
        .collect())
}

/// Aggregate the book for one selection.
pub async fn snapshot(pool: &PgPool, market_id: i64, selection_id: i64) -> CoreResult<OrderBook> {
    let back = levels(pool, market_id, selection_id, Side::Back).await?;
    let lay = levels(pool, market_id, selection_id, Side::Lay).await?;
    Ok(OrderBook {
        market_id,
        selection_id,
        back,
        lay,
    })
}
