//! Order rows: insertion, fill updates, the matching candidate scan and the
//! cancellation lock.

use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use super::Conn;
use crate::error::{CoreError, CoreResult};
use crate::models::{Order, OrderStatus, Side};

pub(crate) fn order_from_row(row: &sqlx::postgres::PgRow) -> CoreResult<Order> {
    let side: i16 = row.get("side");
    let status: i16 = row.get("status");
    Ok(Order {
        id: row.get("id"),
        user_id: row.get("user_id"),
        market_id: row.get("market_id"),
        selection_id: row.get("selection_id"),
        side: Side::try_from(side)
            .map_err(|v| CoreError::InvalidState(format!("unknown order side {}", v)))?,
        price: row.get("price"),
        stake: row.get("stake"),
        matched_stake: row.get("matched_stake"),
        remaining_stake: row.get("remaining_stake"),
        locked_exposure: row.get("locked_exposure"),
        status: OrderStatus::try_from(status)
            .map_err(|v| CoreError::InvalidState(format!("unknown order status {}", v)))?,
        created_at: row.get("created_at"),
    })
}

const ORDER_COLUMNS: &str = "id, user_id, market_id, selection_id, side, price, stake, \
     matched_stake, remaining_stake, locked_exposure, status, created_at";

/// Persist a new OPEN order and return it with its identity.
#[allow(clippy::too_many_arguments)]
pub async fn insert(
    conn: &mut Conn,
    user_id: i64,
    market_id: i64,
    selection_id: i64,
    side: Side,
    price: Decimal,
    stake: Decimal,
    locked_exposure: Decimal,
) -> CoreResult<Order> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO orders
            (user_id, market_id, selection_id, side, price, stake,
             matched_stake, remaining_stake, locked_exposure, status)
        VALUES ($1, $2, $3, $4, $5, $6, 0, $6, $7, $8)
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(market_id)
    .bind(selection_id)
    .bind(i16::from(side))
    .bind(price)
    .bind(stake)
    .bind(locked_exposure)
    .bind(i16::from(OrderStatus::Open))
    .fetch_one(conn)
    .await?;
    order_from_row(&row)
}

pub async fn get(conn: &mut Conn, order_id: i64) -> CoreResult<Order> {
    let row = sqlx::query(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(order_id)
    .fetch_optional(conn)
    .await?
    .ok_or(CoreError::NotFound("order"))?;
    order_from_row(&row)
}

/// Take the exclusive row lock on an order (cancellation path).
pub async fn lock(conn: &mut Conn, order_id: i64) -> CoreResult<Order> {
    let row = sqlx::query(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(order_id)
    .fetch_optional(conn)
    .await?
    .ok_or(CoreError::NotFound("order"))?;
    order_from_row(&row)
}

/// Best resting candidate for an incoming order, claimed under a row lock.
///
/// `SKIP LOCKED` keeps two concurrent matching runs on the same selection
/// from convoying on one resting order: a row claimed by the other run is
/// simply skipped and the scan moves to the next in price-time order.
/// Own orders are never candidates.
pub async fn next_candidate(
    conn: &mut Conn,
    selection_id: i64,
    incoming_side: Side,
    incoming_user: i64,
    limit_price: Decimal,
) -> CoreResult<Option<Order>> {
    let (price_cmp, price_dir) = if incoming_side.scan_price_ascending() {
        ("<=", "ASC")
    } else {
        (">=", "DESC")
    };

    let sql = format!(
        r#"
        SELECT {ORDER_COLUMNS} FROM orders
        WHERE selection_id = $1
          AND side = $2
          AND status IN ($3, $4)
          AND user_id <> $5
          AND price {price_cmp} $6
        ORDER BY price {price_dir}, created_at ASC, id ASC
        LIMIT 1
        FOR UPDATE SKIP LOCKED
        "#
    );

    let row = sqlx::query(&sql)
        .bind(selection_id)
        .bind(i16::from(incoming_side.opposite()))
        .bind(i16::from(OrderStatus::Open))
        .bind(i16::from(OrderStatus::Partial))
        .bind(incoming_user)
        .bind(limit_price)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(order_from_row).transpose()
}

/// Write back an order's fill state; status is derived from the fill.
pub async fn apply_fill(
    conn: &mut Conn,
    order_id: i64,
    matched_stake: Decimal,
    remaining_stake: Decimal,
) -> CoreResult<OrderStatus> {
    let status = OrderStatus::from_fill(matched_stake, remaining_stake);
    sqlx::query(
        r#"
        UPDATE orders
        SET matched_stake = $1, remaining_stake = $2, status = $3, updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(matched_stake)
    .bind(remaining_stake)
    .bind(i16::from(status))
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(status)
}

pub async fn set_status(conn: &mut Conn, order_id: i64, status: OrderStatus) -> CoreResult<()> {
    sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(i16::from(status))
        .bind(order_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// All still-active orders of a market, locked for the settlement sweep.
pub async fn lock_active_for_market(conn: &mut Conn, market_id: i64) -> CoreResult<Vec<Order>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {ORDER_COLUMNS} FROM orders
        WHERE market_id = $1 AND status IN ($2, $3)
        ORDER BY id
        FOR UPDATE
        "#
    ))
    .bind(market_id)
    .bind(i16::from(OrderStatus::Open))
    .bind(i16::from(OrderStatus::Partial))
    .fetch_all(conn)
    .await?;

    rows.iter().map(order_from_row).collect()
}

/// Newest-first page of a user's orders.
pub async fn orders_for_user(pool: &PgPool, user_id: i64, limit: i64) -> CoreResult<Vec<Order>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {ORDER_COLUMNS} FROM orders
        WHERE user_id = $1
        ORDER BY id DESC
        LIMIT $2
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(order_from_row).collect()
}
