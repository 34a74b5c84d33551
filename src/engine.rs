//! Matching engine.
//!
//! Given a newly persisted incoming order, walks the opposite side of the
//! selection's book in price-time order and generates trades. Runs entirely
//! inside the caller's placement transaction; every resting order it touches
//! is claimed with `FOR UPDATE SKIP LOCKED`, so concurrent runs on the same
//! selection divide the book between them instead of convoying.
//!
//! Matching is wallet-neutral: the matched portion's placement-time exposure
//! stays locked on both sides and is released exactly once, at settlement.

use rust_decimal::Decimal;

use crate::error::CoreResult;
use crate::models::{Order, OrderStatus, Side, Trade};
use crate::persistence::{orders, trades, Conn};

/// Result of one matching run.
#[derive(Debug)]
pub struct MatchOutcome {
    pub matched_stake: Decimal,
    pub remaining_stake: Decimal,
    pub status: OrderStatus,
    pub trades: Vec<Trade>,
}

/// Match `incoming` against the book.
///
/// The incoming order must already be persisted (status OPEN, nothing
/// matched). Its fill state is written back before returning; the caller
/// owns the surrounding transaction and the commit.
pub async fn match_order(conn: &mut Conn, incoming: &Order) -> CoreResult<MatchOutcome> {
    let mut matched = Decimal::ZERO;
    let mut remaining = incoming.stake;
    let mut fills: Vec<Trade> = Vec::new();

    while remaining > Decimal::ZERO {
        // Best-priced, oldest resting order on the opposite side within the
        // incoming limit. A row locked by a concurrent run is skipped, and
        // the remaining stake we read here is current under our own lock.
        let Some(resting) = orders::next_candidate(
            conn,
            incoming.selection_id,
            incoming.side,
            incoming.user_id,
            incoming.price,
        )
        .await?
        else {
            break;
        };

        debug_assert!(incoming.side.crosses(incoming.price, resting.price));

        let trade_stake = remaining.min(resting.remaining_stake);
        if trade_stake <= Decimal::ZERO {
            // An active order must carry remaining stake; bail out rather
            // than spin on an inconsistent row.
            tracing::error!(order_id = resting.id, "active order with no remaining stake");
            break;
        }

        // The trade prints at the resting price; the incoming order never
        // improves on its own limit but may fill better.
        let (back_order_id, lay_order_id) = match incoming.side {
            Side::Back => (incoming.id, resting.id),
            Side::Lay => (resting.id, incoming.id),
        };
        let trade = trades::insert(
            conn,
            back_order_id,
            lay_order_id,
            incoming.market_id,
            incoming.selection_id,
            resting.price,
            trade_stake,
        )
        .await?;

        orders::apply_fill(
            conn,
            resting.id,
            resting.matched_stake + trade_stake,
            resting.remaining_stake - trade_stake,
        )
        .await?;

        matched += trade_stake;
        remaining -= trade_stake;

        tracing::debug!(
            order_id = incoming.id,
            counter_order_id = resting.id,
            price = %trade.price,
            stake = %trade.stake,
            "matched"
        );

        fills.push(trade);
    }

    let status = orders::apply_fill(conn, incoming.id, matched, remaining).await?;

    Ok(MatchOutcome {
        matched_stake: matched,
        remaining_stake: remaining,
        status,
        trades: fills,
    })
}
