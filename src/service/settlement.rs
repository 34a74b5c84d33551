//! Settlement engine.
//!
//! Resolving a market is one transaction with a 30 s budget: set winners,
//! translate every unsettled trade into balance credits and exposure
//! releases, cancel whatever still rests in the book, and advance the
//! market to SETTLED. A market already SETTLED rejects re-settlement;
//! already-settled trades are skipped, so a retried settlement is safe.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::{CoreError, CoreResult};
use crate::events::{ExchangeEvent, SettlementOutcome, SharedSink};
use crate::models::{LedgerKind, MarketStatus, OrderStatus, Side};
use crate::money;
use crate::persistence::{
    begin_with_timeout, ledger, markets, orders, trades, wallets, Conn, SETTLEMENT_TX_BUDGET,
};

/// Monetary effect of one settled trade on one participant.
///
/// `credit` moves balance (ORDER_SETTLE ledger entry); `exposure_release`
/// unwinds the placement-time lock and never moves balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeMovement {
    pub credit: Decimal,
    pub exposure_release: Decimal,
    pub outcome: SettlementOutcome,
}

/// The settlement table. `winner` is the selection's `is_winner` flag:
/// `None` refunds both sides, `true` pays the back side, `false` pays the
/// lay side.
pub fn settlement_movement(
    side: Side,
    winner: Option<bool>,
    price: Decimal,
    stake: Decimal,
) -> TradeMovement {
    let liability = (price - Decimal::ONE) * stake;
    match (winner, side) {
        // Refund: each side gets its own committed funds back.
        (None, Side::Back) => TradeMovement {
            credit: stake,
            exposure_release: stake,
            outcome: SettlementOutcome::Refunded,
        },
        (None, Side::Lay) => TradeMovement {
            credit: liability,
            exposure_release: liability,
            outcome: SettlementOutcome::Refunded,
        },
        // Selection won: back side collects stake plus profit.
        (Some(true), Side::Back) => TradeMovement {
            credit: price * stake,
            exposure_release: stake,
            outcome: SettlementOutcome::Won,
        },
        (Some(true), Side::Lay) => TradeMovement {
            credit: Decimal::ZERO,
            exposure_release: liability,
            outcome: SettlementOutcome::Lost,
        },
        // Selection lost: lay side collects the backer's stake.
        (Some(false), Side::Back) => TradeMovement {
            credit: Decimal::ZERO,
            exposure_release: stake,
            outcome: SettlementOutcome::Lost,
        },
        (Some(false), Side::Lay) => TradeMovement {
            credit: stake,
            exposure_release: liability,
            outcome: SettlementOutcome::Won,
        },
    }
}

pub struct SettlementService {
    pool: PgPool,
    events: SharedSink,
}

#[derive(Debug)]
pub struct SettlementReport {
    pub market_id: i64,
    pub settled_trades: usize,
    pub cancelled_orders: usize,
}

impl SettlementService {
    pub fn new(pool: PgPool, events: SharedSink) -> Self {
        Self { pool, events }
    }

    /// Resolve a market. `winner_selection_ids` empty means refund-all
    /// (abandoned market). Requires an admin actor.
    pub async fn settle_market(
        &self,
        acting_user: i64,
        market_id: i64,
        winner_selection_ids: &[i64],
    ) -> CoreResult<SettlementReport> {
        let mut tx = begin_with_timeout(&self.pool, SETTLEMENT_TX_BUDGET).await?;

        super::require_admin(&mut tx, acting_user).await?;

        // The market row lock serializes concurrent settlement attempts.
        let market = markets::lock_market(&mut tx, market_id).await?;
        if market.status == MarketStatus::Settled {
            return Err(CoreError::InvalidState(format!(
                "market {} is already settled",
                market_id
            )));
        }
        if market.status != MarketStatus::Closed {
            markets::set_market_status(&mut tx, market_id, MarketStatus::Closed).await?;
        }

        let runners = markets::runners_for_market(&mut tx, market_id).await?;
        for id in winner_selection_ids {
            if !runners.iter().any(|r| r.id == *id) {
                return Err(CoreError::InvalidInput(format!(
                    "selection {} does not belong to market {}",
                    id, market_id
                )));
            }
        }
        markets::set_winners(&mut tx, market_id, winner_selection_ids).await?;

        let mut events = Vec::new();

        let unsettled = trades::unsettled_for_market(&mut tx, market_id).await?;
        let settled_trades = unsettled.len();
        let now = Utc::now();

        for item in &unsettled {
            let back = settlement_movement(
                Side::Back,
                item.winner,
                item.trade.price,
                item.trade.stake,
            );
            let lay = settlement_movement(
                Side::Lay,
                item.winner,
                item.trade.price,
                item.trade.stake,
            );

            self.apply_movement(&mut tx, item.back_user_id, item.trade.id, market_id, back, &mut events)
                .await?;
            self.apply_movement(&mut tx, item.lay_user_id, item.trade.id, market_id, lay, &mut events)
                .await?;

            trades::mark_settled(&mut tx, item.trade.id, now).await?;
        }

        // Whatever still rests in the book is closed out with the
        // cancellation release formula.
        let open_orders = orders::lock_active_for_market(&mut tx, market_id).await?;
        let cancelled_orders = open_orders.len();
        for order in &open_orders {
            let releaseable = money::quantize_money(order.releaseable_exposure());
            orders::set_status(&mut tx, order.id, OrderStatus::Cancelled).await?;
            let (wallet, released) =
                wallets::release_exposure(&mut tx, order.user_id, releaseable).await?;
            markets::adjust_market_exposure(&mut tx, order.user_id, market_id, -released).await?;
            ledger::append(
                &mut tx,
                order.user_id,
                released,
                LedgerKind::ExposureRelease,
                wallet.balance,
                Some(&format!("exposure release for unmatched order {}", order.id)),
            )
            .await?;
            events.push(ExchangeEvent::BalanceUpdate {
                user_id: order.user_id,
                balance: wallet.balance,
                exposure: wallet.exposure,
                available_balance: wallet.available(),
                changed_by: "market_settle",
                amount: released,
            });
        }

        markets::set_market_status(&mut tx, market_id, MarketStatus::Settled).await?;

        tx.commit().await?;

        tracing::info!(
            market_id,
            settled_trades,
            cancelled_orders,
            winners = ?winner_selection_ids,
            "market settled"
        );

        events.push(ExchangeEvent::MarketUpdate {
            market_id,
            status: MarketStatus::Settled,
        });
        for event in events {
            self.events.emit(event);
        }

        Ok(SettlementReport {
            market_id,
            settled_trades,
            cancelled_orders,
        })
    }

    /// Apply one participant's settlement movement: balance credit with its
    /// ORDER_SETTLE entry, then the exposure release with its
    /// EXPOSURE_RELEASE entry.
    async fn apply_movement(
        &self,
        conn: &mut Conn,
        user_id: i64,
        trade_id: i64,
        market_id: i64,
        movement: TradeMovement,
        events: &mut Vec<ExchangeEvent>,
    ) -> CoreResult<()> {
        let credit = money::quantize_money(movement.credit);
        let release = money::quantize_money(movement.exposure_release);

        let mut wallet = wallets::lock_wallet(conn, user_id).await?;

        if credit > Decimal::ZERO {
            wallet.balance += credit;
            wallets::update_wallet(conn, user_id, wallet.balance, wallet.exposure).await?;
            ledger::append(
                conn,
                user_id,
                credit,
                LedgerKind::OrderSettle,
                wallet.balance,
                Some(&format!("settlement of trade {}", trade_id)),
            )
            .await?;
        }

        if release > Decimal::ZERO {
            let (after, released) = wallets::release_exposure(conn, user_id, release).await?;
            wallet = after;
            markets::adjust_market_exposure(conn, user_id, market_id, -released).await?;
            ledger::append(
                conn,
                user_id,
                released,
                LedgerKind::ExposureRelease,
                wallet.balance,
                Some(&format!("exposure release for settled trade {}", trade_id)),
            )
            .await?;
        }

        events.push(ExchangeEvent::BetSettled {
            user_id,
            trade_id,
            market_id,
            outcome: movement.outcome,
            amount: credit,
        });
        events.push(ExchangeEvent::BalanceUpdate {
            user_id,
            balance: wallet.balance,
            exposure: wallet.exposure,
            available_balance: wallet.available(),
            changed_by: "trade_settle",
            amount: credit,
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn back_wins_collects_stake_plus_profit() {
        // price 2.00, stake 100: back credited 200, exposure 100 released
        let m = settlement_movement(Side::Back, Some(true), d("2.00"), d("100"));
        assert_eq!(m.credit, d("200.00"));
        assert_eq!(m.exposure_release, d("100"));
        assert_eq!(m.outcome, SettlementOutcome::Won);
    }

    #[test]
    fn lay_loses_releases_liability_without_credit() {
        let m = settlement_movement(Side::Lay, Some(true), d("2.00"), d("100"));
        assert_eq!(m.credit, Decimal::ZERO);
        assert_eq!(m.exposure_release, d("100.00"));
        assert_eq!(m.outcome, SettlementOutcome::Lost);
    }

    #[test]
    fn back_loses_releases_stake_without_credit() {
        let m = settlement_movement(Side::Back, Some(false), d("3.00"), d("50"));
        assert_eq!(m.credit, Decimal::ZERO);
        assert_eq!(m.exposure_release, d("50"));
        assert_eq!(m.outcome, SettlementOutcome::Lost);
    }

    #[test]
    fn lay_wins_collects_back_stake() {
        let m = settlement_movement(Side::Lay, Some(false), d("3.00"), d("50"));
        assert_eq!(m.credit, d("50"));
        assert_eq!(m.exposure_release, d("100.00"));
        assert_eq!(m.outcome, SettlementOutcome::Won);
    }

    #[test]
    fn refund_returns_each_side_its_committed_funds() {
        // price 2.00, stake 100: both sides get 100 back
        let back = settlement_movement(Side::Back, None, d("2.00"), d("100"));
        assert_eq!(back.credit, d("100"));
        assert_eq!(back.exposure_release, d("100"));
        assert_eq!(back.outcome, SettlementOutcome::Refunded);

        let lay = settlement_movement(Side::Lay, None, d("2.00"), d("100"));
        assert_eq!(lay.credit, d("100.00"));
        assert_eq!(lay.exposure_release, d("100.00"));
        assert_eq!(lay.outcome, SettlementOutcome::Refunded);
    }

    #[test]
    fn lay_refund_scales_with_price() {
        // price 4.00, stake 10: liability 30 refunded
        let lay = settlement_movement(Side::Lay, None, d("4.00"), d("10"));
        assert_eq!(lay.credit, d("30.00"));
        assert_eq!(lay.exposure_release, d("30.00"));
    }
}
