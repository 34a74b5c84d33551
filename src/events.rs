//! Post-commit domain events.
//!
//! The sink is handed to the service layer by the composition root; the core
//! never talks to a transport directly and never emits for a rolled-back
//! transaction.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::models::{MarketStatus, MatchStatus, OrderStatus};

/// How a settled trade ended for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementOutcome {
    Won,
    Lost,
    Refunded,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExchangeEvent {
    BalanceUpdate {
        user_id: i64,
        balance: Decimal,
        exposure: Decimal,
        available_balance: Decimal,
        changed_by: &'static str,
        amount: Decimal,
    },
    BetPlaced {
        user_id: i64,
        order_id: i64,
        market_id: i64,
        matched_stake: Decimal,
        remaining_stake: Decimal,
        status: OrderStatus,
    },
    BetSettled {
        user_id: i64,
        trade_id: i64,
        market_id: i64,
        outcome: SettlementOutcome,
        amount: Decimal,
    },
    MatchUpdate {
        match_id: i64,
        status: MatchStatus,
    },
    MarketUpdate {
        market_id: i64,
        status: MarketStatus,
    },
}

/// Sink for committed-state events. Implementations must be cheap and
/// non-blocking; the service layer calls `emit` after commit, on the request
/// path.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ExchangeEvent);
}

pub type SharedSink = Arc<dyn EventSink>;

/// Fans events out to any number of subscribers over a tokio broadcast
/// channel. Lagging subscribers drop events rather than backpressure the
/// request path.
pub struct BroadcastSink {
    tx: broadcast::Sender<ExchangeEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExchangeEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: ExchangeEvent) {
        // send() errs only when there is no subscriber; not a fault.
        let _ = self.tx.send(event);
    }
}

/// Discards everything. Used by tests and offline tools.
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: ExchangeEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_sink_delivers_to_subscriber() {
        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();

        sink.emit(ExchangeEvent::MatchUpdate {
            match_id: 7,
            status: MatchStatus::Live,
        });

        match rx.recv().await.unwrap() {
            ExchangeEvent::MatchUpdate { match_id, status } => {
                assert_eq!(match_id, 7);
                assert_eq!(status, MatchStatus::Live);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn emit_without_subscribers_is_fine() {
        let sink = BroadcastSink::new(4);
        sink.emit(ExchangeEvent::MarketUpdate {
            market_id: 1,
            status: MarketStatus::Suspended,
        });
    }
}
