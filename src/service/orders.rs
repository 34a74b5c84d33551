//! Order lifecycle controller.
//!
//! Placement validates the order, reserves exposure, runs the matching
//! engine and persists the result, all in one transaction with a 15 s
//! budget. Cancellation releases the unmatched portion's exposure; the
//! matched portion stays bound by its trades until settlement.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::engine;
use crate::error::{CoreError, CoreResult};
use crate::events::{ExchangeEvent, SharedSink};
use crate::models::{LedgerKind, Order, OrderStatus, Side, Trade, Wallet};
use crate::money;
use crate::persistence::{
    begin_with_timeout, ledger, markets, orders, trades, wallets, ORDER_TX_BUDGET,
};

#[derive(Debug, Serialize)]
pub struct PlaceOrderResult {
    pub order: Order,
    pub trades: Vec<Trade>,
    pub matched_stake: Decimal,
    pub remaining_stake: Decimal,
    pub status: OrderStatus,
    pub balance: Decimal,
    pub exposure: Decimal,
    pub available_balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CancelOrderResult {
    pub order_id: i64,
    pub released_exposure: Decimal,
    pub new_exposure: Decimal,
    pub available_balance: Decimal,
}

pub struct OrderService {
    pool: PgPool,
    events: SharedSink,
}

impl OrderService {
    pub fn new(pool: PgPool, events: SharedSink) -> Self {
        Self { pool, events }
    }

    /// Place an order and match it against the book.
    pub async fn place_order(
        &self,
        user_id: i64,
        market_id: i64,
        selection_id: i64,
        side: Side,
        price: Decimal,
        stake: Decimal,
    ) -> CoreResult<PlaceOrderResult> {
        let price =
            money::validate_price(price).map_err(|e| CoreError::InvalidInput(e.to_string()))?;
        let stake =
            money::validate_stake(stake).map_err(|e| CoreError::InvalidInput(e.to_string()))?;

        let mut tx = begin_with_timeout(&self.pool, ORDER_TX_BUDGET).await?;

        let market = markets::get_market(&mut tx, market_id).await?;
        if !market.status.accepts_orders() {
            return Err(CoreError::InvalidState(format!(
                "market {} is {:?}, not accepting orders",
                market_id, market.status
            )));
        }

        let runner = markets::get_runner(&mut tx, selection_id).await?;
        if runner.market_id != market_id {
            return Err(CoreError::NotFound("runner"));
        }

        let required = money::quantize_money(side.required_exposure(price, stake));

        let wallet = wallets::lock_wallet(&mut tx, user_id).await?;
        if wallet.available() < required {
            return Err(CoreError::InsufficientFunds {
                required,
                available: wallet.available(),
            });
        }

        let exposure = wallet.exposure + required;
        wallets::update_wallet(&mut tx, user_id, wallet.balance, exposure).await?;
        markets::adjust_market_exposure(&mut tx, user_id, market_id, required).await?;
        ledger::append(
            &mut tx,
            user_id,
            -required,
            LedgerKind::ExposureLock,
            wallet.balance,
            Some(&format!("exposure lock for order on market {}", market_id)),
        )
        .await?;

        let order =
            orders::insert(&mut tx, user_id, market_id, selection_id, side, price, stake, required)
                .await?;

        let outcome = engine::match_order(&mut tx, &order).await?;

        tx.commit().await?;

        tracing::info!(
            order_id = order.id,
            user_id,
            market_id,
            selection_id,
            side = ?side,
            price = %price,
            stake = %stake,
            matched = %outcome.matched_stake,
            "order placed"
        );

        let placed = Wallet {
            user_id,
            balance: wallet.balance,
            exposure,
        };
        self.events.emit(ExchangeEvent::BalanceUpdate {
            user_id,
            balance: placed.balance,
            exposure: placed.exposure,
            available_balance: placed.available(),
            changed_by: "order_place",
            amount: required,
        });
        self.events.emit(ExchangeEvent::BetPlaced {
            user_id,
            order_id: order.id,
            market_id,
            matched_stake: outcome.matched_stake,
            remaining_stake: outcome.remaining_stake,
            status: outcome.status,
        });

        Ok(PlaceOrderResult {
            order: Order {
                matched_stake: outcome.matched_stake,
                remaining_stake: outcome.remaining_stake,
                status: outcome.status,
                ..order
            },
            trades: outcome.trades,
            matched_stake: outcome.matched_stake,
            remaining_stake: outcome.remaining_stake,
            status: outcome.status,
            balance: placed.balance,
            exposure: placed.exposure,
            available_balance: placed.available(),
        })
    }

    /// Cancel an OPEN or PARTIAL order owned by the caller.
    pub async fn cancel_order(&self, user_id: i64, order_id: i64) -> CoreResult<CancelOrderResult> {
        let mut tx = begin_with_timeout(&self.pool, ORDER_TX_BUDGET).await?;

        let order = orders::lock(&mut tx, order_id).await?;
        if order.user_id != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "order {} does not belong to user {}",
                order_id, user_id
            )));
        }
        if !order.status.is_cancellable() {
            return Err(CoreError::InvalidState(format!(
                "order {} is {:?} and cannot be cancelled",
                order_id, order.status
            )));
        }

        let releaseable = money::quantize_money(order.releaseable_exposure());

        orders::set_status(&mut tx, order_id, OrderStatus::Cancelled).await?;
        let (wallet, released) = wallets::release_exposure(&mut tx, user_id, releaseable).await?;
        markets::adjust_market_exposure(&mut tx, user_id, order.market_id, -released).await?;
        ledger::append(
            &mut tx,
            user_id,
            released,
            LedgerKind::ExposureRelease,
            wallet.balance,
            Some(&format!("exposure release for cancelled order {}", order_id)),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(order_id, user_id, released = %released, "order cancelled");

        self.events.emit(ExchangeEvent::BalanceUpdate {
            user_id,
            balance: wallet.balance,
            exposure: wallet.exposure,
            available_balance: wallet.available(),
            changed_by: "order_cancel",
            amount: released,
        });

        Ok(CancelOrderResult {
            order_id,
            released_exposure: released,
            new_exposure: wallet.exposure,
            available_balance: wallet.available(),
        })
    }

    /// Newest-first page of a user's orders with their trades elided.
    pub async fn user_orders(&self, user_id: i64, limit: i64) -> CoreResult<Vec<Order>> {
        orders::orders_for_user(&self.pool, user_id, limit).await
    }

    /// Trades a given order participated in.
    pub async fn order_trades(&self, order_id: i64) -> CoreResult<Vec<Trade>> {
        trades::trades_for_order(&self.pool, order_id).await
    }
}
