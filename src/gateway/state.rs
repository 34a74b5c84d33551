//! Shared state for the HTTP boundary.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::service::{MarketService, OrderService, SettlementService, WalletService};

pub struct AppState {
    pub pool: PgPool,
    pub orders: Arc<OrderService>,
    pub markets: Arc<MarketService>,
    pub settlement: Arc<SettlementService>,
    pub wallets: Arc<WalletService>,
    pub config: AppConfig,
}
