//! betmatch - Peer-to-Peer Sports Betting Exchange Core
//!
//! Order matching and settlement for two-sided BACK/LAY quotes on binary
//! market outcomes, with per-user exposure accounting on an append-only
//! ledger.
//!
//! # Modules
//!
//! - [`models`] - Domain types (sides, lifecycles, ledger kinds)
//! - [`money`] - Decimal validation and rounding
//! - [`config`] - Application configuration
//! - [`persistence`] - Postgres stores and locking discipline
//! - [`engine`] - Price-time matching engine
//! - [`orderbook`] - Price-level book aggregation
//! - [`service`] - Transactional operations (orders, settlement, admin)
//! - [`events`] - Post-commit event sink
//! - [`feeds`] - External odds/scores pollers
//! - [`gateway`] - HTTP/JSON boundary

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod feeds;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod money;
pub mod orderbook;
pub mod persistence;
pub mod service;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use engine::MatchOutcome;
pub use error::{CoreError, CoreResult};
pub use events::{BroadcastSink, EventSink, ExchangeEvent, NoopSink};
pub use models::{
    Fixture, LedgerEntry, LedgerKind, Market, MarketStatus, MatchStatus, Order, OrderStatus, Role,
    Runner, Side, Trade, User, Wallet,
};
pub use persistence::Database;
pub use service::{MarketService, OrderService, SettlementService, WalletService};
