//! Core domain types: sides, order/market/match lifecycles, ledger kinds.
//!
//! The BACK/LAY distinction is dispatched through [`Side`]: exposure
//! formulas and price compatibility live here in one place so a future side
//! (e.g. spread) only touches this module.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================
// SIDE
// ============================================================

/// Order side.
///
/// BACK profits if the selection wins (max loss = stake).
/// LAY profits if it does not (max loss = (price - 1) * stake, the liability).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Back,
    Lay,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Back => Side::Lay,
            Side::Lay => Side::Back,
        }
    }

    /// Exposure reserved against potential loss for an order on this side.
    ///
    /// BACK risks the stake itself; LAY risks the liability.
    pub fn required_exposure(self, price: Decimal, stake: Decimal) -> Decimal {
        match self {
            Side::Back => stake,
            Side::Lay => (price - Decimal::ONE) * stake,
        }
    }

    /// Whether a resting order on the opposite side at `resting_price` is a
    /// candidate for an incoming order on this side limited to `limit_price`.
    pub fn crosses(self, limit_price: Decimal, resting_price: Decimal) -> bool {
        match self {
            // Incoming BACK takes resting LAY offers at or below its limit.
            Side::Back => resting_price <= limit_price,
            // Incoming LAY takes resting BACK offers at or above its limit.
            Side::Lay => resting_price >= limit_price,
        }
    }

    /// Scan direction over the opposite side's book: BACK walks the LAY side
    /// lowest-price-first, LAY walks the BACK side highest-price-first.
    /// Ties always break oldest-first.
    pub fn scan_price_ascending(self) -> bool {
        matches!(self, Side::Back)
    }
}

impl From<Side> for i16 {
    fn from(s: Side) -> i16 {
        match s {
            Side::Back => 0,
            Side::Lay => 1,
        }
    }
}

impl TryFrom<i16> for Side {
    type Error = i16;
    fn try_from(v: i16) -> Result<Self, i16> {
        match v {
            0 => Ok(Side::Back),
            1 => Ok(Side::Lay),
            other => Err(other),
        }
    }
}

// ============================================================
// ORDER
// ============================================================

/// Order status.
///
/// OPEN and PARTIAL orders rest in the book; MATCHED and CANCELLED are
/// terminal. CANCELLED may be entered from OPEN or PARTIAL only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    Partial,
    Matched,
    Cancelled,
}

impl OrderStatus {
    /// Derive status from fill state. Holds the order invariants:
    /// OPEN ⇔ matched = 0, MATCHED ⇔ remaining = 0, PARTIAL otherwise.
    pub fn from_fill(matched_stake: Decimal, remaining_stake: Decimal) -> OrderStatus {
        if remaining_stake.is_zero() {
            OrderStatus::Matched
        } else if matched_stake.is_zero() {
            OrderStatus::Open
        } else {
            OrderStatus::Partial
        }
    }

    /// Whether the order still rests in the book.
    pub fn is_active(self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::Partial)
    }

    pub fn is_cancellable(self) -> bool {
        self.is_active()
    }
}

impl From<OrderStatus> for i16 {
    fn from(s: OrderStatus) -> i16 {
        match s {
            OrderStatus::Open => 0,
            OrderStatus::Partial => 1,
            OrderStatus::Matched => 2,
            OrderStatus::Cancelled => 3,
        }
    }
}

impl TryFrom<i16> for OrderStatus {
    type Error = i16;
    fn try_from(v: i16) -> Result<Self, i16> {
        match v {
            0 => Ok(OrderStatus::Open),
            1 => Ok(OrderStatus::Partial),
            2 => Ok(OrderStatus::Matched),
            3 => Ok(OrderStatus::Cancelled),
            other => Err(other),
        }
    }
}

/// A resting or incoming order.
///
/// Identity fields are immutable; only `matched_stake`, `remaining_stake`
/// and `status` change after insertion, and only through the matching
/// engine, cancellation or settlement.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub market_id: i64,
    pub selection_id: i64,
    pub side: Side,
    pub price: Decimal,
    pub stake: Decimal,
    pub matched_stake: Decimal,
    pub remaining_stake: Decimal,
    pub locked_exposure: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Exposure still backing the unmatched portion; this is what a
    /// cancellation releases.
    pub fn releaseable_exposure(&self) -> Decimal {
        self.side.required_exposure(self.price, self.remaining_stake)
    }
}

// ============================================================
// TRADE
// ============================================================

/// A bilateral fill between one BACK and one LAY order of different users,
/// printed at the resting order's price. Immutable except for the
/// settlement flag, which flips exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    pub id: i64,
    pub back_order_id: i64,
    pub lay_order_id: i64,
    pub market_id: i64,
    pub selection_id: i64,
    pub price: Decimal,
    pub stake: Decimal,
    pub settled: bool,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ============================================================
// WALLET & LEDGER
// ============================================================

/// Wallet snapshot. `available()` is what the user may newly commit.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Wallet {
    pub user_id: i64,
    pub balance: Decimal,
    pub exposure: Decimal,
}

impl Wallet {
    pub fn available(&self) -> Decimal {
        self.balance - self.exposure
    }
}

/// Ledger entry kind.
///
/// Balance-affecting kinds (CREDIT, DEBIT, TRANSFER_*, ORDER_SETTLE,
/// BET_SETTLE, BET_REFUND) sum to the wallet balance; exposure kinds record
/// reservations and carry an unchanged post-balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerKind {
    Credit,
    Debit,
    TransferIn,
    TransferOut,
    OrderPlace,
    OrderCancel,
    OrderSettle,
    ExposureLock,
    ExposureRelease,
    BetPlace,
    BetSettle,
    BetRefund,
}

impl LedgerKind {
    /// Whether entries of this kind move the wallet balance.
    pub fn affects_balance(self) -> bool {
        matches!(
            self,
            LedgerKind::Credit
                | LedgerKind::Debit
                | LedgerKind::TransferIn
                | LedgerKind::TransferOut
                | LedgerKind::OrderSettle
                | LedgerKind::BetSettle
                | LedgerKind::BetRefund
        )
    }
}

impl From<LedgerKind> for i16 {
    fn from(k: LedgerKind) -> i16 {
        match k {
            LedgerKind::Credit => 0,
            LedgerKind::Debit => 1,
            LedgerKind::TransferIn => 2,
            LedgerKind::TransferOut => 3,
            LedgerKind::OrderPlace => 4,
            LedgerKind::OrderCancel => 5,
            LedgerKind::OrderSettle => 6,
            LedgerKind::ExposureLock => 7,
            LedgerKind::ExposureRelease => 8,
            LedgerKind::BetPlace => 9,
            LedgerKind::BetSettle => 10,
            LedgerKind::BetRefund => 11,
        }
    }
}

impl TryFrom<i16> for LedgerKind {
    type Error = i16;
    fn try_from(v: i16) -> Result<Self, i16> {
        Ok(match v {
            0 => LedgerKind::Credit,
            1 => LedgerKind::Debit,
            2 => LedgerKind::TransferIn,
            3 => LedgerKind::TransferOut,
            4 => LedgerKind::OrderPlace,
            5 => LedgerKind::OrderCancel,
            6 => LedgerKind::OrderSettle,
            7 => LedgerKind::ExposureLock,
            8 => LedgerKind::ExposureRelease,
            9 => LedgerKind::BetPlace,
            10 => LedgerKind::BetSettle,
            11 => LedgerKind::BetRefund,
            other => return Err(other),
        })
    }
}

/// Append-only ledger record. `post_balance` equals the wallet balance
/// immediately after the entry and is the audit anchor.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub kind: LedgerKind,
    pub post_balance: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================
// USERS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Agent,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl From<Role> for i16 {
    fn from(r: Role) -> i16 {
        match r {
            Role::User => 0,
            Role::Agent => 1,
            Role::Admin => 2,
            Role::SuperAdmin => 3,
        }
    }
}

impl TryFrom<i16> for Role {
    type Error = i16;
    fn try_from(v: i16) -> Result<Self, i16> {
        match v {
            0 => Ok(Role::User),
            1 => Ok(Role::Agent),
            2 => Ok(Role::Admin),
            3 => Ok(Role::SuperAdmin),
            other => Err(other),
        }
    }
}

/// Exchange user. The parent link forms the agent tree used by the
/// surrounding transfer logic; the core only reads the role.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// ============================================================
// MATCH & MARKET LIFECYCLES
// ============================================================

/// Sporting contest status: UPCOMING → LIVE → COMPLETED, or either
/// non-terminal state → CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Upcoming,
    Live,
    Completed,
    Cancelled,
}

impl MatchStatus {
    pub fn can_transition_to(self, next: MatchStatus) -> bool {
        use MatchStatus::*;
        matches!(
            (self, next),
            (Upcoming, Live) | (Live, Completed) | (Upcoming, Cancelled) | (Live, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Cancelled)
    }
}

impl From<MatchStatus> for i16 {
    fn from(s: MatchStatus) -> i16 {
        match s {
            MatchStatus::Upcoming => 0,
            MatchStatus::Live => 1,
            MatchStatus::Completed => 2,
            MatchStatus::Cancelled => 3,
        }
    }
}

impl TryFrom<i16> for MatchStatus {
    type Error = i16;
    fn try_from(v: i16) -> Result<Self, i16> {
        match v {
            0 => Ok(MatchStatus::Upcoming),
            1 => Ok(MatchStatus::Live),
            2 => Ok(MatchStatus::Completed),
            3 => Ok(MatchStatus::Cancelled),
            other => Err(other),
        }
    }
}

/// Market status: OPEN → SUSPENDED ↔ OPEN → CLOSED → SETTLED.
/// Only OPEN accepts new orders; SETTLED is fully terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStatus {
    Open,
    Suspended,
    Closed,
    Settled,
}

impl MarketStatus {
    pub fn can_transition_to(self, next: MarketStatus) -> bool {
        use MarketStatus::*;
        matches!(
            (self, next),
            (Open, Suspended)
                | (Suspended, Open)
                | (Open, Closed)
                | (Suspended, Closed)
                | (Closed, Settled)
        )
    }

    pub fn accepts_orders(self) -> bool {
        self == MarketStatus::Open
    }
}

impl From<MarketStatus> for i16 {
    fn from(s: MarketStatus) -> i16 {
        match s {
            MarketStatus::Open => 0,
            MarketStatus::Suspended => 1,
            MarketStatus::Closed => 2,
            MarketStatus::Settled => 3,
        }
    }
}

impl TryFrom<i16> for MarketStatus {
    type Error = i16;
    fn try_from(v: i16) -> Result<Self, i16> {
        match v {
            0 => Ok(MarketStatus::Open),
            1 => Ok(MarketStatus::Suspended),
            2 => Ok(MarketStatus::Closed),
            3 => Ok(MarketStatus::Settled),
            other => Err(other),
        }
    }
}

/// A sporting contest (fixture) hosting one or more markets.
#[derive(Debug, Clone, Serialize)]
pub struct Fixture {
    pub id: i64,
    pub external_id: Option<String>,
    pub sport_key: String,
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

/// A proposition on a fixture (e.g. "Match Odds") with at least two runners.
#[derive(Debug, Clone, Serialize)]
pub struct Market {
    pub id: i64,
    pub match_id: i64,
    pub name: String,
    pub status: MarketStatus,
    pub created_at: DateTime<Utc>,
}

/// A named outcome of a market.
///
/// `back_price`/`lay_price` are display-only reference prices from the
/// external feed and are never read by the matching engine. `is_winner` is
/// null until settlement; null at settlement means refund.
#[derive(Debug, Clone, Serialize)]
pub struct Runner {
    pub id: i64,
    pub market_id: i64,
    pub name: String,
    pub back_price: Option<Decimal>,
    pub lay_price: Option<Decimal>,
    pub is_winner: Option<bool>,
}

/// Per-(user, market) aggregate of locked exposure, kept in step with the
/// wallet's global exposure for admin oversight and reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct MarketExposure {
    pub user_id: i64,
    pub market_id: i64,
    pub exposure: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn back_exposure_is_stake() {
        assert_eq!(Side::Back.required_exposure(d("2.50"), d("100")), d("100"));
    }

    #[test]
    fn lay_exposure_is_liability() {
        // (3.00 - 1) * 10 = 20
        assert_eq!(Side::Lay.required_exposure(d("3.00"), d("10")), d("20.00"));
    }

    #[test]
    fn back_crosses_cheaper_lay() {
        assert!(Side::Back.crosses(d("2.50"), d("2.40")));
        assert!(Side::Back.crosses(d("2.50"), d("2.50")));
        assert!(!Side::Back.crosses(d("2.50"), d("2.52")));
    }

    #[test]
    fn lay_crosses_higher_back() {
        assert!(Side::Lay.crosses(d("3.00"), d("3.00")));
        assert!(Side::Lay.crosses(d("3.00"), d("3.10")));
        assert!(!Side::Lay.crosses(d("3.00"), d("2.90")));
    }

    #[test]
    fn scan_direction_per_side() {
        assert!(Side::Back.scan_price_ascending());
        assert!(!Side::Lay.scan_price_ascending());
    }

    #[test]
    fn status_from_fill() {
        assert_eq!(OrderStatus::from_fill(d("0"), d("100")), OrderStatus::Open);
        assert_eq!(OrderStatus::from_fill(d("40"), d("60")), OrderStatus::Partial);
        assert_eq!(OrderStatus::from_fill(d("100"), d("0")), OrderStatus::Matched);
    }

    #[test]
    fn cancelled_only_from_active() {
        assert!(OrderStatus::Open.is_cancellable());
        assert!(OrderStatus::Partial.is_cancellable());
        assert!(!OrderStatus::Matched.is_cancellable());
        assert!(!OrderStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn market_transitions() {
        use MarketStatus::*;
        assert!(Open.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Open));
        assert!(Open.can_transition_to(Closed));
        assert!(Closed.can_transition_to(Settled));
        assert!(!Settled.can_transition_to(Open));
        assert!(!Closed.can_transition_to(Open));
        assert!(!Open.can_transition_to(Settled));
    }

    #[test]
    fn match_transitions() {
        use MatchStatus::*;
        assert!(Upcoming.can_transition_to(Live));
        assert!(Live.can_transition_to(Completed));
        assert!(Upcoming.can_transition_to(Cancelled));
        assert!(Live.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Live));
    }

    #[test]
    fn only_open_market_accepts_orders() {
        assert!(MarketStatus::Open.accepts_orders());
        assert!(!MarketStatus::Suspended.accepts_orders());
        assert!(!MarketStatus::Closed.accepts_orders());
        assert!(!MarketStatus::Settled.accepts_orders());
    }

    #[test]
    fn ledger_kind_balance_split() {
        assert!(LedgerKind::Credit.affects_balance());
        assert!(LedgerKind::OrderSettle.affects_balance());
        assert!(!LedgerKind::ExposureLock.affects_balance());
        assert!(!LedgerKind::ExposureRelease.affects_balance());
    }

    #[test]
    fn ledger_kind_roundtrip() {
        for v in 0..12i16 {
            let k = LedgerKind::try_from(v).unwrap();
            assert_eq!(i16::from(k), v);
        }
        assert!(LedgerKind::try_from(12).is_err());
    }

    #[test]
    fn wallet_available() {
        let w = Wallet {
            user_id: 1,
            balance: d("1000"),
            exposure: d("150"),
        };
        assert_eq!(w.available(), d("850"));
    }

    #[test]
    fn releaseable_exposure_uses_remaining() {
        let order = Order {
            id: 1,
            user_id: 1,
            market_id: 1,
            selection_id: 1,
            side: Side::Lay,
            price: d("3.00"),
            stake: d("200"),
            matched_stake: d("80"),
            remaining_stake: d("120"),
            locked_exposure: d("400"),
            status: OrderStatus::Partial,
            created_at: Utc::now(),
        };
        // (3.00 - 1) * 120 = 240
        assert_eq!(order.releaseable_exposure(), d("240.00"));
    }
}
