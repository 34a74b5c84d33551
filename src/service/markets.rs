//! Match and market administration: creation and state machine transitions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{CoreError, CoreResult};
use crate::events::{ExchangeEvent, SharedSink};
use crate::models::{Fixture, Market, MarketStatus, MatchStatus, Runner};
use crate::persistence::markets::{self, FixtureInsert};
use crate::persistence::{begin_with_timeout, ORDER_TX_BUDGET};

pub struct MarketService {
    pool: PgPool,
    events: SharedSink,
}

/// Creation outcome: `created = false` means an existing fixture was found
/// under the same external id and is returned as-is (conflict, not error).
#[derive(Debug)]
pub struct FixtureResult {
    pub fixture: Fixture,
    pub created: bool,
}

impl MarketService {
    pub fn new(pool: PgPool, events: SharedSink) -> Self {
        Self { pool, events }
    }

    pub async fn create_fixture(
        &self,
        acting_user: i64,
        external_id: Option<&str>,
        sport_key: &str,
        home_team: &str,
        away_team: &str,
        start_time: DateTime<Utc>,
    ) -> CoreResult<FixtureResult> {
        let mut tx = begin_with_timeout(&self.pool, ORDER_TX_BUDGET).await?;
        super::require_admin(&mut tx, acting_user).await?;

        let inserted = markets::insert_fixture(
            &mut tx,
            external_id,
            sport_key,
            home_team,
            away_team,
            start_time,
        )
        .await?;
        tx.commit().await?;

        Ok(match inserted {
            FixtureInsert::Created(fixture) => {
                tracing::info!(match_id = fixture.id, sport_key, "match created");
                FixtureResult {
                    fixture,
                    created: true,
                }
            }
            FixtureInsert::Existing(fixture) => {
                tracing::info!(
                    match_id = fixture.id,
                    external_id = ?external_id,
                    "match creation resolved to existing external id"
                );
                FixtureResult {
                    fixture,
                    created: false,
                }
            }
        })
    }

    /// Create a market with its runners. A market needs at least two
    /// selections to be a proposition.
    pub async fn create_market(
        &self,
        acting_user: i64,
        match_id: i64,
        name: &str,
        runner_names: &[String],
    ) -> CoreResult<(Market, Vec<Runner>)> {
        if runner_names.len() < 2 {
            return Err(CoreError::InvalidInput(format!(
                "a market needs at least 2 runners, got {}",
                runner_names.len()
            )));
        }

        let mut tx = begin_with_timeout(&self.pool, ORDER_TX_BUDGET).await?;
        super::require_admin(&mut tx, acting_user).await?;

        let fixture = markets::lock_fixture(&mut tx, match_id).await?;
        if fixture.status.is_terminal() {
            return Err(CoreError::InvalidState(format!(
                "match {} is {:?}; no new markets",
                match_id, fixture.status
            )));
        }

        let market = markets::insert_market(&mut tx, match_id, name).await?;
        let mut runners = Vec::with_capacity(runner_names.len());
        for runner_name in runner_names {
            runners.push(markets::insert_runner(&mut tx, market.id, runner_name).await?);
        }
        tx.commit().await?;

        tracing::info!(market_id = market.id, match_id, name, "market created");
        Ok((market, runners))
    }

    /// Apply a market state machine transition.
    pub async fn transition_market(
        &self,
        acting_user: i64,
        market_id: i64,
        next: MarketStatus,
    ) -> CoreResult<Market> {
        let mut tx = begin_with_timeout(&self.pool, ORDER_TX_BUDGET).await?;
        super::require_admin(&mut tx, acting_user).await?;

        let market = markets::lock_market(&mut tx, market_id).await?;
        if !market.status.can_transition_to(next) {
            return Err(CoreError::InvalidState(format!(
                "market {} cannot move {:?} -> {:?}",
                market_id, market.status, next
            )));
        }
        markets::set_market_status(&mut tx, market_id, next).await?;
        tx.commit().await?;

        tracing::info!(market_id, from = ?market.status, to = ?next, "market transition");
        self.events.emit(ExchangeEvent::MarketUpdate {
            market_id,
            status: next,
        });

        Ok(Market {
            status: next,
            ..market
        })
    }

    /// Apply a match state machine transition.
    pub async fn transition_match(
        &self,
        acting_user: i64,
        match_id: i64,
        next: MatchStatus,
    ) -> CoreResult<Fixture> {
        let mut tx = begin_with_timeout(&self.pool, ORDER_TX_BUDGET).await?;
        super::require_admin(&mut tx, acting_user).await?;

        let fixture = markets::lock_fixture(&mut tx, match_id).await?;
        if !fixture.status.can_transition_to(next) {
            return Err(CoreError::InvalidState(format!(
                "match {} cannot move {:?} -> {:?}",
                match_id, fixture.status, next
            )));
        }
        markets::set_fixture_status(&mut tx, match_id, next).await?;
        tx.commit().await?;

        tracing::info!(match_id, from = ?fixture.status, to = ?next, "match transition");
        self.events.emit(ExchangeEvent::MatchUpdate {
            match_id,
            status: next,
        });

        Ok(Fixture {
            status: next,
            ..fixture
        })
    }

    /// Markets of a fixture, for listings and the settlement scanner.
    pub async fn markets_for_fixture(&self, match_id: i64) -> CoreResult<Vec<Market>> {
        markets::markets_for_fixture(&self.pool, match_id).await
    }

    /// Fixtures currently in play.
    pub async fn live_fixtures(&self) -> CoreResult<Vec<Fixture>> {
        markets::live_fixtures(&self.pool).await
    }

    /// A market with its runners (display prices included).
    pub async fn market_with_runners(&self, market_id: i64) -> CoreResult<(Market, Vec<Runner>)> {
        let mut conn = self.pool.acquire().await?;
        let market = markets::get_market(&mut conn, market_id).await?;
        let runners = markets::runners_for_market(&mut conn, market_id).await?;
        Ok((market, runners))
    }

    /// Locked exposure of one user on one market, for admin oversight.
    /// Reconcilable against the wallet's global exposure.
    pub async fn user_market_exposure(
        &self,
        user_id: i64,
        market_id: i64,
    ) -> CoreResult<Option<crate::models::MarketExposure>> {
        markets::market_exposure(&self.pool, user_id, market_id).await
    }

    /// Store display odds from the external feed. Never read by matching.
    pub async fn store_reference_odds(
        &self,
        market_id: i64,
        selection_id: i64,
        back_price: Option<rust_decimal::Decimal>,
        lay_price: Option<rust_decimal::Decimal>,
    ) -> CoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        markets::upsert_reference_odds(&mut conn, market_id, selection_id, back_price, lay_price)
            .await
    }
}
