//! Display-odds poller.
//!
//! Refreshes the reference odds of every pollable fixture on a fixed
//! interval. Failures are logged and the next tick carries on; a bad
//! provider response never touches anything but the display tables.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::time::sleep;

use crate::persistence::markets;
use crate::service::MarketService;

use super::provider::OddsProvider;

pub struct OddsPoller {
    pool: PgPool,
    market_service: Arc<MarketService>,
    provider: Arc<dyn OddsProvider>,
    poll_interval: Duration,
}

impl OddsPoller {
    pub fn new(
        pool: PgPool,
        market_service: Arc<MarketService>,
        provider: Arc<dyn OddsProvider>,
        poll_interval_secs: u64,
    ) -> Self {
        Self {
            pool,
            market_service,
            provider,
            poll_interval: Duration::from_secs(poll_interval_secs),
        }
    }

    /// Run forever. Spawned by the composition root.
    pub async fn run(self) {
        tracing::info!(interval = ?self.poll_interval, "odds poller starting");
        loop {
            if let Err(e) = self.tick().await {
                tracing::warn!("odds poll failed: {}", e);
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn tick(&self) -> crate::error::CoreResult<()> {
        let fixtures = markets::pollable_fixtures(&self.pool).await?;
        for fixture in fixtures {
            let Some(external_id) = fixture.external_id.as_deref() else {
                continue;
            };
            let odds = match self.provider.fetch_odds(&fixture.sport_key, external_id).await {
                Ok(odds) => odds,
                Err(e) => {
                    tracing::warn!(match_id = fixture.id, "odds fetch failed: {}", e);
                    continue;
                }
            };

            for market in self.market_service.markets_for_fixture(fixture.id).await? {
                let (_, runners) = self.market_service.market_with_runners(market.id).await?;
                for runner in &runners {
                    if let Some(quote) = odds.iter().find(|o| o.selection == runner.name) {
                        self.market_service
                            .store_reference_odds(market.id, runner.id, quote.back, quote.lay)
                            .await?;
                    }
                }
            }
        }
        Ok(())
    }
}
