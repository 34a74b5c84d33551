//! Settlement scanner.
//!
//! Periodically asks the provider for final results of LIVE fixtures. When
//! a fixture completes, the match is transitioned and every unsettled
//! market is resolved through the settlement engine, the same path the
//! admin force-close uses. Each market settles in its own transaction, so a
//! failure on one market leaves the others settled and is retried on the
//! next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::models::{MarketStatus, MatchStatus};
use crate::service::{MarketService, SettlementService};

use super::provider::OddsProvider;

pub struct ScoresPoller {
    market_service: Arc<MarketService>,
    settlement_service: Arc<SettlementService>,
    provider: Arc<dyn OddsProvider>,
    /// Admin user the scanner acts as.
    system_user: i64,
    poll_interval: Duration,
}

impl ScoresPoller {
    pub fn new(
        market_service: Arc<MarketService>,
        settlement_service: Arc<SettlementService>,
        provider: Arc<dyn OddsProvider>,
        system_user: i64,
        poll_interval_secs: u64,
    ) -> Self {
        Self {
            market_service,
            settlement_service,
            provider,
            system_user,
            poll_interval: Duration::from_secs(poll_interval_secs),
        }
    }

    /// Run forever. Spawned by the composition root.
    pub async fn run(self) {
        tracing::info!(interval = ?self.poll_interval, "settlement scanner starting");
        loop {
            if let Err(e) = self.tick().await {
                tracing::warn!("settlement scan failed: {}", e);
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn tick(&self) -> crate::error::CoreResult<()> {
        for fixture in self.market_service.live_fixtures().await? {
            let Some(external_id) = fixture.external_id.as_deref() else {
                continue;
            };
            let result = match self
                .provider
                .fetch_result(&fixture.sport_key, external_id)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(match_id = fixture.id, "result fetch failed: {}", e);
                    continue;
                }
            };
            if !result.completed {
                continue;
            }

            tracing::info!(
                match_id = fixture.id,
                winner = ?result.winner,
                "fixture completed, settling markets"
            );

            self.market_service
                .transition_match(self.system_user, fixture.id, MatchStatus::Completed)
                .await?;

            for market in self.market_service.markets_for_fixture(fixture.id).await? {
                if market.status == MarketStatus::Settled {
                    continue;
                }
                let (_, runners) = self.market_service.market_with_runners(market.id).await?;

                // Winner name maps onto runner names; a completed fixture
                // without a winner refunds everyone. A market whose runners
                // don't mention the winner is left for manual settlement.
                let winners: Vec<i64> = match &result.winner {
                    Some(name) => {
                        let ids: Vec<i64> = runners
                            .iter()
                            .filter(|r| &r.name == name)
                            .map(|r| r.id)
                            .collect();
                        if ids.is_empty() {
                            tracing::warn!(
                                market_id = market.id,
                                winner = %name,
                                "no runner matches the reported winner; skipping market"
                            );
                            continue;
                        }
                        ids
                    }
                    None => Vec::new(),
                };

                if let Err(e) = self
                    .settlement_service
                    .settle_market(self.system_user, market.id, &winners)
                    .await
                {
                    tracing::error!(market_id = market.id, "auto-settlement failed: {}", e);
                }
            }
        }
        Ok(())
    }
}
