//! Composition root: configuration, logging, pool, services, pollers and
//! the HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};

use betmatch::config::AppConfig;
use betmatch::events::BroadcastSink;
use betmatch::feeds::{OddsPoller, RestOddsProvider, ScoresPoller};
use betmatch::gateway::{self, AppState};
use betmatch::logging;
use betmatch::persistence::Database;
use betmatch::service::{MarketService, OrderService, SettlementService, WalletService};

#[tokio::main]
async fn main() -> Result<()> {
    let env = std::env::var("BMX_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env)?;
    let _guard = logging::init_logging(&config);

    tracing::info!(
        environment = %config.environment,
        git = option_env!("GIT_HASH").unwrap_or("unknown"),
        "betmatch starting"
    );

    let db = Database::connect(&config.postgres_url)
        .await
        .context("failed to connect to Postgres")?;
    db.init_schema().await.context("failed to init schema")?;
    let pool = db.pool().clone();

    let events = Arc::new(BroadcastSink::new(1024));

    let orders = Arc::new(OrderService::new(pool.clone(), events.clone()));
    let markets = Arc::new(MarketService::new(pool.clone(), events.clone()));
    let settlement = Arc::new(SettlementService::new(pool.clone(), events.clone()));
    let wallets = Arc::new(WalletService::new(pool.clone(), events.clone()));

    if config.odds_provider.enabled {
        let provider = Arc::new(RestOddsProvider::new(
            config.odds_provider.base_url.clone(),
            config.odds_provider.api_key.clone(),
        ));

        let system_user = resolve_system_user(&pool).await?;

        let odds_poller = OddsPoller::new(
            pool.clone(),
            markets.clone(),
            provider.clone(),
            config.odds_provider.odds_poll_secs,
        );
        tokio::spawn(odds_poller.run());

        let scores_poller = ScoresPoller::new(
            markets.clone(),
            settlement.clone(),
            provider,
            system_user,
            config.odds_provider.settlement_poll_secs,
        );
        tokio::spawn(scores_poller.run());
    } else {
        tracing::info!("odds provider disabled; display odds will not refresh");
    }

    let state = Arc::new(AppState {
        pool,
        orders,
        markets,
        settlement,
        wallets,
        config: config.clone(),
    });

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, gateway::router(state))
        .await
        .context("gateway server failed")?;

    Ok(())
}

/// The pollers act as the oldest SUPER_ADMIN; without one, auto-settlement
/// cannot run and the operator must settle through the admin API.
async fn resolve_system_user(pool: &sqlx::PgPool) -> Result<i64> {
    let id: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE role = $1 ORDER BY id LIMIT 1")
            .bind(i16::from(betmatch::models::Role::SuperAdmin))
            .fetch_optional(pool)
            .await?;
    id.context("odds provider enabled but no SUPER_ADMIN user exists")
}
