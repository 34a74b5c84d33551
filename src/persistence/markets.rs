//! Fixture, market, runner, market-exposure and reference-odds rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use super::Conn;
use crate::error::{CoreError, CoreResult};
use crate::models::{Fixture, Market, MarketExposure, MarketStatus, MatchStatus, Runner};

// ============================================================
// FIXTURES
// ============================================================

fn fixture_from_row(row: &sqlx::postgres::PgRow) -> CoreResult<Fixture> {
    let status: i16 = row.get("status");
    Ok(Fixture {
        id: row.get("id"),
        external_id: row.get("external_id"),
        sport_key: row.get("sport_key"),
        home_team: row.get("home_team"),
        away_team: row.get("away_team"),
        start_time: row.get("start_time"),
        status: MatchStatus::try_from(status)
            .map_err(|v| CoreError::InvalidState(format!("unknown match status {}", v)))?,
        created_at: row.get("created_at"),
    })
}

const FIXTURE_COLUMNS: &str =
    "id, external_id, sport_key, home_team, away_team, start_time, status, created_at";

/// Outcome of a fixture insert: freshly created, or an existing row found
/// under the same external id (surfaced to the caller as a conflict, not an
/// error).
pub enum FixtureInsert {
    Created(Fixture),
    Existing(Fixture),
}

pub async fn insert_fixture(
    conn: &mut Conn,
    external_id: Option<&str>,
    sport_key: &str,
    home_team: &str,
    away_team: &str,
    start_time: DateTime<Utc>,
) -> CoreResult<FixtureInsert> {
    // Duplicate external ids turn creation into a read.
    if let Some(ext) = external_id {
        let existing = sqlx::query(&format!(
            "SELECT {FIXTURE_COLUMNS} FROM matches WHERE external_id = $1"
        ))
        .bind(ext)
        .fetch_optional(&mut *conn)
        .await?;
        if let Some(row) = existing {
            return Ok(FixtureInsert::Existing(fixture_from_row(&row)?));
        }
    }

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO matches (external_id, sport_key, home_team, away_team, start_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {FIXTURE_COLUMNS}
        "#
    ))
    .bind(external_id)
    .bind(sport_key)
    .bind(home_team)
    .bind(away_team)
    .bind(start_time)
    .fetch_one(conn)
    .await
    .map_err(|e| match &e {
        // Lost the race on the unique external id; still a conflict, not a
        // fault.
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            CoreError::Conflict(format!("external id {:?} already known", external_id))
        }
        _ => e.into(),
    })?;
    Ok(FixtureInsert::Created(fixture_from_row(&row)?))
}

pub async fn lock_fixture(conn: &mut Conn, match_id: i64) -> CoreResult<Fixture> {
    let row = sqlx::query(&format!(
        "SELECT {FIXTURE_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE"
    ))
    .bind(match_id)
    .fetch_optional(conn)
    .await?
    .ok_or(CoreError::NotFound("match"))?;
    fixture_from_row(&row)
}

pub async fn set_fixture_status(
    conn: &mut Conn,
    match_id: i64,
    status: MatchStatus,
) -> CoreResult<()> {
    sqlx::query("UPDATE matches SET status = $1 WHERE id = $2")
        .bind(i16::from(status))
        .bind(match_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Fixtures currently in play, for the settlement scanner.
pub async fn live_fixtures(pool: &PgPool) -> CoreResult<Vec<Fixture>> {
    let rows = sqlx::query(&format!(
        "SELECT {FIXTURE_COLUMNS} FROM matches WHERE status = $1 ORDER BY start_time"
    ))
    .bind(i16::from(MatchStatus::Live))
    .fetch_all(pool)
    .await?;
    rows.iter().map(fixture_from_row).collect()
}

/// Non-terminal fixtures that carry a provider id, for the display-odds
/// poller.
pub async fn pollable_fixtures(pool: &PgPool) -> CoreResult<Vec<Fixture>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {FIXTURE_COLUMNS} FROM matches
        WHERE status IN ($1, $2) AND external_id IS NOT NULL
        ORDER BY start_time
        "#
    ))
    .bind(i16::from(MatchStatus::Upcoming))
    .bind(i16::from(MatchStatus::Live))
    .fetch_all(pool)
    .await?;
    rows.iter().map(fixture_from_row).collect()
}

// ============================================================
// MARKETS
// ============================================================

fn market_from_row(row: &sqlx::postgres::PgRow) -> CoreResult<Market> {
    let status: i16 = row.get("status");
    Ok(Market {
        id: row.get("id"),
        match_id: row.get("match_id"),
        name: row.get("name"),
        status: MarketStatus::try_from(status)
            .map_err(|v| CoreError::InvalidState(format!("unknown market status {}", v)))?,
        created_at: row.get("created_at"),
    })
}

const MARKET_COLUMNS: &str = "id, match_id, name, status, created_at";

pub async fn insert_market(conn: &mut Conn, match_id: i64, name: &str) -> CoreResult<Market> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO markets (match_id, name)
        VALUES ($1, $2)
        RETURNING {MARKET_COLUMNS}
        "#
    ))
    .bind(match_id)
    .bind(name)
    .fetch_one(conn)
    .await?;
    market_from_row(&row)
}

pub async fn get_market(conn: &mut Conn, market_id: i64) -> CoreResult<Market> {
    let row = sqlx::query(&format!(
        "SELECT {MARKET_COLUMNS} FROM markets WHERE id = $1"
    ))
    .bind(market_id)
    .fetch_optional(conn)
    .await?
    .ok_or(CoreError::NotFound("market"))?;
    market_from_row(&row)
}

/// Take the market's row lock. Serializes settlement and status changes on
/// one market against each other.
pub async fn lock_market(conn: &mut Conn, market_id: i64) -> CoreResult<Market> {
    let row = sqlx::query(&format!(
        "SELECT {MARKET_COLUMNS} FROM markets WHERE id = $1 FOR UPDATE"
    ))
    .bind(market_id)
    .fetch_optional(conn)
    .await?
    .ok_or(CoreError::NotFound("market"))?;
    market_from_row(&row)
}

pub async fn set_market_status(
    conn: &mut Conn,
    market_id: i64,
    status: MarketStatus,
) -> CoreResult<()> {
    sqlx::query("UPDATE markets SET status = $1 WHERE id = $2")
        .bind(i16::from(status))
        .bind(market_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn markets_for_fixture(pool: &PgPool, match_id: i64) -> CoreResult<Vec<Market>> {
    let rows = sqlx::query(&format!(
        "SELECT {MARKET_COLUMNS} FROM markets WHERE match_id = $1 ORDER BY id"
    ))
    .bind(match_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(market_from_row).collect()
}

// ============================================================
// RUNNERS
// ============================================================

fn runner_from_row(row: &sqlx::postgres::PgRow) -> Runner {
    Runner {
        id: row.get("id"),
        market_id: row.get("market_id"),
        name: row.get("name"),
        back_price: row.get("back_price"),
        lay_price: row.get("lay_price"),
        is_winner: row.get("is_winner"),
    }
}

const RUNNER_COLUMNS: &str = "id, market_id, name, back_price, lay_price, is_winner";

pub async fn insert_runner(conn: &mut Conn, market_id: i64, name: &str) -> CoreResult<Runner> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO runners (market_id, name)
        VALUES ($1, $2)
        RETURNING {RUNNER_COLUMNS}
        "#
    ))
    .bind(market_id)
    .bind(name)
    .fetch_one(conn)
    .await?;
    Ok(runner_from_row(&row))
}

pub async fn get_runner(conn: &mut Conn, runner_id: i64) -> CoreResult<Runner> {
    let row = sqlx::query(&format!(
        "SELECT {RUNNER_COLUMNS} FROM runners WHERE id = $1"
    ))
    .bind(runner_id)
    .fetch_optional(conn)
    .await?
    .ok_or(CoreError::NotFound("runner"))?;
    Ok(runner_from_row(&row))
}

pub async fn runners_for_market(conn: &mut Conn, market_id: i64) -> CoreResult<Vec<Runner>> {
    let rows = sqlx::query(&format!(
        "SELECT {RUNNER_COLUMNS} FROM runners WHERE market_id = $1 ORDER BY id"
    ))
    .bind(market_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.iter().map(runner_from_row).collect())
}

/// Set the settlement flag on every runner of the market: winners true,
/// the rest false; an empty winner set leaves all flags null (refund).
pub async fn set_winners(conn: &mut Conn, market_id: i64, winner_ids: &[i64]) -> CoreResult<()> {
    if winner_ids.is_empty() {
        sqlx::query("UPDATE runners SET is_winner = NULL WHERE market_id = $1")
            .bind(market_id)
            .execute(conn)
            .await?;
    } else {
        sqlx::query("UPDATE runners SET is_winner = (id = ANY($1)) WHERE market_id = $2")
            .bind(winner_ids)
            .bind(market_id)
            .execute(conn)
            .await?;
    }
    Ok(())
}

// ============================================================
// MARKET EXPOSURE
// ============================================================

/// Apply a delta to the per-(user, market) exposure aggregate, clamping at
/// zero like the wallet counterpart.
pub async fn adjust_market_exposure(
    conn: &mut Conn,
    user_id: i64,
    market_id: i64,
    delta: Decimal,
) -> CoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO market_exposures (user_id, market_id, exposure)
        VALUES ($1, $2, GREATEST($3, 0))
        ON CONFLICT (user_id, market_id) DO UPDATE
        SET exposure = GREATEST(market_exposures.exposure + $3, 0),
            updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(market_id)
    .bind(delta)
    .execute(conn)
    .await?;
    Ok(())
}

/// Current per-market exposure for a user; absent means nothing locked.
pub async fn market_exposure(
    pool: &PgPool,
    user_id: i64,
    market_id: i64,
) -> CoreResult<Option<MarketExposure>> {
    let row = sqlx::query(
        r#"
        SELECT user_id, market_id, exposure, updated_at
        FROM market_exposures
        WHERE user_id = $1 AND market_id = $2
        "#,
    )
    .bind(user_id)
    .bind(market_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|row| MarketExposure {
        user_id: row.get("user_id"),
        market_id: row.get("market_id"),
        exposure: row.get("exposure"),
        updated_at: row.get("updated_at"),
    }))
}

// ============================================================
// REFERENCE ODDS (display only)
// ============================================================

pub async fn upsert_reference_odds(
    conn: &mut Conn,
    market_id: i64,
    selection_id: i64,
    back_price: Option<Decimal>,
    lay_price: Option<Decimal>,
) -> CoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO reference_odds (market_id, selection_id, back_price, lay_price, fetched_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (market_id, selection_id) DO UPDATE
        SET back_price = $3, lay_price = $4, fetched_at = NOW()
        "#,
    )
    .bind(market_id)
    .bind(selection_id)
    .bind(back_price)
    .bind(lay_price)
    .execute(&mut *conn)
    .await?;

    // Mirror onto the runner for single-read market listings.
    sqlx::query("UPDATE runners SET back_price = $1, lay_price = $2 WHERE id = $3")
        .bind(back_price)
        .bind(lay_price)
        .bind(selection_id)
        .execute(conn)
        .await?;
    Ok(())
}
