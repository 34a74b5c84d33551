//! Postgres DDL.
//!
//! Monetary columns are NUMERIC(15,2), odds columns NUMERIC(10,2). The two
//! order indexes serve the matching scan and the book aggregation
//! respectively.

use sqlx::PgPool;

use crate::error::CoreResult;

pub async fn init_schema(pool: &PgPool) -> CoreResult<()> {
    tracing::info!("Initializing Postgres schema...");

    for ddl in [
        CREATE_USERS,
        CREATE_WALLETS,
        CREATE_LEDGER,
        CREATE_MATCHES,
        CREATE_MARKETS,
        CREATE_RUNNERS,
        CREATE_ORDERS,
        CREATE_TRADES,
        CREATE_MARKET_EXPOSURES,
        CREATE_REFERENCE_ODDS,
        IDX_ORDERS_MATCHING,
        IDX_ORDERS_BOOK,
        IDX_TRADES_SETTLEMENT,
        IDX_LEDGER_USER,
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::info!("Postgres schema initialized");
    Ok(())
}

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id          BIGSERIAL PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    role        SMALLINT NOT NULL DEFAULT 0,
    parent_id   BIGINT REFERENCES users(id),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_WALLETS: &str = r#"
CREATE TABLE IF NOT EXISTS wallets (
    user_id     BIGINT PRIMARY KEY REFERENCES users(id),
    balance     NUMERIC(15,2) NOT NULL DEFAULT 0 CHECK (balance >= 0),
    exposure    NUMERIC(15,2) NOT NULL DEFAULT 0 CHECK (exposure >= 0),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_LEDGER: &str = r#"
CREATE TABLE IF NOT EXISTS ledger (
    id            BIGSERIAL PRIMARY KEY,
    user_id       BIGINT NOT NULL REFERENCES users(id),
    amount        NUMERIC(15,2) NOT NULL,
    kind          SMALLINT NOT NULL,
    post_balance  NUMERIC(15,2) NOT NULL,
    notes         TEXT,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_MATCHES: &str = r#"
CREATE TABLE IF NOT EXISTS matches (
    id           BIGSERIAL PRIMARY KEY,
    external_id  TEXT UNIQUE,
    sport_key    TEXT NOT NULL,
    home_team    TEXT NOT NULL,
    away_team    TEXT NOT NULL,
    start_time   TIMESTAMPTZ NOT NULL,
    status       SMALLINT NOT NULL DEFAULT 0,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_MARKETS: &str = r#"
CREATE TABLE IF NOT EXISTS markets (
    id          BIGSERIAL PRIMARY KEY,
    match_id    BIGINT NOT NULL REFERENCES matches(id),
    name        TEXT NOT NULL,
    status      SMALLINT NOT NULL DEFAULT 0,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_RUNNERS: &str = r#"
CREATE TABLE IF NOT EXISTS runners (
    id          BIGSERIAL PRIMARY KEY,
    market_id   BIGINT NOT NULL REFERENCES markets(id),
    name        TEXT NOT NULL,
    back_price  NUMERIC(10,2),
    lay_price   NUMERIC(10,2),
    is_winner   BOOLEAN
)
"#;

const CREATE_ORDERS: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id               BIGSERIAL PRIMARY KEY,
    user_id          BIGINT NOT NULL REFERENCES users(id),
    market_id        BIGINT NOT NULL REFERENCES markets(id),
    selection_id     BIGINT NOT NULL REFERENCES runners(id),
    side             SMALLINT NOT NULL,
    price            NUMERIC(10,2) NOT NULL CHECK (price > 1.00),
    stake            NUMERIC(15,2) NOT NULL CHECK (stake > 0),
    matched_stake    NUMERIC(15,2) NOT NULL DEFAULT 0,
    remaining_stake  NUMERIC(15,2) NOT NULL,
    locked_exposure  NUMERIC(15,2) NOT NULL,
    status           SMALLINT NOT NULL DEFAULT 0,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_TRADES: &str = r#"
CREATE TABLE IF NOT EXISTS trades (
    id             BIGSERIAL PRIMARY KEY,
    back_order_id  BIGINT NOT NULL REFERENCES orders(id),
    lay_order_id   BIGINT NOT NULL REFERENCES orders(id),
    market_id      BIGINT NOT NULL REFERENCES markets(id),
    selection_id   BIGINT NOT NULL REFERENCES runners(id),
    price          NUMERIC(10,2) NOT NULL,
    stake          NUMERIC(15,2) NOT NULL,
    settled        BOOLEAN NOT NULL DEFAULT FALSE,
    settled_at     TIMESTAMPTZ,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (back_order_id <> lay_order_id)
)
"#;

const CREATE_MARKET_EXPOSURES: &str = r#"
CREATE TABLE IF NOT EXISTS market_exposures (
    user_id     BIGINT NOT NULL REFERENCES users(id),
    market_id   BIGINT NOT NULL REFERENCES markets(id),
    exposure    NUMERIC(15,2) NOT NULL DEFAULT 0,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (user_id, market_id)
)
"#;

const CREATE_REFERENCE_ODDS: &str = r#"
CREATE TABLE IF NOT EXISTS reference_odds (
    market_id     BIGINT NOT NULL REFERENCES markets(id),
    selection_id  BIGINT NOT NULL REFERENCES runners(id),
    back_price    NUMERIC(10,2),
    lay_price     NUMERIC(10,2),
    fetched_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (market_id, selection_id)
)
"#;

// Matching scan: (selection, side, price, age).
const IDX_ORDERS_MATCHING: &str = r#"
CREATE INDEX IF NOT EXISTS idx_orders_matching
    ON orders (selection_id, side, price, created_at)
"#;

// Book aggregation over active orders.
const IDX_ORDERS_BOOK: &str = r#"
CREATE INDEX IF NOT EXISTS idx_orders_book
    ON orders (market_id, selection_id, status)
"#;

const IDX_TRADES_SETTLEMENT: &str = r#"
CREATE INDEX IF NOT EXISTS idx_trades_settlement
    ON trades (market_id, settled)
"#;

const IDX_LEDGER_USER: &str = r#"
CREATE INDEX IF NOT EXISTS idx_ledger_user
    ON ledger (user_id, id)
"#;
