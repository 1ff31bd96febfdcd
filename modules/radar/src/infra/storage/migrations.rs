//! Idempotent schema bootstrap, run once before the HTTP listener is bound.

use anyhow::Context;
use db::{DbEngine, DbHandle};
use tracing::info;

#[cfg(feature = "sqlite")]
const SQLITE_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS user_locations (
        user_id      TEXT    PRIMARY KEY NOT NULL,
        latitude     REAL    NOT NULL,
        longitude    REAL    NOT NULL,
        last_seen_ms INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_user_locations_last_seen ON user_locations (last_seen_ms)",
    "CREATE INDEX IF NOT EXISTS idx_user_locations_lat_lon ON user_locations (latitude, longitude)",
];

#[cfg(feature = "pg")]
const POSTGRES_SCHEMA: &[&str] = &[
    "CREATE EXTENSION IF NOT EXISTS postgis",
    "CREATE TABLE IF NOT EXISTS user_locations (
        user_id   TEXT PRIMARY KEY,
        latitude  DOUBLE PRECISION NOT NULL,
        longitude DOUBLE PRECISION NOT NULL,
        last_seen TIMESTAMPTZ NOT NULL,
        location  geography(Point, 4326) NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_user_locations_location ON user_locations USING GIST (location)",
    "CREATE INDEX IF NOT EXISTS idx_user_locations_last_seen ON user_locations (last_seen)",
];

/// Create the location table and indexes if they do not exist yet.
pub async fn run_migrations(db: &DbHandle) -> anyhow::Result<()> {
    match db.engine() {
        #[cfg(feature = "sqlite")]
        DbEngine::Sqlite => {
            let pool = db.sqlx_sqlite().context("SQLite pool is not available")?;
            for stmt in SQLITE_SCHEMA {
                sqlx::query(stmt)
                    .execute(pool)
                    .await
                    .with_context(|| format!("schema statement failed: {stmt}"))?;
            }
        }
        #[cfg(feature = "pg")]
        DbEngine::Postgres => {
            let pool = db.sqlx_postgres().context("PostgreSQL pool is not available")?;
            for stmt in POSTGRES_SCHEMA {
                sqlx::query(stmt)
                    .execute(pool)
                    .await
                    .with_context(|| format!("schema statement failed: {stmt}"))?;
            }
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("no schema available for {other:?}"),
    }
    info!(engine = ?db.engine(), "Location schema ready");
    Ok(())
}
