use std::sync::Arc;

use anyhow::Context;
use db::{DbEngine, DbHandle};

use crate::domain::repo::LocationRepository;

pub mod memory;
pub mod migrations;
#[cfg(feature = "pg")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryLocationRepository;

/// Repository adapter matching the engine behind `db`.
pub fn location_repository(db: &DbHandle) -> anyhow::Result<Arc<dyn LocationRepository>> {
    match db.engine() {
        #[cfg(feature = "sqlite")]
        DbEngine::Sqlite => {
            let pool = db.sqlx_sqlite().context("SQLite pool is not available")?;
            Ok(Arc::new(sqlite::SqliteLocationRepository::new(pool.clone())))
        }
        #[cfg(feature = "pg")]
        DbEngine::Postgres => {
            let pool = db.sqlx_postgres().context("PostgreSQL pool is not available")?;
            Ok(Arc::new(postgres::PgLocationRepository::new(pool.clone())))
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("no location store adapter compiled in for {other:?}"),
    }
}
