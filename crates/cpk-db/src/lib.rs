//! cpk-db
//!
//! PostgreSQL persistence for the cash-planning engine.
//! - `PgStore` implements `cpk_store::Store` over a `PgPool`
//! - Lock-sensitive writes take a per-tenant advisory lock inside one
//!   database transaction
//! - Driver failures surface as `UpstreamUnavailable`; unique violations as
//!   `ConflictState`
//!
//! Schema lives in `./migrations` and is embedded with `sqlx::migrate!`.

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod rows;
mod store;

pub use store::PgStore;

/// Env var the tests and the default config read the connection string from.
pub const ENV_DB_URL: &str = "CPK_DATABASE_URL";

const POOL_SIZE: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn connect(url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(POOL_SIZE)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(url)
        .await
        .context("postgres connect failed")
}

/// Apply embedded migrations. Already-applied ones are skipped.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    tracing::info!("database migrations applied");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DbStatus {
    pub ok: bool,
    /// False until `migrate` has run against this database.
    pub has_schedules_table: bool,
}

pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let has_schedules_table: bool =
        sqlx::query_scalar("select to_regclass('public.schedules') is not null")
            .fetch_one(pool)
            .await
            .context("db status query failed")?;
    Ok(DbStatus {
        ok: true,
        has_schedules_table,
    })
}
