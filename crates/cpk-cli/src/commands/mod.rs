//! Command handlers for the `cpk` binary.
//!
//! Shared wiring (config, database url, engine, output mode) lives here.
//! Each submodule owns one command group.

pub mod alerts;
pub mod cashflow;
pub mod config;
pub mod db;
pub mod reconcile;
pub mod schedules;

use std::sync::Arc;

use anyhow::{Context, Result};
use cpk_config::secrets::{resolve_secrets, SecretRequirements};
use cpk_config::EngineConfig;
use cpk_db::PgStore;
use cpk_engine::Engine;
use cpk_schedule::NoIndexRates;
use serde::Serialize;

use self::config::ConfigArgs;

/// `key=value` lines by default, pretty JSON with `--json`.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// JSON mode prints `value`; text mode runs `lines`.
    pub fn emit<T: Serialize>(self, value: &T, lines: impl FnOnce()) -> Result<()> {
        if self.json {
            let s = serde_json::to_string_pretty(value).context("serialize output failed")?;
            println!("{s}");
        } else {
            lines();
        }
        Ok(())
    }
}

pub fn database_url(cfg: &EngineConfig) -> Result<String> {
    let secrets = resolve_secrets(
        cfg,
        SecretRequirements {
            database_url: true,
            ..SecretRequirements::default()
        },
    )?;
    secrets
        .database_url
        .with_context(|| format!("env var {} resolved to nothing", cfg.database.url_env))
}

pub struct Session {
    pub config: EngineConfig,
    pub store: Arc<PgStore>,
    pub engine: Engine,
}

/// Load config, connect, and wire an engine over Postgres.
///
/// The CLI has no index-rate source, so indexed adjustments fail with
/// `UpstreamUnavailable` and leave the contract untouched.
pub async fn open_session(args: &ConfigArgs) -> Result<Session> {
    let config = config::load(args)?;
    let pool = cpk_db::connect(&database_url(&config)?).await?;
    let store = Arc::new(PgStore::new(pool));
    let engine = Engine::new(store.clone(), Arc::new(NoIndexRates), config.to_settings());
    Ok(Session {
        config,
        store,
        engine,
    })
}

pub(crate) fn opt<T: std::fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map(|x| x.to_string()).unwrap_or_else(|| "-".to_string())
}
