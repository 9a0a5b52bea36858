use anyhow::{bail, Context, Result};
use cpk_alerts::{default_rules, validate_rules, BatchOptions, RuleConfig};
use cpk_engine::EngineSettings;
use cpk_reconcile::MatchTolerance;
use cpk_schedule::GenerateOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_DATABASE_URL_ENV: &str = "CPK_DATABASE_URL";

/// Typed configuration. Every field is optional in YAML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub reconcile: ReconcileSection,
    pub schedule: ScheduleSection,
    pub cashflow: CashflowSection,
    pub alerts: AlertsSection,
    pub database: DatabaseSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSection {
    pub amount_tolerance_cents: i64,
    pub date_tolerance_days: i64,
}

impl Default for ReconcileSection {
    fn default() -> Self {
        let t = MatchTolerance::default();
        Self {
            amount_tolerance_cents: t.amount_cents,
            date_tolerance_days: t.days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    /// Horizon used when a recurring contract has no end date.
    pub open_ended_horizon_months: u32,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            open_ended_horizon_months: GenerateOptions::default().open_ended_horizon_months,
        }
    }
}

/// Window the alert engine projects over, in months around today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CashflowSection {
    pub lookback_months: u32,
    pub horizon_months: u32,
}

impl Default for CashflowSection {
    fn default() -> Self {
        Self {
            lookback_months: 1,
            horizon_months: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsSection {
    pub max_concurrency: usize,
    /// Env var NAME that must be set before an all-tenant batch runs.
    pub credential_env: Option<String>,
    pub rules: Vec<RuleConfig>,
}

impl Default for AlertsSection {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            credential_env: None,
            rules: default_rules(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Env var NAME holding the connection string.
    pub url_env: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url_env: DEFAULT_DATABASE_URL_ENV.to_string(),
        }
    }
}

impl EngineConfig {
    /// Deserialize and validate a merged config document.
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: EngineConfig = serde_json::from_value(config_json.clone())
            .context("CONFIG_INVALID: config does not match the engine schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reconcile.amount_tolerance_cents < 0 {
            bail!("CONFIG_INVALID: reconcile.amount_tolerance_cents must be >= 0");
        }
        if self.reconcile.date_tolerance_days < 0 {
            bail!("CONFIG_INVALID: reconcile.date_tolerance_days must be >= 0");
        }
        if self.schedule.open_ended_horizon_months == 0 {
            bail!("CONFIG_INVALID: schedule.open_ended_horizon_months must be >= 1");
        }
        if self.alerts.max_concurrency == 0 {
            bail!("CONFIG_INVALID: alerts.max_concurrency must be >= 1");
        }
        if self.database.url_env.trim().is_empty() {
            bail!("CONFIG_INVALID: database.url_env must name an env var");
        }
        if let Some(name) = &self.alerts.credential_env {
            if name.trim().is_empty() {
                bail!("CONFIG_INVALID: alerts.credential_env must not be blank");
            }
        }
        validate_rules(&self.alerts.rules)
            .map_err(|e| anyhow::anyhow!("CONFIG_INVALID: {}", e.message()))?;
        Ok(())
    }

    pub fn to_settings(&self) -> EngineSettings {
        EngineSettings {
            tolerance: MatchTolerance {
                amount_cents: self.reconcile.amount_tolerance_cents,
                days: self.reconcile.date_tolerance_days,
            },
            generate: GenerateOptions {
                open_ended_horizon_months: self.schedule.open_ended_horizon_months,
            },
            alerts: BatchOptions {
                max_concurrency: self.alerts.max_concurrency,
                credential_env: self.alerts.credential_env.clone(),
                lookback_months: self.cashflow.lookback_months,
                horizon_months: self.cashflow.horizon_months,
                rules: self.alerts.rules.clone(),
            },
        }
    }
}
