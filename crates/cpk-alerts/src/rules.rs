use std::collections::BTreeSet;

use cpk_money::Cents;
use cpk_schemas::{CoreError, CoreResult, Severity};
use serde::{Deserialize, Serialize};

/// Rule kind plus its typed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// Projected periods whose adjusted planned balance is below zero.
    NegativeProjectedBalance,
    /// Lowest projected adjusted balance under `threshold`.
    LowBalance { threshold: Cents },
    /// Planned, unlinked schedules more than `grace_days` past due.
    OverdueSchedule {
        #[serde(default)]
        grace_days: u32,
    },
    /// Current period realised net under planned net by more than
    /// `tolerance_percent` of the planned net.
    RealisedShortfall { tolerance_percent: f64 },
    /// Active contracts ending within `within_days`.
    ContractEnding { within_days: u32 },
    /// Draft debit notes more than `after_days` past their due date.
    UnpaidDebitNote {
        #[serde(default)]
        after_days: u32,
    },
}

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::NegativeProjectedBalance => "negative_projected_balance",
            RuleKind::LowBalance { .. } => "low_balance",
            RuleKind::OverdueSchedule { .. } => "overdue_schedule",
            RuleKind::RealisedShortfall { .. } => "realised_shortfall",
            RuleKind::ContractEnding { .. } => "contract_ending",
            RuleKind::UnpaidDebitNote { .. } => "unpaid_debit_note",
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Stable id; part of every alert key this rule produces.
    pub id: String,
    pub severity: Severity,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub rule: RuleKind,
}

impl RuleConfig {
    pub fn new(id: impl Into<String>, severity: Severity, rule: RuleKind) -> Self {
        Self {
            id: id.into(),
            severity,
            enabled: true,
            rule,
        }
    }
}

/// Built-in rule set used when the configuration lists none.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig::new(
            "negative-projected-balance",
            Severity::Critical,
            RuleKind::NegativeProjectedBalance,
        ),
        RuleConfig::new(
            "overdue-schedule",
            Severity::Warning,
            RuleKind::OverdueSchedule { grace_days: 3 },
        ),
        RuleConfig::new(
            "realised-shortfall",
            Severity::Warning,
            RuleKind::RealisedShortfall {
                tolerance_percent: 10.0,
            },
        ),
        RuleConfig::new(
            "contract-ending",
            Severity::Info,
            RuleKind::ContractEnding { within_days: 30 },
        ),
        RuleConfig::new(
            "unpaid-debit-note",
            Severity::Warning,
            RuleKind::UnpaidDebitNote { after_days: 0 },
        ),
    ]
}

/// Ids must be non-empty and unique; percentages finite and non-negative.
pub fn validate_rules(rules: &[RuleConfig]) -> CoreResult<()> {
    let mut seen = BTreeSet::new();
    for r in rules {
        if r.id.trim().is_empty() {
            return Err(CoreError::invalid("alert rule id must not be empty"));
        }
        if !seen.insert(r.id.as_str()) {
            return Err(CoreError::invalid(format!("duplicate alert rule id '{}'", r.id)));
        }
        if let RuleKind::RealisedShortfall { tolerance_percent } = r.rule {
            if !tolerance_percent.is_finite() || tolerance_percent < 0.0 {
                return Err(CoreError::invalid(format!(
                    "rule '{}': tolerance_percent must be a non-negative number",
                    r.id
                )));
            }
        }
    }
    Ok(())
}
