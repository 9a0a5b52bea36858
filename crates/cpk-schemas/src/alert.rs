use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AlertId, WorkspaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

labelled_enum!(Severity {
    Info => "info",
    Warning => "warning",
    Critical => "critical",
});

/// `Open ⇄ Resolved` are the only transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Open,
    Resolved,
}

labelled_enum!(AlertState {
    Open => "open",
    Resolved => "resolved",
});

/// Navigable pointer back at the rows that triggered an alert.
///
/// `view` names the screen or report ("cashflow", "schedules", ...);
/// `filters` are the query parameters that reproduce the underlying data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillDown {
    pub view: String,
    pub filters: BTreeMap<String, String>,
}

impl DrillDown {
    pub fn new(view: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            filters: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.filters.insert(key.into(), value.to_string());
        self
    }
}

/// Derived, non-authoritative record. Unique by `(workspace_id, rule_id, target_key)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub workspace_id: WorkspaceId,
    pub rule_id: String,
    pub target_key: String,
    pub severity: Severity,
    pub state: AlertState,
    pub title: String,
    pub message: String,
    pub drill_down: DrillDown,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn is_open(&self) -> bool {
        self.state == AlertState::Open
    }

    /// `(rule_id, target_key)`: identity within a tenant.
    pub fn key(&self) -> (&str, &str) {
        (&self.rule_id, &self.target_key)
    }
}

/// Write set produced by one tenant's evaluation; applied atomically.
///
/// Every vector holds the full post-change row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertChanges {
    /// Keys never seen before.
    pub inserted: Vec<Alert>,
    /// Previously resolved, triggered again.
    pub reopened: Vec<Alert>,
    /// Still open; `last_seen`, message and drill-down updated.
    pub refreshed: Vec<Alert>,
    /// Previously open, no longer produced.
    pub resolved: Vec<Alert>,
}

impl AlertChanges {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
            && self.reopened.is_empty()
            && self.refreshed.is_empty()
            && self.resolved.is_empty()
    }

    /// Alerts that became open in this run.
    pub fn upserted(&self) -> usize {
        self.inserted.len() + self.reopened.len()
    }

    /// Every row to write, in a stable order.
    pub fn rows(&self) -> impl Iterator<Item = &Alert> {
        self.inserted
            .iter()
            .chain(self.reopened.iter())
            .chain(self.refreshed.iter())
            .chain(self.resolved.iter())
    }
}
