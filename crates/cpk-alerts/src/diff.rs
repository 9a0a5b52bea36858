use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use cpk_schemas::{Alert, AlertChanges, AlertId, AlertState, WorkspaceId};

use crate::evaluate::Finding;

/// Diff this run's findings against the tenant's stored alerts.
///
/// - new key: inserted open
/// - key stored and open: refreshed (`last_seen`, text, drill-down)
/// - key stored and resolved: re-opened, keeping `first_seen`
/// - open key not found this run: resolved as stale
///
/// Duplicate finding keys keep the first. `next_id` supplies ids for inserts.
pub fn diff_alerts(
    ws: WorkspaceId,
    existing: &[Alert],
    findings: Vec<Finding>,
    now: DateTime<Utc>,
    mut next_id: impl FnMut() -> AlertId,
) -> AlertChanges {
    let stored: HashMap<(&str, &str), &Alert> = existing
        .iter()
        .filter(|a| a.workspace_id == ws)
        .map(|a| (a.key(), a))
        .collect();

    let mut changes = AlertChanges::default();
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();

    for f in findings {
        if !seen.insert((f.rule_id.clone(), f.target_key.clone())) {
            continue;
        }
        match stored.get(&(f.rule_id.as_str(), f.target_key.as_str())) {
            None => changes.inserted.push(Alert {
                id: next_id(),
                workspace_id: ws,
                rule_id: f.rule_id,
                target_key: f.target_key,
                severity: f.severity,
                state: AlertState::Open,
                title: f.title,
                message: f.message,
                drill_down: f.drill_down,
                first_seen: now,
                last_seen: now,
                resolved_at: None,
            }),
            Some(prev) => {
                let row = Alert {
                    severity: f.severity,
                    state: AlertState::Open,
                    title: f.title,
                    message: f.message,
                    drill_down: f.drill_down,
                    last_seen: now,
                    resolved_at: None,
                    ..(*prev).clone()
                };
                if prev.is_open() {
                    changes.refreshed.push(row);
                } else {
                    changes.reopened.push(row);
                }
            }
        }
    }

    let mut stale: Vec<&Alert> = stored
        .values()
        .copied()
        .filter(|a| a.is_open())
        .filter(|a| !seen.contains(&(a.rule_id.clone(), a.target_key.clone())))
        .collect();
    stale.sort_by(|a, b| a.key().cmp(&b.key()));
    changes.resolved = stale
        .into_iter()
        .map(|a| Alert {
            state: AlertState::Resolved,
            resolved_at: Some(now),
            ..a.clone()
        })
        .collect();

    changes
}
