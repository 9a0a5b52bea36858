use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use cpk_calendar::Granularity;
use cpk_cashflow::{build_matrix, MatrixRequest};
use cpk_schemas::{AlertChanges, AlertId, CoreResult, WorkspaceId};
use cpk_store::{ScheduleFilter, Store, TransactionFilter};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::diff::diff_alerts;
use crate::evaluate::{evaluate_rules, TenantData};
use crate::rules::{default_rules, RuleConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Tenants evaluated at once. 0 is treated as 1.
    pub max_concurrency: usize,
    /// Env var that must be set before an all-tenant batch may run.
    pub credential_env: Option<String>,
    /// Projection window, in whole months around today.
    pub lookback_months: u32,
    pub horizon_months: u32,
    pub rules: Vec<RuleConfig>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            credential_env: None,
            lookback_months: 1,
            horizon_months: 6,
            rules: default_rules(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub ok: bool,
    pub tenants_evaluated: usize,
    /// Inserted + re-opened.
    pub upserted: usize,
    pub refreshed: usize,
    pub resolved_stale: usize,
    pub duration_ms: u64,
    /// `"<workspace>: <code>: <message>"`, sorted.
    pub errors: Vec<String>,
}

impl BatchReport {
    fn absorb(&mut self, changes: &AlertChanges) {
        self.tenants_evaluated += 1;
        self.upserted += changes.upserted();
        self.refreshed += changes.refreshed.len();
        self.resolved_stale += changes.resolved.len();
    }
}

/// Read one tenant, run the rules and write the resulting changes.
pub async fn evaluate_tenant(
    store: &dyn Store,
    ws: WorkspaceId,
    opts: &BatchOptions,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> CoreResult<AlertChanges> {
    let req = MatrixRequest::window(
        today,
        opts.lookback_months,
        opts.horizon_months,
        Granularity::Month,
    )?;
    let accounts = store.accounts(ws).await?;
    let schedules = store.schedules(ws, &ScheduleFilter::all()).await?;
    let transactions = store
        .transactions(ws, &TransactionFilter::all().dated_between(req.from, req.to))
        .await?;
    let contracts = store.contracts(ws).await?;
    let notes = store.debit_notes(ws).await?;
    let existing = store.alerts(ws).await?;

    let matrix = build_matrix(&req, &accounts, &schedules, &transactions)?;
    let data = TenantData {
        workspace_id: ws,
        today,
        matrix: &matrix,
        schedules: &schedules,
        contracts: &contracts,
        notes: &notes,
    };
    let findings = evaluate_rules(&opts.rules, &data);
    debug!(workspace_id = %ws, findings = findings.len(), "rules evaluated");

    let changes = diff_alerts(ws, &existing, findings, now, AlertId::new_v4);
    if !changes.is_empty() {
        store.apply_alert_changes(ws, &changes).await?;
    }
    Ok(changes)
}

/// Evaluate `workspaces` (empty = every tenant) and report the totals.
///
/// Tenant failures land in `errors` and do not stop the batch. `ok` is
/// false when a precondition fails, when the tenant list cannot be read,
/// or when every requested tenant failed.
pub async fn run_batch(
    store: Arc<dyn Store>,
    opts: &BatchOptions,
    workspaces: &[WorkspaceId],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> BatchReport {
    let started = Instant::now();
    let mut report = BatchReport::default();

    let targets: Vec<WorkspaceId> = if workspaces.is_empty() {
        if let Some(name) = opts.credential_env.as_deref() {
            if std::env::var_os(name).is_none() {
                warn!(env = name, "all-tenant alert batch refused: credential missing");
                report.errors.push(format!("precondition: missing env var {name}"));
                report.duration_ms = started.elapsed().as_millis() as u64;
                return report;
            }
        }
        match store.list_workspaces().await {
            Ok(list) => list.into_iter().map(|w| w.id).collect(),
            Err(e) => {
                warn!(error = %e, "alert batch could not list tenants");
                report.errors.push(format!("*: {}: {}", e.code(), e.message()));
                report.duration_ms = started.elapsed().as_millis() as u64;
                return report;
            }
        }
    } else {
        workspaces.to_vec()
    };

    let permits = Arc::new(Semaphore::new(opts.max_concurrency.max(1)));
    let shared = Arc::new(opts.clone());
    let mut join_set = JoinSet::new();

    for ws in targets.iter().copied() {
        let store = Arc::clone(&store);
        let permits = Arc::clone(&permits);
        let opts = Arc::clone(&shared);
        join_set.spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => evaluate_tenant(store.as_ref(), ws, &opts, today, now).await,
                Err(_) => Err(cpk_schemas::CoreError::upstream("alert batch semaphore closed")),
            };
            (ws, result)
        });
    }

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((ws, Ok(changes))) => {
                info!(
                    workspace_id = %ws,
                    upserted = changes.upserted(),
                    refreshed = changes.refreshed.len(),
                    resolved_stale = changes.resolved.len(),
                    "tenant alerts evaluated"
                );
                report.absorb(&changes);
            }
            Ok((ws, Err(e))) => {
                warn!(workspace_id = %ws, code = e.code(), error = %e, "tenant alert evaluation failed");
                report.errors.push(format!("{ws}: {}: {}", e.code(), e.message()));
            }
            Err(e) => {
                warn!(error = %e, "tenant alert task aborted");
                report.errors.push(format!("*: INTERNAL_CONSISTENCY: task failed: {e}"));
            }
        }
    }

    report.errors.sort();
    report.ok = targets.is_empty() || report.tenants_evaluated > 0;
    report.duration_ms = started.elapsed().as_millis() as u64;
    info!(
        ok = report.ok,
        tenants = targets.len(),
        evaluated = report.tenants_evaluated,
        upserted = report.upserted,
        resolved_stale = report.resolved_stale,
        errors = report.errors.len(),
        duration_ms = report.duration_ms,
        "alert batch finished"
    );
    report
}
