use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use cpk_schemas::WorkspaceId;

use super::config::ConfigArgs;
use super::{open_session, Output};

/// One batch run. A failed batch still prints its report before exiting
/// non-zero.
pub async fn evaluate(
    args: &ConfigArgs,
    out: Output,
    workspaces: &[WorkspaceId],
    today: Option<NaiveDate>,
) -> Result<()> {
    let session = open_session(args).await?;
    let now = Utc::now();
    let today = today.unwrap_or_else(|| now.date_naive());
    let report = session
        .engine
        .evaluate_alerts(workspaces, today, now)
        .await?;

    out.emit(&report, || {
        println!("ok={}", report.ok);
        println!("tenants_evaluated={}", report.tenants_evaluated);
        println!("upserted={}", report.upserted);
        println!("refreshed={}", report.refreshed);
        println!("resolved_stale={}", report.resolved_stale);
        println!("duration_ms={}", report.duration_ms);
        for e in &report.errors {
            println!("error={e}");
        }
    })?;

    if !report.ok {
        bail!("ALERT_BATCH_FAILED: {} error(s)", report.errors.len());
    }
    Ok(())
}
