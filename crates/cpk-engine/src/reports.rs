//! Read-only projections and the alert batch.

use chrono::{DateTime, NaiveDate, Utc};
use cpk_alerts::{run_batch, validate_rules, BatchReport};
use cpk_calendar::PeriodKey;
use cpk_cashflow::{
    build_matrix, derive_kpis, drill_down, CashFlowMatrix, ExecutiveKpis, MatrixRequest,
    PeriodDetail,
};
use cpk_schemas::{CoreResult, WorkspaceId};
use cpk_store::{ScheduleFilter, TransactionFilter};
use tracing::debug;

use crate::engine::Engine;

impl Engine {
    pub async fn cash_flow_matrix(
        &self,
        ws: WorkspaceId,
        req: &MatrixRequest,
    ) -> CoreResult<CashFlowMatrix> {
        let accounts = self.store.accounts(ws).await?;
        let schedules = self
            .store
            .schedules(ws, &ScheduleFilter::all().due_between(req.from, req.to))
            .await?;
        let transactions = self
            .store
            .transactions(ws, &TransactionFilter::all().dated_between(req.from, req.to))
            .await?;
        let matrix = build_matrix(req, &accounts, &schedules, &transactions)?;
        debug!(workspace_id = %ws, periods = matrix.periods.len(), "cash-flow matrix built");
        Ok(matrix)
    }

    pub async fn executive_kpis(
        &self,
        ws: WorkspaceId,
        req: &MatrixRequest,
        today: NaiveDate,
    ) -> CoreResult<ExecutiveKpis> {
        let matrix = self.cash_flow_matrix(ws, req).await?;
        Ok(derive_kpis(&matrix, today))
    }

    /// The rows behind one bucket of the matrix for `req`.
    pub async fn drill_down(
        &self,
        ws: WorkspaceId,
        req: &MatrixRequest,
        period: PeriodKey,
    ) -> CoreResult<PeriodDetail> {
        let accounts = self.store.accounts(ws).await?;
        let schedules = self
            .store
            .schedules(
                ws,
                &ScheduleFilter::all().due_between(period.start(), period.end()),
            )
            .await?;
        let transactions = self
            .store
            .transactions(
                ws,
                &TransactionFilter::all().dated_between(period.start(), period.end()),
            )
            .await?;
        drill_down(req, period, &accounts, &schedules, &transactions)
    }

    /// Evaluate alerts for `workspaces` (empty = every tenant).
    pub async fn evaluate_alerts(
        &self,
        workspaces: &[WorkspaceId],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> CoreResult<BatchReport> {
        validate_rules(&self.settings.alerts.rules)?;
        Ok(run_batch(
            self.store.clone(),
            &self.settings.alerts,
            workspaces,
            today,
            now,
        )
        .await)
    }
}
