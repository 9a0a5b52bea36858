use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cpk_billing::{BillingCommand, BillingEffect};
use cpk_reconcile::LinkCommand;
use cpk_schedule::SchedulePlan;
use cpk_schemas::{
    Account, Alert, AlertChanges, Contract, ContractId, CoreError, CoreResult, DebitNote, DebitNoteId,
    Entity, Schedule, Transaction, TransactionId, Workspace, WorkspaceId,
};

use crate::contract::ContractCommand;
use crate::filter::{ScheduleFilter, TransactionFilter};

/// Tenant-scoped persistence.
///
/// Single-row lookups return `NotFound` for absent and cross-tenant ids
/// alike. Backend failures surface as `UpstreamUnavailable`.
#[async_trait]
pub trait Store: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn list_workspaces(&self) -> CoreResult<Vec<Workspace>>;

    async fn entities(&self, ws: WorkspaceId) -> CoreResult<Vec<Entity>>;

    async fn accounts(&self, ws: WorkspaceId) -> CoreResult<Vec<Account>>;

    async fn contracts(&self, ws: WorkspaceId) -> CoreResult<Vec<Contract>>;

    async fn contract(&self, ws: WorkspaceId, id: ContractId) -> CoreResult<Contract>;

    /// Insert or replace a contract row and its line items. Schedules are not
    /// touched; contract saves that must keep schedules in line go through
    /// [`Store::apply_contract`].
    async fn upsert_contract(&self, ws: WorkspaceId, contract: &Contract) -> CoreResult<()>;

    /// Ordered by `(due_date, sequence, id)`.
    async fn schedules(&self, ws: WorkspaceId, filter: &ScheduleFilter)
        -> CoreResult<Vec<Schedule>>;

    async fn insert_schedules(&self, ws: WorkspaceId, rows: &[Schedule]) -> CoreResult<()>;

    /// Plan a contract save or cancellation with [`crate::plan_contract`]
    /// against the rows read under the tenant's write lock, and write the
    /// contract together with the schedule plan in the same transaction.
    async fn apply_contract(&self, ws: WorkspaceId, cmd: &ContractCommand)
        -> CoreResult<SchedulePlan>;

    /// Ordered by `(date, id)`.
    async fn transactions(
        &self,
        ws: WorkspaceId,
        filter: &TransactionFilter,
    ) -> CoreResult<Vec<Transaction>>;

    /// `ConflictState` if the id exists or if `tx` reverses a transaction
    /// that already has a reversal.
    async fn insert_transaction(&self, ws: WorkspaceId, tx: &Transaction) -> CoreResult<()>;

    async fn transaction(&self, ws: WorkspaceId, id: TransactionId) -> CoreResult<Transaction>;

    async fn debit_notes(&self, ws: WorkspaceId) -> CoreResult<Vec<DebitNote>>;

    async fn debit_note(&self, ws: WorkspaceId, id: DebitNoteId) -> CoreResult<DebitNote>;

    /// Plan and write a billing command under the tenant's write lock, so
    /// two concurrent commands never claim the same schedule.
    async fn apply_billing(
        &self,
        ws: WorkspaceId,
        cmd: &BillingCommand,
        now: DateTime<Utc>,
    ) -> CoreResult<BillingEffect>;

    /// Link or unlink a schedule under the tenant's write lock. Returns the
    /// updated schedule.
    async fn apply_link(&self, ws: WorkspaceId, cmd: &LinkCommand) -> CoreResult<Schedule>;

    async fn alerts(&self, ws: WorkspaceId) -> CoreResult<Vec<Alert>>;

    /// Upsert every row by `(workspace_id, rule_id, target_key)` atomically.
    async fn apply_alert_changes(&self, ws: WorkspaceId, changes: &AlertChanges)
        -> CoreResult<()>;
}

/// `InvalidArgument` when a row handed to a write names another tenant.
pub fn ensure_owned(
    ws: WorkspaceId,
    row_ws: WorkspaceId,
    what: &str,
    id: impl std::fmt::Display,
) -> CoreResult<()> {
    if row_ws != ws {
        return Err(CoreError::invalid(format!(
            "{what} {id} belongs to workspace {row_ws}, not {ws}"
        )));
    }
    Ok(())
}
