//! Transactions, matching, links and debit notes.

use chrono::{DateTime, NaiveDate, Utc};
use cpk_billing::{available_schedules, BillingCommand, BillingEffect};
use cpk_reconcile::{
    debit_note_candidates, note_linked_transactions, plan_reversal, schedule_candidates,
    schedule_linked_transactions, LinkCommand, MatchCandidate,
};
use cpk_schemas::{
    ContractId, CoreError, CoreResult, DebitNoteId, Schedule, ScheduleId, Transaction,
    TransactionId, TransactionKind, WorkspaceId,
};
use cpk_store::{ScheduleFilter, TransactionFilter};
use tracing::info;

use crate::engine::{ensure_tenant, Engine};

impl Engine {
    /// Store a transaction from an ingestion collaborator.
    ///
    /// Amounts are positive for their kind; reversals only come from
    /// `reverse_transaction`.
    pub async fn record_transaction(&self, ws: WorkspaceId, tx: &Transaction) -> CoreResult<()> {
        ensure_tenant(ws, tx.workspace_id, "transaction")?;
        if tx.reverses.is_some() {
            return Err(CoreError::invalid(
                "reversals are created with reverse_transaction",
            ));
        }
        if !tx.amount.is_positive() {
            return Err(CoreError::invalid(format!(
                "transaction amount must be positive, got {}",
                tx.amount
            )));
        }
        self.store.insert_transaction(ws, tx).await?;
        info!(workspace_id = %ws, transaction_id = %tx.id, kind = %tx.kind, "transaction recorded");
        Ok(())
    }

    /// Record the opposite-sign reversal of `original`.
    ///
    /// Linked transactions (to a schedule or a live debit note) must be
    /// unlinked first.
    pub async fn reverse_transaction(
        &self,
        ws: WorkspaceId,
        original: TransactionId,
        reversal_id: TransactionId,
        on: NaiveDate,
    ) -> CoreResult<Transaction> {
        let tx = self.store.transaction(ws, original).await?;
        let all = self.store.transactions(ws, &TransactionFilter::all()).await?;
        let schedules = self.store.schedules(ws, &ScheduleFilter::all()).await?;
        let notes = self.store.debit_notes(ws).await?;

        let mut linked = schedule_linked_transactions(&schedules);
        linked.extend(note_linked_transactions(&notes));
        let reversal = plan_reversal(&tx, &all, &linked, reversal_id, on)?;

        self.store.insert_transaction(ws, &reversal).await?;
        info!(workspace_id = %ws, transaction_id = %original, reversal_id = %reversal_id, "transaction reversed");
        Ok(reversal)
    }

    pub async fn transactions(
        &self,
        ws: WorkspaceId,
        filter: &TransactionFilter,
    ) -> CoreResult<Vec<Transaction>> {
        self.store.transactions(ws, filter).await
    }

    pub async fn schedules(
        &self,
        ws: WorkspaceId,
        filter: &ScheduleFilter,
    ) -> CoreResult<Vec<Schedule>> {
        self.store.schedules(ws, filter).await
    }

    /// Candidate transactions for an unmatched schedule, closest first.
    pub async fn schedule_candidates(
        &self,
        ws: WorkspaceId,
        schedule_id: ScheduleId,
    ) -> CoreResult<Vec<MatchCandidate>> {
        let schedules = self.store.schedules(ws, &ScheduleFilter::all()).await?;
        let schedule = schedules
            .iter()
            .find(|s| s.id == schedule_id)
            .ok_or_else(|| CoreError::not_found("schedule", schedule_id))?;
        let txs = self
            .store
            .transactions(ws, &TransactionFilter::of_kind(schedule.direction.settling_kind()))
            .await?;
        schedule_candidates(schedule, &txs, &schedules, &self.settings.tolerance)
    }

    /// Candidate income transactions for a debit note, closest first.
    pub async fn debit_note_candidates(
        &self,
        ws: WorkspaceId,
        note_id: DebitNoteId,
    ) -> CoreResult<Vec<MatchCandidate>> {
        let note = self.store.debit_note(ws, note_id).await?;
        let notes = self.store.debit_notes(ws).await?;
        let txs = self
            .store
            .transactions(ws, &TransactionFilter::of_kind(TransactionKind::Income))
            .await?;
        Ok(debit_note_candidates(
            &note,
            &txs,
            &notes,
            &self.settings.tolerance,
        ))
    }

    /// Schedules of a contract that may go on a new debit note, derived from
    /// the current paid notes.
    pub async fn available_schedules(
        &self,
        ws: WorkspaceId,
        contract_id: ContractId,
    ) -> CoreResult<Vec<Schedule>> {
        self.store.contract(ws, contract_id).await?;
        let schedules = self
            .store
            .schedules(ws, &ScheduleFilter::for_contract(contract_id))
            .await?;
        let notes = self.store.debit_notes(ws).await?;
        Ok(available_schedules(contract_id, &schedules, &notes)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn billing(
        &self,
        ws: WorkspaceId,
        cmd: &BillingCommand,
        now: DateTime<Utc>,
    ) -> CoreResult<BillingEffect> {
        let effect = self.store.apply_billing(ws, cmd, now).await?;
        info!(
            workspace_id = %ws,
            command = cmd.name(),
            debit_note_id = ?effect.upsert.as_ref().map(|n| n.id).or(effect.delete),
            "billing command applied"
        );
        Ok(effect)
    }

    pub async fn link(&self, ws: WorkspaceId, cmd: &LinkCommand) -> CoreResult<Schedule> {
        let schedule = self.store.apply_link(ws, cmd).await?;
        info!(
            workspace_id = %ws,
            schedule_id = %schedule.id,
            status = %schedule.status,
            "schedule link updated"
        );
        Ok(schedule)
    }
}
