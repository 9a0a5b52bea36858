use std::collections::BTreeSet;

use chrono::NaiveDate;
use cpk_schemas::{
    CoreError, CoreResult, Schedule, ScheduleStatus, Transaction, TransactionId,
};

use crate::engine::schedule_linked_transactions;
use crate::types::LinkCommand;

/// Link `tx` to `schedule`: the schedule becomes `Realized`.
///
/// Requires a planned, unlinked schedule and an unlinked transaction of the
/// settling kind from the same tenant that is neither a reversal nor reversed.
pub fn plan_link(
    schedule: &Schedule,
    tx: &Transaction,
    schedules: &[Schedule],
    transactions: &[Transaction],
) -> CoreResult<Schedule> {
    if tx.workspace_id != schedule.workspace_id {
        return Err(CoreError::not_found("transaction", tx.id));
    }
    if !schedule.is_planned() || schedule.is_linked() {
        return Err(CoreError::conflict(format!(
            "schedule {} is {} and cannot be linked",
            schedule.id, schedule.status
        )));
    }
    let expected = schedule.direction.settling_kind();
    if tx.kind != expected {
        return Err(CoreError::invalid(format!(
            "schedule {} is {} and needs a {expected} transaction, got {}",
            schedule.id, schedule.direction, tx.kind
        )));
    }
    if tx.is_reversal() || transactions.iter().any(|t| t.reverses == Some(tx.id)) {
        return Err(CoreError::conflict(format!(
            "transaction {} is reversed or is a reversal",
            tx.id
        )));
    }
    if schedule_linked_transactions(schedules).contains(&tx.id) {
        return Err(CoreError::conflict(format!(
            "transaction {} already settles another schedule",
            tx.id
        )));
    }

    Ok(Schedule {
        status: ScheduleStatus::Realized,
        transaction_id: Some(tx.id),
        ..schedule.clone()
    })
}

/// Undo a link: the schedule returns to `Planned`.
pub fn plan_unlink(schedule: &Schedule) -> CoreResult<Schedule> {
    if !schedule.is_linked() {
        return Err(CoreError::conflict(format!(
            "schedule {} is not linked to a transaction",
            schedule.id
        )));
    }
    Ok(Schedule {
        status: ScheduleStatus::Planned,
        transaction_id: None,
        ..schedule.clone()
    })
}

/// Resolve a `LinkCommand` against the tenant's current rows.
pub fn apply_link_command(
    cmd: &LinkCommand,
    schedules: &[Schedule],
    transactions: &[Transaction],
) -> CoreResult<Schedule> {
    let schedule = schedules
        .iter()
        .find(|s| s.id == cmd.schedule_id())
        .ok_or_else(|| CoreError::not_found("schedule", cmd.schedule_id()))?;

    match *cmd {
        LinkCommand::Link { transaction_id, .. } => {
            let tx = transactions
                .iter()
                .find(|t| t.id == transaction_id)
                .ok_or_else(|| CoreError::not_found("transaction", transaction_id))?;
            plan_link(schedule, tx, schedules, transactions)
        }
        LinkCommand::Unlink { .. } => plan_unlink(schedule),
    }
}

/// Build the reversal of `original`.
///
/// `ConflictState` when a reversal already exists, when `original` is itself
/// a reversal, or while `original` is linked (`linked`: ids referenced by a
/// schedule or a live debit note). Unlink first.
pub fn plan_reversal(
    original: &Transaction,
    transactions: &[Transaction],
    linked: &BTreeSet<TransactionId>,
    id: TransactionId,
    on: NaiveDate,
) -> CoreResult<Transaction> {
    if transactions.iter().any(|t| t.reverses == Some(original.id)) {
        return Err(CoreError::conflict(format!(
            "transaction {} is already reversed",
            original.id
        )));
    }
    if linked.contains(&original.id) {
        return Err(CoreError::conflict(format!(
            "transaction {} is linked; unlink it before reversing",
            original.id
        )));
    }
    original.reversal(id, on)
}
