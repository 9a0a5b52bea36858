use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use cpk_reconcile::note_linked_transactions;
use cpk_schemas::{
    CoreError, CoreResult, DebitNote, DebitNoteId, DebitNoteStatus, Direction, LineItem,
    Schedule, TransactionId, TransactionKind, WorkspaceId,
};

use crate::eligibility::{note_total, paid_claims};
use crate::types::{BillingCommand, BillingEffect, BillingSnapshot, NewDebitNote, NoteUpdate};

/// Check `cmd` against the snapshot and compute the rows to write.
///
/// `ws` is the tenant the command runs for; rows of other tenants are
/// treated as absent.
pub fn plan_billing(
    cmd: &BillingCommand,
    snap: &BillingSnapshot<'_>,
    ws: WorkspaceId,
    now: DateTime<Utc>,
) -> CoreResult<BillingEffect> {
    match cmd {
        BillingCommand::Create(new) => {
            let mut note = plan_create(new, snap, ws, now)?;
            if let Some(tx_id) = new.reconcile_with {
                note = plan_reconcile(note, tx_id, snap, ws, now)?;
            }
            Ok(BillingEffect {
                upsert: Some(note),
                delete: None,
            })
        }
        BillingCommand::Update { id, changes } => {
            let note = find_note(snap, ws, *id)?;
            Ok(BillingEffect {
                upsert: Some(plan_update(note, changes, snap, now)?),
                delete: None,
            })
        }
        BillingCommand::Reconcile { id, transaction_id } => {
            let note = find_note(snap, ws, *id)?.clone();
            Ok(BillingEffect {
                upsert: Some(plan_reconcile(note, *transaction_id, snap, ws, now)?),
                delete: None,
            })
        }
        BillingCommand::Cancel { id } => {
            let note = find_note(snap, ws, *id)?;
            if note.is_cancelled() {
                return Err(CoreError::conflict(format!(
                    "debit note {id} is already cancelled"
                )));
            }
            Ok(BillingEffect {
                upsert: Some(DebitNote {
                    status: DebitNoteStatus::Cancelled,
                    updated_at: now,
                    ..note.clone()
                }),
                delete: None,
            })
        }
        BillingCommand::Delete { id } => {
            let note = find_note(snap, ws, *id)?;
            Ok(BillingEffect {
                upsert: None,
                delete: Some(note.id),
            })
        }
    }
}

fn find_note<'a>(
    snap: &BillingSnapshot<'a>,
    ws: WorkspaceId,
    id: DebitNoteId,
) -> CoreResult<&'a DebitNote> {
    snap.notes
        .iter()
        .find(|n| n.id == id && n.workspace_id == ws)
        .ok_or_else(|| CoreError::not_found("debit note", id))
}

fn check_dates(issued_on: NaiveDate, due_on: NaiveDate) -> CoreResult<()> {
    if due_on < issued_on {
        return Err(CoreError::invalid(format!(
            "due date {due_on} precedes issue date {issued_on}"
        )));
    }
    Ok(())
}

/// The note's schedules, resolved within the tenant.
fn note_schedules<'a>(note: &DebitNote, snap: &BillingSnapshot<'a>) -> CoreResult<Vec<&'a Schedule>> {
    note.schedule_ids
        .iter()
        .map(|id| {
            snap.schedules
                .iter()
                .find(|s| s.id == *id && s.workspace_id == note.workspace_id)
                .ok_or_else(|| CoreError::not_found("schedule", id))
        })
        .collect()
}

fn total_for(
    schedules: &[&Schedule],
    line_items: &[LineItem],
) -> CoreResult<cpk_money::Cents> {
    let total = note_total(schedules, line_items)?;
    if total.is_negative() {
        return Err(CoreError::invalid(format!(
            "debit note total would be negative ({total})"
        )));
    }
    Ok(total)
}

fn plan_create(
    new: &NewDebitNote,
    snap: &BillingSnapshot<'_>,
    ws: WorkspaceId,
    now: DateTime<Utc>,
) -> CoreResult<DebitNote> {
    if new.schedule_ids.is_empty() {
        return Err(CoreError::invalid("a debit note needs at least one schedule"));
    }
    let unique: BTreeSet<_> = new.schedule_ids.iter().collect();
    if unique.len() != new.schedule_ids.len() {
        return Err(CoreError::invalid("debit note lists a schedule twice"));
    }
    if snap.notes.iter().any(|n| n.id == new.id) {
        return Err(CoreError::conflict(format!("debit note {} already exists", new.id)));
    }
    check_dates(new.issued_on, new.due_on)?;

    let locked = paid_claims(snap.notes);
    let mut chosen = Vec::with_capacity(new.schedule_ids.len());
    for id in &new.schedule_ids {
        let s = snap
            .schedules
            .iter()
            .find(|s| s.id == *id && s.workspace_id == ws)
            .ok_or_else(|| CoreError::not_found("schedule", id))?;
        if s.contract_id != new.contract_id {
            return Err(CoreError::invalid(format!(
                "schedule {id} belongs to contract {}, not {}",
                s.contract_id, new.contract_id
            )));
        }
        if s.direction != Direction::Receivable {
            return Err(CoreError::invalid(format!(
                "schedule {id} is payable and cannot be billed"
            )));
        }
        if !s.is_planned() {
            return Err(CoreError::conflict(format!(
                "schedule {id} is {} and cannot be billed",
                s.status
            )));
        }
        if locked.contains(id) {
            return Err(CoreError::conflict(format!(
                "schedule {id} is already billed by a paid debit note"
            )));
        }
        chosen.push(s);
    }

    Ok(DebitNote {
        id: new.id,
        workspace_id: ws,
        contract_id: new.contract_id,
        description: new.description.clone(),
        issued_on: new.issued_on,
        due_on: new.due_on,
        schedule_ids: new.schedule_ids.clone(),
        line_items: new.line_items.clone(),
        total: total_for(&chosen, &new.line_items)?,
        status: DebitNoteStatus::Draft,
        linked_transaction_id: None,
        created_at: now,
        updated_at: now,
    })
}

fn plan_update(
    note: &DebitNote,
    changes: &NoteUpdate,
    snap: &BillingSnapshot<'_>,
    now: DateTime<Utc>,
) -> CoreResult<DebitNote> {
    if note.is_paid() {
        return Err(CoreError::conflict(format!(
            "debit note {} is paid and cannot be edited",
            note.id
        )));
    }
    let mut next = note.clone();
    if let Some(d) = &changes.description {
        next.description = d.clone();
    }
    if let Some(d) = changes.issued_on {
        next.issued_on = d;
    }
    if let Some(d) = changes.due_on {
        next.due_on = d;
    }
    if let Some(items) = &changes.line_items {
        next.line_items = items.clone();
    }
    check_dates(next.issued_on, next.due_on)?;
    next.total = total_for(&note_schedules(&next, snap)?, &next.line_items)?;
    next.updated_at = now;
    Ok(next)
}

fn plan_reconcile(
    mut note: DebitNote,
    tx_id: TransactionId,
    snap: &BillingSnapshot<'_>,
    ws: WorkspaceId,
    now: DateTime<Utc>,
) -> CoreResult<DebitNote> {
    if note.status != DebitNoteStatus::Draft {
        return Err(CoreError::conflict(format!(
            "debit note {} is {} and cannot be reconciled",
            note.id, note.status
        )));
    }

    let tx = snap
        .transactions
        .iter()
        .find(|t| t.id == tx_id && t.workspace_id == ws)
        .ok_or_else(|| CoreError::not_found("transaction", tx_id))?;
    if tx.kind != TransactionKind::Income {
        return Err(CoreError::invalid(format!(
            "transaction {tx_id} is {}, debit notes settle against income",
            tx.kind
        )));
    }
    if tx.is_reversal() || snap.transactions.iter().any(|t| t.reverses == Some(tx_id)) {
        return Err(CoreError::conflict(format!(
            "transaction {tx_id} is reversed or is a reversal"
        )));
    }

    let others: Vec<DebitNote> = snap
        .notes
        .iter()
        .filter(|n| n.id != note.id)
        .cloned()
        .collect();
    if note_linked_transactions(&others).contains(&tx_id) {
        return Err(CoreError::conflict(format!(
            "transaction {tx_id} already settles another debit note"
        )));
    }
    let locked = paid_claims(&others);
    if let Some(id) = note.schedule_ids.iter().find(|id| locked.contains(id)) {
        return Err(CoreError::conflict(format!(
            "schedule {id} was billed by another paid debit note"
        )));
    }

    note.status = DebitNoteStatus::Paid;
    note.linked_transaction_id = Some(tx_id);
    note.updated_at = now;
    Ok(note)
}
