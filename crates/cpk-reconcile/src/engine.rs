use std::collections::BTreeSet;

use cpk_money::amounts_match;
use cpk_schemas::{
    CoreError, CoreResult, DebitNote, Schedule, Transaction, TransactionId, TransactionKind,
};

use crate::types::{MatchCandidate, MatchTarget, MatchTolerance};

/// Kind, amount (± `amount_cents`) and date (± `days`) all agree.
pub fn is_match(tx: &Transaction, target: &MatchTarget, tol: &MatchTolerance) -> bool {
    tx.kind == target.kind
        && amounts_match(tx.amount, target.amount, tol.amount_cents)
        && (tx.date - target.date).num_days().abs() <= tol.days
}

/// Transactions that are reversals, or that have been reversed, never match.
fn reversed_or_reversal(transactions: &[Transaction]) -> BTreeSet<TransactionId> {
    let mut out = BTreeSet::new();
    for t in transactions {
        if let Some(original) = t.reverses {
            out.insert(original);
            out.insert(t.id);
        }
    }
    out
}

/// Every matching transaction not in `excluded`, closest first.
///
/// Order: date distance, amount distance, date, id. No selection is made;
/// the caller confirms a link explicitly.
pub fn find_candidates(
    target: &MatchTarget,
    transactions: &[Transaction],
    excluded: &BTreeSet<TransactionId>,
    tol: &MatchTolerance,
) -> Vec<MatchCandidate> {
    let dead = reversed_or_reversal(transactions);
    let mut out: Vec<MatchCandidate> = transactions
        .iter()
        .filter(|t| !excluded.contains(&t.id) && !dead.contains(&t.id))
        .filter(|t| is_match(t, target, tol))
        .map(|t| MatchCandidate {
            transaction: t.clone(),
            date_distance_days: (t.date - target.date).num_days().abs(),
            amount_distance: (t.amount - target.amount).abs(),
        })
        .collect();

    out.sort_by(|a, b| {
        (a.date_distance_days, a.amount_distance, a.transaction.date, a.transaction.id).cmp(&(
            b.date_distance_days,
            b.amount_distance,
            b.transaction.date,
            b.transaction.id,
        ))
    });
    out
}

/// Transactions referenced by any non-cancelled debit note.
pub fn note_linked_transactions(notes: &[DebitNote]) -> BTreeSet<TransactionId> {
    notes
        .iter()
        .filter(|n| !n.is_cancelled())
        .filter_map(|n| n.linked_transaction_id)
        .collect()
}

/// Transactions already settling a schedule.
pub fn schedule_linked_transactions(schedules: &[Schedule]) -> BTreeSet<TransactionId> {
    schedules.iter().filter_map(|s| s.transaction_id).collect()
}

/// Income transactions that could settle `note`, matched on its total and
/// due date.
pub fn debit_note_candidates(
    note: &DebitNote,
    transactions: &[Transaction],
    notes: &[DebitNote],
    tol: &MatchTolerance,
) -> Vec<MatchCandidate> {
    let target = MatchTarget {
        amount: note.total,
        date: note.due_on,
        kind: TransactionKind::Income,
    };
    let excluded = note_linked_transactions(notes);
    let tenant_txs: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.workspace_id == note.workspace_id)
        .cloned()
        .collect();
    find_candidates(&target, &tenant_txs, &excluded, tol)
}

/// Transactions that could settle an unmatched schedule: receivables match
/// income, payables match expenses.
pub fn schedule_candidates(
    schedule: &Schedule,
    transactions: &[Transaction],
    schedules: &[Schedule],
    tol: &MatchTolerance,
) -> CoreResult<Vec<MatchCandidate>> {
    if !schedule.is_planned() || schedule.is_linked() {
        return Err(CoreError::conflict(format!(
            "schedule {} is {} and already settled",
            schedule.id, schedule.status
        )));
    }
    let target = MatchTarget {
        amount: schedule.amount,
        date: schedule.due_date,
        kind: schedule.direction.settling_kind(),
    };
    let excluded = schedule_linked_transactions(schedules);
    let tenant_txs: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.workspace_id == schedule.workspace_id)
        .cloned()
        .collect();
    Ok(find_candidates(&target, &tenant_txs, &excluded, tol))
}
