use std::collections::BTreeSet;

use cpk_money::{sum_amounts, Cents};
use cpk_schemas::{
    ordered_line_items, ContractId, CoreError, CoreResult, DebitNote, Direction, LineItem, Schedule,
    ScheduleId,
};

/// Schedules locked by a paid note.
pub fn paid_claims(notes: &[DebitNote]) -> BTreeSet<ScheduleId> {
    notes
        .iter()
        .filter(|n| n.is_paid())
        .flat_map(|n| n.schedule_ids.iter().copied())
        .collect()
}

/// Schedules referenced by any draft or paid note. Regeneration and contract
/// cancellation leave these alone.
pub fn live_claims(notes: &[DebitNote]) -> BTreeSet<ScheduleId> {
    notes
        .iter()
        .filter(|n| !n.is_cancelled())
        .flat_map(|n| n.schedule_ids.iter().copied())
        .collect()
}

/// Schedules of `contract_id` that may go on a new note: planned,
/// receivable and not locked by a paid note. Ordered by due date.
pub fn available_schedules<'a>(
    contract_id: ContractId,
    schedules: &'a [Schedule],
    notes: &[DebitNote],
) -> Vec<&'a Schedule> {
    let locked = paid_claims(notes);
    let mut out: Vec<&Schedule> = schedules
        .iter()
        .filter(|s| s.contract_id == contract_id)
        .filter(|s| s.is_planned() && s.direction == Direction::Receivable)
        .filter(|s| !locked.contains(&s.id))
        .collect();
    out.sort_by_key(|s| (s.due_date, s.sequence, s.id));
    out
}

/// Schedule amounts + expenses - discounts.
pub fn note_total(schedules: &[&Schedule], line_items: &[LineItem]) -> CoreResult<Cents> {
    let items = ordered_line_items(line_items)?;
    let base = sum_amounts(schedules.iter().map(|s| s.amount))?;
    let adjustments = sum_amounts(items.iter().map(|i| i.signed_amount()))?;
    base.checked_add(adjustments).ok_or_else(|| {
        CoreError::invalid(format!(
            "note total out of range: {base} + {adjustments}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use cpk_schemas::{
        DebitNoteId, DebitNoteStatus, EntityId, LineItemKind, ScheduleStatus, WorkspaceId,
    };

    fn schedule(contract: ContractId, cents: i64, day: u32) -> Schedule {
        Schedule {
            id: ScheduleId::new_v4(),
            workspace_id: WorkspaceId::new_v4(),
            contract_id: contract,
            entity_id: EntityId::new_v4(),
            account_id: None,
            direction: Direction::Receivable,
            amount: Cents::new(cents),
            due_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            status: ScheduleStatus::Planned,
            sequence: day,
            transaction_id: None,
            description: "fee".into(),
        }
    }

    fn note(status: DebitNoteStatus, ids: Vec<ScheduleId>) -> DebitNote {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        DebitNote {
            id: DebitNoteId::new_v4(),
            workspace_id: WorkspaceId::new_v4(),
            contract_id: ContractId::new_v4(),
            description: "n".into(),
            issued_on: at.date_naive(),
            due_on: at.date_naive(),
            schedule_ids: ids,
            line_items: Vec::new(),
            total: Cents::ZERO,
            status,
            linked_transaction_id: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn only_paid_notes_lock_schedules() {
        let c = ContractId::new_v4();
        let rows = vec![schedule(c, 100, 3), schedule(c, 100, 1), schedule(c, 100, 2)];
        let notes = vec![
            note(DebitNoteStatus::Draft, vec![rows[0].id]),
            note(DebitNoteStatus::Paid, vec![rows[1].id]),
            note(DebitNoteStatus::Cancelled, vec![rows[2].id]),
        ];
        let available: Vec<_> = available_schedules(c, &rows, &notes)
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(available, vec![rows[2].id, rows[0].id]);
        assert_eq!(live_claims(&notes).len(), 2);
        assert_eq!(paid_claims(&notes).len(), 1);
    }

    #[test]
    fn other_contracts_and_payables_are_not_available() {
        let c = ContractId::new_v4();
        let mut payable = schedule(c, 100, 1);
        payable.direction = Direction::Payable;
        let foreign = schedule(ContractId::new_v4(), 100, 2);
        assert!(available_schedules(c, &[payable, foreign], &[]).is_empty());
    }

    #[test]
    fn total_applies_line_items_in_order() {
        let c = ContractId::new_v4();
        let a = schedule(c, 10_000, 1);
        let b = schedule(c, 5_001, 2);
        let items = vec![
            LineItem {
                kind: LineItemKind::Discount,
                description: "promo".into(),
                amount: Cents::new(1),
                item_order: 2,
            },
            LineItem {
                kind: LineItemKind::Expense,
                description: "postage".into(),
                amount: Cents::new(500),
                item_order: 1,
            },
        ];
        assert_eq!(note_total(&[&a, &b], &items).unwrap(), Cents::new(15_500));

        let dup = vec![items[0].clone(), items[0].clone()];
        assert_eq!(
            note_total(&[&a], &dup).unwrap_err().code(),
            "INVALID_ARGUMENT"
        );
    }

    #[test]
    fn total_beyond_cent_range_is_rejected() {
        let c = ContractId::new_v4();
        let a = schedule(c, i64::MAX, 1);
        let b = schedule(c, 1, 2);
        assert_eq!(
            note_total(&[&a, &b], &[]).unwrap_err().code(),
            "INVALID_ARGUMENT"
        );
    }
}
