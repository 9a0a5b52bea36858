use std::collections::BTreeSet;

use chrono::NaiveDate;
use cpk_money::Cents;
use cpk_reconcile::*;
use cpk_schemas::*;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
}

struct Tenant {
    ws: WorkspaceId,
}

impl Tenant {
    fn schedule(&self, dir: Direction, cents: i64, due: u32) -> Schedule {
        Schedule {
            id: ScheduleId::new_v4(),
            workspace_id: self.ws,
            contract_id: ContractId::new_v4(),
            entity_id: EntityId::new_v4(),
            account_id: None,
            direction: dir,
            amount: Cents::new(cents),
            due_date: d(due),
            status: ScheduleStatus::Planned,
            sequence: 1,
            transaction_id: None,
            description: "rent".into(),
        }
    }

    fn tx(&self, kind: TransactionKind, cents: i64, day: u32) -> Transaction {
        Transaction {
            id: TransactionId::new_v4(),
            workspace_id: self.ws,
            kind,
            amount: Cents::new(cents),
            currency: "BRL".into(),
            date: d(day),
            description: "bank".into(),
            account_id: None,
            entity_id: None,
            reverses: None,
            source: None,
        }
    }
}

#[test]
fn scenario_two_days_and_one_cent_match_three_days_or_two_cents_do_not() {
    let t = Tenant {
        ws: WorkspaceId::new_v4(),
    };
    let s = t.schedule(Direction::Receivable, 150_000, 10);
    let hit = t.tx(TransactionKind::Income, 150_001, 12);
    let late = t.tx(TransactionKind::Income, 150_000, 13);
    let off = t.tx(TransactionKind::Income, 150_002, 10);

    let out = schedule_candidates(
        &s,
        &[hit.clone(), late, off],
        &[s.clone()],
        &MatchTolerance::default(),
    )
    .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].transaction.id, hit.id);
}

#[test]
fn scenario_payable_matches_expense_only() {
    let t = Tenant {
        ws: WorkspaceId::new_v4(),
    };
    let s = t.schedule(Direction::Payable, 8_000, 5);
    let income = t.tx(TransactionKind::Income, 8_000, 5);
    let expense = t.tx(TransactionKind::Expense, 8_000, 5);
    let out = schedule_candidates(&s, &[income, expense.clone()], &[], &MatchTolerance::default())
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].transaction.id, expense.id);
}

#[test]
fn scenario_link_then_unlink_round_trips_status() {
    let t = Tenant {
        ws: WorkspaceId::new_v4(),
    };
    let s = t.schedule(Direction::Receivable, 5_000, 5);
    let tx = t.tx(TransactionKind::Income, 5_000, 6);
    let txs = vec![tx.clone()];

    let linked = apply_link_command(
        &LinkCommand::Link {
            schedule_id: s.id,
            transaction_id: tx.id,
        },
        &[s.clone()],
        &txs,
    )
    .unwrap();
    assert_eq!(linked.status, ScheduleStatus::Realized);
    assert_eq!(linked.transaction_id, Some(tx.id));

    // a second schedule cannot take the same transaction
    let other = t.schedule(Direction::Receivable, 5_000, 5);
    let err = plan_link(&other, &tx, &[linked.clone(), other.clone()], &txs).unwrap_err();
    assert_eq!(err.code(), "CONFLICT_STATE");

    // linked transactions are no longer offered
    let out = schedule_candidates(
        &other,
        &txs,
        &[linked.clone(), other.clone()],
        &MatchTolerance::default(),
    )
    .unwrap();
    assert!(out.is_empty());

    let unlinked = plan_unlink(&linked).unwrap();
    assert_eq!(unlinked.status, ScheduleStatus::Planned);
    assert_eq!(unlinked.transaction_id, None);
    assert_eq!(plan_unlink(&unlinked).unwrap_err().code(), "CONFLICT_STATE");
}

#[test]
fn scenario_cross_tenant_transaction_is_not_found() {
    let a = Tenant {
        ws: WorkspaceId::new_v4(),
    };
    let b = Tenant {
        ws: WorkspaceId::new_v4(),
    };
    let s = a.schedule(Direction::Receivable, 100, 1);
    let tx = b.tx(TransactionKind::Income, 100, 1);
    let err = plan_link(&s, &tx, &[s.clone()], &[tx.clone()]).unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[test]
fn scenario_double_reversal_is_conflict() {
    let t = Tenant {
        ws: WorkspaceId::new_v4(),
    };
    let original = t.tx(TransactionKind::Expense, 7_500, 3);
    let first = plan_reversal(
        &original,
        &[original.clone()],
        &BTreeSet::new(),
        TransactionId::new_v4(),
        d(4),
    )
    .unwrap();
    assert_eq!(first.amount, Cents::new(-7_500));

    let again = plan_reversal(
        &original,
        &[original.clone(), first.clone()],
        &BTreeSet::new(),
        TransactionId::new_v4(),
        d(5),
    )
    .unwrap_err();
    assert_eq!(again.code(), "CONFLICT_STATE");

    let reversal_of_reversal = plan_reversal(
        &first,
        &[original.clone(), first.clone()],
        &BTreeSet::new(),
        TransactionId::new_v4(),
        d(5),
    )
    .unwrap_err();
    assert_eq!(reversal_of_reversal.code(), "CONFLICT_STATE");
}

#[test]
fn scenario_linked_transaction_cannot_be_reversed() {
    let t = Tenant {
        ws: WorkspaceId::new_v4(),
    };
    let tx = t.tx(TransactionKind::Income, 2_000, 1);
    let err = plan_reversal(
        &tx,
        &[tx.clone()],
        &BTreeSet::from([tx.id]),
        TransactionId::new_v4(),
        d(2),
    )
    .unwrap_err();
    assert_eq!(err.code(), "CONFLICT_STATE");
}
