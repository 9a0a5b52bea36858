//! Contract saves racing other tenant writes.
//!
//! The rate provider below performs one store write while the engine is
//! still generating the new series, which is exactly the window between
//! generation and the locked write.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use cpk_billing::{BillingCommand, NewDebitNote};
use cpk_engine::{Engine, EngineSettings};
use cpk_reconcile::LinkCommand;
use cpk_schedule::{IndexRateError, IndexRateProvider};
use cpk_schemas::*;
use cpk_store::{ContractCommand, ScheduleFilter, Store};
use cpk_testkit::fixtures::{adjusted, date, income, monthly, organization};
use cpk_testkit::MemoryStore;
use tokio::sync::Mutex;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 20, 9, 0, 0).unwrap()
}

enum Interleave {
    Bill(BillingCommand),
    Link(LinkCommand),
    Cancel(ContractId),
}

/// Zero-percent index that lands one pending write on its next lookup.
struct WriteDuringLookup {
    store: Arc<MemoryStore>,
    pending: Mutex<Option<(WorkspaceId, Interleave)>>,
}

impl WriteDuringLookup {
    async fn arm(&self, ws: WorkspaceId, write: Interleave) {
        *self.pending.lock().await = Some((ws, write));
    }
}

#[async_trait]
impl IndexRateProvider for WriteDuringLookup {
    fn name(&self) -> &'static str {
        "interleaving"
    }

    async fn accumulated_percent(
        &self,
        _index: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<f64, IndexRateError> {
        let pending = self.pending.lock().await.take();
        if let Some((ws, write)) = pending {
            let landed = match write {
                Interleave::Bill(cmd) => self.store.apply_billing(ws, &cmd, now()).await.map(drop),
                Interleave::Link(cmd) => self.store.apply_link(ws, &cmd).await.map(drop),
                Interleave::Cancel(contract_id) => self
                    .store
                    .apply_contract(ws, &ContractCommand::Cancel { contract_id })
                    .await
                    .map(drop),
            };
            landed.map_err(|e| IndexRateError::Transport(e.to_string()))?;
        }
        Ok(0.0)
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    rates: Arc<WriteDuringLookup>,
    engine: Engine,
    ws: WorkspaceId,
    contract: Contract,
    rows: Vec<Schedule>,
}

/// Saved receivable, 1000.00 a month through 2024, re-priced every six
/// months so each save performs one index lookup.
async fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let rates = Arc::new(WriteDuringLookup {
        store: store.clone(),
        pending: Mutex::new(None),
    });
    let ws = store.add_workspace("acme").await;
    let org = organization(ws, "Acme Ltda");
    store.seed_entity(org.clone()).await.unwrap();
    let engine = Engine::new(store.clone(), rates.clone(), EngineSettings::default());

    let contract = adjusted(
        monthly(
            ws,
            org.id,
            Direction::Receivable,
            100_000,
            date(2024, 1, 10),
            Some(date(2024, 12, 10)),
        ),
        AdjustmentTerms {
            index: AdjustmentIndex::Named {
                index: "IPCA".into(),
            },
            every_months: 6,
        },
    );
    engine.save_contract(ws, &contract).await.unwrap();
    let rows = engine
        .schedules(ws, &ScheduleFilter::for_contract(contract.id))
        .await
        .unwrap();
    assert_eq!(rows.len(), 12);

    Harness {
        store,
        rates,
        engine,
        ws,
        contract,
        rows,
    }
}

#[tokio::test]
async fn scenario_note_paid_during_regeneration_keeps_its_schedule() {
    let h = harness().await;
    let paid = income(h.ws, 100_000, date(2024, 1, 10));
    h.engine.record_transaction(h.ws, &paid).await.unwrap();

    let note_id = DebitNoteId::new_v4();
    h.rates
        .arm(
            h.ws,
            Interleave::Bill(BillingCommand::Create(NewDebitNote {
                id: note_id,
                contract_id: h.contract.id,
                description: "january".into(),
                issued_on: date(2024, 1, 2),
                due_on: date(2024, 1, 10),
                schedule_ids: vec![h.rows[0].id],
                line_items: Vec::new(),
                reconcile_with: Some(paid.id),
            })),
        )
        .await;

    let edited = Contract {
        description: "retainer, renegotiated".into(),
        ..h.contract.clone()
    };
    let plan = h.engine.save_contract(h.ws, &edited).await.unwrap();
    assert!(!plan.delete.contains(&h.rows[0].id));
    assert_eq!(plan.delete.len(), 11);
    assert_eq!(plan.insert.len(), 11);

    let note = h.store.debit_note(h.ws, note_id).await.unwrap();
    assert_eq!(note.status, DebitNoteStatus::Paid);
    let rows = h
        .engine
        .schedules(h.ws, &ScheduleFilter::for_contract(h.contract.id))
        .await
        .unwrap();
    assert_eq!(rows.len(), 12);
    for id in &note.schedule_ids {
        assert!(rows.iter().any(|s| s.id == *id), "note lost schedule {id}");
    }
    assert_eq!(
        h.store.contract(h.ws, h.contract.id).await.unwrap().description,
        "retainer, renegotiated"
    );
}

#[tokio::test]
async fn scenario_link_made_during_regeneration_survives() {
    let h = harness().await;
    let feb = &h.rows[1];
    let paid = income(h.ws, 100_000, feb.due_date);
    h.engine.record_transaction(h.ws, &paid).await.unwrap();
    h.rates
        .arm(
            h.ws,
            Interleave::Link(LinkCommand::Link {
                schedule_id: feb.id,
                transaction_id: paid.id,
            }),
        )
        .await;

    let plan = h.engine.save_contract(h.ws, &h.contract).await.unwrap();
    assert!(!plan.delete.contains(&feb.id));

    let rows = h
        .engine
        .schedules(h.ws, &ScheduleFilter::for_contract(h.contract.id))
        .await
        .unwrap();
    assert_eq!(rows.len(), 12);
    let kept = rows.iter().find(|s| s.id == feb.id).unwrap();
    assert_eq!(kept.transaction_id, Some(paid.id));
    assert_eq!(kept.status, ScheduleStatus::Realized);
    assert_eq!(
        rows.iter().filter(|s| s.due_date == feb.due_date).count(),
        1
    );
}

#[tokio::test]
async fn scenario_cancel_during_regeneration_wins() {
    let h = harness().await;
    h.rates
        .arm(h.ws, Interleave::Cancel(h.contract.id))
        .await;

    let err = h
        .engine
        .save_contract(h.ws, &h.contract)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CONFLICT_STATE");

    let stored = h.store.contract(h.ws, h.contract.id).await.unwrap();
    assert_eq!(stored.status, ContractStatus::Cancelled);
    let rows = h
        .engine
        .schedules(h.ws, &ScheduleFilter::for_contract(h.contract.id))
        .await
        .unwrap();
    assert_eq!(rows.len(), 12);
    assert!(rows.iter().all(|s| s.status == ScheduleStatus::Cancelled));
}

#[tokio::test]
async fn scenario_total_contract_edit_keeps_sum_with_a_claimed_row() {
    let store = Arc::new(MemoryStore::new());
    let ws = store.add_workspace("acme").await;
    let org = organization(ws, "Acme Ltda");
    store.seed_entity(org.clone()).await.unwrap();
    let engine = Engine::new(
        store.clone(),
        Arc::new(cpk_testkit::StaticIndexRates::new()),
        EngineSettings::default(),
    );
    let mut contract = cpk_testkit::fixtures::total_split(
        ws,
        org.id,
        Direction::Receivable,
        90_000,
        date(2024, 1, 15),
        date(2024, 3, 15),
    );
    engine.save_contract(ws, &contract).await.unwrap();
    let rows = engine
        .schedules(ws, &ScheduleFilter::for_contract(contract.id))
        .await
        .unwrap();

    engine
        .billing(
            ws,
            &BillingCommand::Create(NewDebitNote {
                id: DebitNoteId::new_v4(),
                contract_id: contract.id,
                description: "first installment".into(),
                issued_on: date(2024, 1, 5),
                due_on: date(2024, 1, 15),
                schedule_ids: vec![rows[0].id],
                line_items: Vec::new(),
                reconcile_with: None,
            }),
            now(),
        )
        .await
        .unwrap();

    contract.amount = ContractAmount::Total(Cents::new(100_001));
    engine.save_contract(ws, &contract).await.unwrap();
    let rows = engine
        .schedules(ws, &ScheduleFilter::for_contract(contract.id))
        .await
        .unwrap();
    let amounts: Vec<i64> = rows.iter().map(|s| s.amount.raw()).collect();
    assert_eq!(amounts, vec![30_000, 35_001, 35_000]);
    assert_eq!(amounts.iter().sum::<i64>(), 100_001);

    // the claimed row alone already exceeds a shrunken total
    contract.amount = ContractAmount::Total(Cents::new(25_000));
    let err = engine.save_contract(ws, &contract).await.unwrap_err();
    assert_eq!(err.code(), "CONFLICT_STATE");
    let unchanged = store.contract(ws, contract.id).await.unwrap();
    assert_eq!(unchanged.amount, ContractAmount::Total(Cents::new(100_001)));
}
