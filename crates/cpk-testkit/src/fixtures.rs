//! Row builders with sensible defaults. Amounts are in cents.

use chrono::NaiveDate;
use cpk_money::Cents;
use cpk_schemas::{
    Account, AccountId, AccountKind, AdjustmentTerms, Contract, ContractAmount, ContractId,
    ContractStatus, Direction, Entity, EntityId, EntityKind, Recurrence, Transaction,
    TransactionId, TransactionKind, WorkspaceId,
};

/// Panics on an impossible date: fixtures are written by hand.
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("fixture date")
}

pub fn organization(ws: WorkspaceId, name: &str) -> Entity {
    Entity {
        id: EntityId::new_v4(),
        workspace_id: ws,
        kind: EntityKind::Organization,
        legal_name: name.to_string(),
        tax_document: None,
    }
}

pub fn checking(ws: WorkspaceId, entity: EntityId, opening_cents: i64, as_of: NaiveDate) -> Account {
    Account {
        id: AccountId::new_v4(),
        workspace_id: ws,
        entity_id: entity,
        name: "checking".to_string(),
        kind: AccountKind::Checking,
        currency: "BRL".to_string(),
        opening_balance: Cents::new(opening_cents),
        opening_balance_as_of: as_of,
    }
}

/// Active monthly contract worth `cents` per period.
pub fn monthly(
    ws: WorkspaceId,
    entity: EntityId,
    direction: Direction,
    cents: i64,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Contract {
    Contract {
        id: ContractId::new_v4(),
        workspace_id: ws,
        entity_id: entity,
        counterparty_id: None,
        account_id: None,
        description: "monthly contract".to_string(),
        direction,
        amount: ContractAmount::PerPeriod(Cents::new(cents)),
        currency: "BRL".to_string(),
        recurrence: Recurrence::Monthly,
        start_date: start,
        end_date: end,
        adjustment: None,
        status: ContractStatus::Active,
        line_items: Vec::new(),
    }
}

/// Active contract whose `total_cents` is split over its monthly periods.
pub fn total_split(
    ws: WorkspaceId,
    entity: EntityId,
    direction: Direction,
    total_cents: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Contract {
    Contract {
        amount: ContractAmount::Total(Cents::new(total_cents)),
        description: "split contract".to_string(),
        ..monthly(ws, entity, direction, total_cents, start, Some(end))
    }
}

pub fn adjusted(contract: Contract, terms: AdjustmentTerms) -> Contract {
    Contract {
        adjustment: Some(terms),
        ..contract
    }
}

pub fn transaction(ws: WorkspaceId, kind: TransactionKind, cents: i64, on: NaiveDate) -> Transaction {
    Transaction {
        id: TransactionId::new_v4(),
        workspace_id: ws,
        kind,
        amount: Cents::new(cents),
        currency: "BRL".to_string(),
        date: on,
        description: format!("{kind} {on}"),
        account_id: None,
        entity_id: None,
        reverses: None,
        source: Some("fixture".to_string()),
    }
}

pub fn income(ws: WorkspaceId, cents: i64, on: NaiveDate) -> Transaction {
    transaction(ws, TransactionKind::Income, cents, on)
}

pub fn expense(ws: WorkspaceId, cents: i64, on: NaiveDate) -> Transaction {
    transaction(ws, TransactionKind::Expense, cents, on)
}
