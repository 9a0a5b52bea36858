//! Row decoding and driver error mapping.

use std::fmt::Display;
use std::str::FromStr;

use cpk_money::Cents;
use cpk_schemas::{
    Account, AccountId, AdjustmentTerms, Alert, AlertId, Contract, ContractAmount, ContractId,
    CoreError, CoreResult, DebitNote, DebitNoteId, DrillDown, Entity, EntityId, LineItem,
    Schedule, ScheduleId, Transaction, TransactionId, Workspace, WorkspaceId,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

pub(crate) const SCHEDULE_COLUMNS: &str = "id, workspace_id, contract_id, entity_id, account_id, \
     direction, amount_cents, due_date, status, sequence, transaction_id, description";

pub(crate) const TRANSACTION_COLUMNS: &str = "id, workspace_id, kind, amount_cents, currency, \
     date, description, account_id, entity_id, reverses, source";

pub(crate) const CONTRACT_COLUMNS: &str = "id, workspace_id, entity_id, counterparty_id, \
     account_id, description, direction, amount_kind, amount_cents, currency, recurrence, \
     start_date, end_date, adjustment, status";

pub(crate) const NOTE_COLUMNS: &str = "id, workspace_id, contract_id, description, issued_on, \
     due_on, line_items, total_cents, status, linked_transaction_id, created_at, updated_at";

pub(crate) const ALERT_COLUMNS: &str = "id, workspace_id, rule_id, target_key, severity, state, \
     title, message, drill_down, first_seen, last_seen, resolved_at";

/// Map a driver error. Unique violations become `ConflictState`, foreign-key
/// violations `NotFound`, everything else `UpstreamUnavailable`.
pub(crate) fn db_err(op: &'static str) -> impl FnOnce(sqlx::Error) -> CoreError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            let constraint = db.constraint().unwrap_or("-").to_string();
            match db.code().as_deref() {
                Some("23505") => {
                    return CoreError::conflict(format!("{op}: duplicate row ({constraint})"))
                }
                Some("23503") => {
                    return CoreError::NotFound(format!(
                        "{op}: referenced row is missing ({constraint})"
                    ))
                }
                _ => {}
            }
        }
        CoreError::upstream(format!("{op} failed: {e}"))
    }
}

pub(crate) fn label<T>(row: &PgRow, col: &str) -> CoreResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.try_get(col).map_err(db_err("decode"))?;
    raw.parse()
        .map_err(|e| CoreError::InternalConsistency(format!("column {col}: {e}")))
}

fn get<'r, T>(row: &'r PgRow, col: &str) -> CoreResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(col).map_err(db_err("decode"))
}

fn cents(row: &PgRow, col: &str) -> CoreResult<Cents> {
    get::<i64>(row, col).map(Cents::new)
}

fn opt_uuid(row: &PgRow, col: &str) -> CoreResult<Option<Uuid>> {
    get::<Option<Uuid>>(row, col)
}

pub(crate) fn workspace(row: &PgRow) -> CoreResult<Workspace> {
    Ok(Workspace {
        id: WorkspaceId(get(row, "id")?),
        name: get(row, "name")?,
    })
}

pub(crate) fn entity(row: &PgRow) -> CoreResult<Entity> {
    Ok(Entity {
        id: EntityId(get(row, "id")?),
        workspace_id: WorkspaceId(get(row, "workspace_id")?),
        kind: label(row, "kind")?,
        legal_name: get(row, "legal_name")?,
        tax_document: get(row, "tax_document")?,
    })
}

pub(crate) fn account(row: &PgRow) -> CoreResult<Account> {
    Ok(Account {
        id: AccountId(get(row, "id")?),
        workspace_id: WorkspaceId(get(row, "workspace_id")?),
        entity_id: EntityId(get(row, "entity_id")?),
        name: get(row, "name")?,
        kind: label(row, "kind")?,
        currency: get(row, "currency")?,
        opening_balance: cents(row, "opening_balance_cents")?,
        opening_balance_as_of: get(row, "opening_balance_as_of")?,
    })
}

/// Contract without its line items; the caller attaches them.
pub(crate) fn contract(row: &PgRow) -> CoreResult<Contract> {
    let amount = cents(row, "amount_cents")?;
    let amount_kind: String = get(row, "amount_kind")?;
    let amount = match amount_kind.as_str() {
        "total" => ContractAmount::Total(amount),
        "per_period" => ContractAmount::PerPeriod(amount),
        other => {
            return Err(CoreError::InternalConsistency(format!(
                "column amount_kind: unknown '{other}'"
            )))
        }
    };
    let adjustment: Option<Json<AdjustmentTerms>> = get(row, "adjustment")?;
    Ok(Contract {
        id: ContractId(get(row, "id")?),
        workspace_id: WorkspaceId(get(row, "workspace_id")?),
        entity_id: EntityId(get(row, "entity_id")?),
        counterparty_id: opt_uuid(row, "counterparty_id")?.map(EntityId),
        account_id: opt_uuid(row, "account_id")?.map(AccountId),
        description: get(row, "description")?,
        direction: label(row, "direction")?,
        amount,
        currency: get(row, "currency")?,
        recurrence: label(row, "recurrence")?,
        start_date: get(row, "start_date")?,
        end_date: get(row, "end_date")?,
        adjustment: adjustment.map(|Json(terms)| terms),
        status: label(row, "status")?,
        line_items: Vec::new(),
    })
}

pub(crate) fn contract_line_item(row: &PgRow) -> CoreResult<(ContractId, LineItem)> {
    Ok((
        ContractId(get(row, "contract_id")?),
        LineItem {
            kind: label(row, "kind")?,
            description: get(row, "description")?,
            amount: cents(row, "amount_cents")?,
            item_order: get(row, "item_order")?,
        },
    ))
}

pub(crate) fn schedule(row: &PgRow) -> CoreResult<Schedule> {
    let sequence: i32 = get(row, "sequence")?;
    let sequence = u32::try_from(sequence).map_err(|_| {
        CoreError::InternalConsistency(format!("column sequence: negative value {sequence}"))
    })?;
    Ok(Schedule {
        id: ScheduleId(get(row, "id")?),
        workspace_id: WorkspaceId(get(row, "workspace_id")?),
        contract_id: ContractId(get(row, "contract_id")?),
        entity_id: EntityId(get(row, "entity_id")?),
        account_id: opt_uuid(row, "account_id")?.map(AccountId),
        direction: label(row, "direction")?,
        amount: cents(row, "amount_cents")?,
        due_date: get(row, "due_date")?,
        status: label(row, "status")?,
        sequence,
        transaction_id: opt_uuid(row, "transaction_id")?.map(TransactionId),
        description: get(row, "description")?,
    })
}

pub(crate) fn transaction(row: &PgRow) -> CoreResult<Transaction> {
    Ok(Transaction {
        id: TransactionId(get(row, "id")?),
        workspace_id: WorkspaceId(get(row, "workspace_id")?),
        kind: label(row, "kind")?,
        amount: cents(row, "amount_cents")?,
        currency: get(row, "currency")?,
        date: get(row, "date")?,
        description: get(row, "description")?,
        account_id: opt_uuid(row, "account_id")?.map(AccountId),
        entity_id: opt_uuid(row, "entity_id")?.map(EntityId),
        reverses: opt_uuid(row, "reverses")?.map(TransactionId),
        source: get(row, "source")?,
    })
}

/// Debit note without its schedule ids; the caller attaches them.
pub(crate) fn debit_note(row: &PgRow) -> CoreResult<DebitNote> {
    let Json(line_items): Json<Vec<LineItem>> = get(row, "line_items")?;
    Ok(DebitNote {
        id: DebitNoteId(get(row, "id")?),
        workspace_id: WorkspaceId(get(row, "workspace_id")?),
        contract_id: ContractId(get(row, "contract_id")?),
        description: get(row, "description")?,
        issued_on: get(row, "issued_on")?,
        due_on: get(row, "due_on")?,
        schedule_ids: Vec::new(),
        line_items,
        total: cents(row, "total_cents")?,
        status: label(row, "status")?,
        linked_transaction_id: opt_uuid(row, "linked_transaction_id")?.map(TransactionId),
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

pub(crate) fn alert(row: &PgRow) -> CoreResult<Alert> {
    let Json(drill_down): Json<DrillDown> = get(row, "drill_down")?;
    Ok(Alert {
        id: AlertId(get(row, "id")?),
        workspace_id: WorkspaceId(get(row, "workspace_id")?),
        rule_id: get(row, "rule_id")?,
        target_key: get(row, "target_key")?,
        severity: label(row, "severity")?,
        state: label(row, "state")?,
        title: get(row, "title")?,
        message: get(row, "message")?,
        drill_down,
        first_seen: get(row, "first_seen")?,
        last_seen: get(row, "last_seen")?,
        resolved_at: get(row, "resolved_at")?,
    })
}
