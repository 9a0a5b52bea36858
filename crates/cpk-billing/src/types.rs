use chrono::NaiveDate;
use cpk_schemas::{
    ContractId, DebitNote, DebitNoteId, LineItem, Schedule, ScheduleId, Transaction,
    TransactionId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDebitNote {
    pub id: DebitNoteId,
    pub contract_id: ContractId,
    pub description: String,
    pub issued_on: NaiveDate,
    pub due_on: NaiveDate,
    pub schedule_ids: Vec<ScheduleId>,
    pub line_items: Vec<LineItem>,
    /// Reconcile against this income transaction right away.
    pub reconcile_with: Option<TransactionId>,
}

/// Fields left `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteUpdate {
    pub description: Option<String>,
    pub issued_on: Option<NaiveDate>,
    pub due_on: Option<NaiveDate>,
    pub line_items: Option<Vec<LineItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BillingCommand {
    Create(NewDebitNote),
    Update {
        id: DebitNoteId,
        changes: NoteUpdate,
    },
    Reconcile {
        id: DebitNoteId,
        transaction_id: TransactionId,
    },
    Cancel {
        id: DebitNoteId,
    },
    Delete {
        id: DebitNoteId,
    },
}

impl BillingCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BillingCommand::Create(_) => "create",
            BillingCommand::Update { .. } => "update",
            BillingCommand::Reconcile { .. } => "reconcile",
            BillingCommand::Cancel { .. } => "cancel",
            BillingCommand::Delete { .. } => "delete",
        }
    }
}

/// The tenant rows a billing command is checked against, read inside the
/// same locked transaction the effect is written in.
#[derive(Debug, Clone, Copy)]
pub struct BillingSnapshot<'a> {
    pub schedules: &'a [Schedule],
    pub notes: &'a [DebitNote],
    pub transactions: &'a [Transaction],
}

/// Rows to write. Schedule locks follow from the note rows alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingEffect {
    pub upsert: Option<DebitNote>,
    pub delete: Option<DebitNoteId>,
}
