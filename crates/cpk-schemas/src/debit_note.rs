use chrono::{DateTime, NaiveDate, Utc};
use cpk_money::Cents;
use serde::{Deserialize, Serialize};

use crate::contract::LineItem;
use crate::ids::{ContractId, DebitNoteId, ScheduleId, TransactionId, WorkspaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebitNoteStatus {
    Draft,
    Paid,
    Cancelled,
}

labelled_enum!(DebitNoteStatus {
    Draft => "draft",
    Paid => "paid",
    Cancelled => "cancelled",
});

/// Billing document over one or more schedules of a single contract.
///
/// `total` = sum of schedule amounts + expenses - discounts, in cents.
/// Only a `Paid` note locks its schedules against other notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitNote {
    pub id: DebitNoteId,
    pub workspace_id: WorkspaceId,
    pub contract_id: ContractId,
    pub description: String,
    pub issued_on: NaiveDate,
    pub due_on: NaiveDate,
    pub schedule_ids: Vec<ScheduleId>,
    pub line_items: Vec<LineItem>,
    pub total: Cents,
    pub status: DebitNoteStatus,
    pub linked_transaction_id: Option<TransactionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DebitNote {
    pub fn is_paid(&self) -> bool {
        self.status == DebitNoteStatus::Paid
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == DebitNoteStatus::Cancelled
    }

    pub fn claims(&self, schedule: ScheduleId) -> bool {
        self.schedule_ids.contains(&schedule)
    }
}
