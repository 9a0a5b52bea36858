use chrono::NaiveDate;
use cpk_money::Cents;
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, ContractId, EntityId, ScheduleId, TransactionId, WorkspaceId};
use crate::transaction::TransactionKind;

/// Cash direction of a planned movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Receivable,
    Payable,
}

labelled_enum!(Direction {
    Receivable => "receivable",
    Payable => "payable",
});

impl Direction {
    /// The realised transaction kind that settles this direction.
    pub fn settling_kind(self) -> TransactionKind {
        match self {
            Direction::Receivable => TransactionKind::Income,
            Direction::Payable => TransactionKind::Expense,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Planned,
    Realized,
    Cancelled,
}

labelled_enum!(ScheduleStatus {
    Planned => "planned",
    Realized => "realized",
    Cancelled => "cancelled",
});

/// One dated, directional planned cash movement derived from a contract.
///
/// Debit-note claims are not stored here: they are derived from the notes'
/// schedule references every time they are needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub workspace_id: WorkspaceId,
    pub contract_id: ContractId,
    pub entity_id: EntityId,
    pub account_id: Option<AccountId>,
    pub direction: Direction,
    pub amount: Cents,
    pub due_date: NaiveDate,
    pub status: ScheduleStatus,
    /// 1-based position within the contract's generated series.
    pub sequence: u32,
    pub transaction_id: Option<TransactionId>,
    pub description: String,
}

impl Schedule {
    pub fn is_planned(&self) -> bool {
        self.status == ScheduleStatus::Planned
    }

    pub fn is_linked(&self) -> bool {
        self.transaction_id.is_some()
    }

    /// Signed contribution: receivable positive, payable negative.
    pub fn signed_amount(&self) -> Cents {
        match self.direction {
            Direction::Receivable => self.amount,
            Direction::Payable => -self.amount,
        }
    }
}
