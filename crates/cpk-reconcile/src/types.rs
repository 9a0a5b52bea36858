use chrono::NaiveDate;
use cpk_money::{Cents, DEFAULT_TOLERANCE_CENTS};
use cpk_schemas::{ScheduleId, Transaction, TransactionId, TransactionKind};
use serde::{Deserialize, Serialize};

/// How far a transaction may be from its target and still match.
/// Both bounds are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTolerance {
    pub amount_cents: i64,
    pub days: i64,
}

impl Default for MatchTolerance {
    fn default() -> Self {
        Self {
            amount_cents: DEFAULT_TOLERANCE_CENTS,
            days: 2,
        }
    }
}

/// What a matching transaction should look like.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTarget {
    pub amount: Cents,
    pub date: NaiveDate,
    pub kind: TransactionKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub transaction: Transaction,
    /// |tx.date - target.date| in days.
    pub date_distance_days: i64,
    /// |tx.amount - target.amount|.
    pub amount_distance: Cents,
}

/// Explicit, user-confirmed schedule link change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LinkCommand {
    Link {
        schedule_id: ScheduleId,
        transaction_id: TransactionId,
    },
    Unlink {
        schedule_id: ScheduleId,
    },
}

impl LinkCommand {
    pub fn schedule_id(&self) -> ScheduleId {
        match *self {
            LinkCommand::Link { schedule_id, .. } | LinkCommand::Unlink { schedule_id } => {
                schedule_id
            }
        }
    }
}
