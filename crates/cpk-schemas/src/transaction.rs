use chrono::NaiveDate;
use cpk_money::Cents;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::{AccountId, EntityId, TransactionId, WorkspaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

labelled_enum!(TransactionKind {
    Income => "income",
    Expense => "expense",
    Transfer => "transfer",
});

/// A realised ledger movement.
///
/// `amount` is positive for an ordinary movement of its kind. Transactions are
/// immutable: a correction is a new transaction with the opposite sign whose
/// `reverses` points at the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub workspace_id: WorkspaceId,
    pub kind: TransactionKind,
    pub amount: Cents,
    pub currency: String,
    pub date: NaiveDate,
    pub description: String,
    pub account_id: Option<AccountId>,
    pub entity_id: Option<EntityId>,
    pub reverses: Option<TransactionId>,
    /// Free-form label of the ingestion collaborator ("bank-feed", "csv", ...).
    pub source: Option<String>,
}

impl Transaction {
    pub fn is_reversal(&self) -> bool {
        self.reverses.is_some()
    }

    /// Build the opposite-sign transaction that cancels this one.
    ///
    /// A reversal cannot itself be reversed. Callers holding the tenant's
    /// transaction list also check that no reversal exists yet.
    pub fn reversal(&self, id: TransactionId, on: NaiveDate) -> CoreResult<Transaction> {
        if self.is_reversal() {
            return Err(CoreError::conflict(format!(
                "transaction {} is a reversal and cannot be reversed",
                self.id
            )));
        }
        Ok(Transaction {
            id,
            workspace_id: self.workspace_id,
            kind: self.kind,
            amount: -self.amount,
            currency: self.currency.clone(),
            date: on,
            description: format!("reversal of {}", self.description),
            account_id: self.account_id,
            entity_id: self.entity_id,
            reverses: Some(self.id),
            source: self.source.clone(),
        })
    }
}
