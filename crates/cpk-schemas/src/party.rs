use chrono::NaiveDate;
use cpk_money::Cents;
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, EntityId, WorkspaceId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Individual,
    Organization,
}

labelled_enum!(EntityKind {
    Individual => "individual",
    Organization => "organization",
});

/// A party owning accounts; also the counterparty of contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub workspace_id: WorkspaceId,
    pub kind: EntityKind,
    pub legal_name: String,
    pub tax_document: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Checking,
    Investment,
    Other,
}

labelled_enum!(AccountKind {
    Checking => "checking",
    Investment => "investment",
    Other => "other",
});

impl AccountKind {
    /// Only checking and investment accounts contribute to the starting balance.
    pub fn counts_toward_starting_balance(self) -> bool {
        matches!(self, AccountKind::Checking | AccountKind::Investment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub workspace_id: WorkspaceId,
    pub entity_id: EntityId,
    pub name: String,
    pub kind: AccountKind,
    pub currency: String,
    pub opening_balance: Cents,
    pub opening_balance_as_of: NaiveDate,
}
