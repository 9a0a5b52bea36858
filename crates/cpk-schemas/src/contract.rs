use chrono::NaiveDate;
use cpk_calendar::Recurrence;
use cpk_money::Cents;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::{AccountId, ContractId, EntityId, WorkspaceId};
use crate::schedule::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

labelled_enum!(ContractStatus {
    Planned => "planned",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl ContractStatus {
    /// Completed and cancelled contracts produce no new schedules.
    pub fn is_closed(self) -> bool {
        matches!(self, ContractStatus::Completed | ContractStatus::Cancelled)
    }
}

/// How the contract value is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "cents", rename_all = "snake_case")]
pub enum ContractAmount {
    /// Whole-contract value, split exactly across the generated periods.
    Total(Cents),
    /// Value due on every period.
    PerPeriod(Cents),
}

impl ContractAmount {
    pub fn cents(&self) -> Cents {
        match *self {
            ContractAmount::Total(c) | ContractAmount::PerPeriod(c) => c,
        }
    }
}

/// Source of the re-pricing percentage applied at each boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdjustmentIndex {
    /// Same percentage at every boundary.
    Fixed { percent: f64 },
    /// Accumulated rate of a named index (e.g. "IPCA", "IGPM") over the
    /// window preceding each boundary, looked up from the index-rate provider.
    Named { index: String },
}

/// Periodic re-pricing: every `every_months` from the start date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentTerms {
    pub index: AdjustmentIndex,
    pub every_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Expense,
    Discount,
}

labelled_enum!(LineItemKind {
    Expense => "expense",
    Discount => "discount",
});

/// An expense (added) or discount (subtracted), applied in `item_order`.
///
/// Same shape on contracts and debit notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub kind: LineItemKind,
    pub description: String,
    pub amount: Cents,
    pub item_order: i32,
}

impl LineItem {
    pub fn signed_amount(&self) -> Cents {
        match self.kind {
            LineItemKind::Expense => self.amount,
            LineItemKind::Discount => -self.amount,
        }
    }
}

pub type ContractLineItem = LineItem;

/// Line items in ascending `item_order`.
///
/// Duplicate orders and negative amounts are `InvalidArgument`; the kind
/// carries the sign.
pub fn ordered_line_items(items: &[LineItem]) -> CoreResult<Vec<&LineItem>> {
    let mut ordered: Vec<&LineItem> = items.iter().collect();
    ordered.sort_by_key(|item| item.item_order);
    for pair in ordered.windows(2) {
        if pair[0].item_order == pair[1].item_order {
            return Err(CoreError::invalid(format!(
                "duplicate line item order {}",
                pair[0].item_order
            )));
        }
    }
    if let Some(bad) = ordered.iter().find(|item| item.amount.is_negative()) {
        return Err(CoreError::invalid(format!(
            "line item '{}' has negative amount {}",
            bad.description, bad.amount
        )));
    }
    Ok(ordered)
}

/// A recurring or one-off obligation. One-off commitments use
/// `Recurrence::None` and no line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub workspace_id: WorkspaceId,
    /// Owner of the cash movement.
    pub entity_id: EntityId,
    pub counterparty_id: Option<EntityId>,
    pub account_id: Option<AccountId>,
    pub description: String,
    pub direction: Direction,
    pub amount: ContractAmount,
    pub currency: String,
    pub recurrence: Recurrence,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub adjustment: Option<AdjustmentTerms>,
    pub status: ContractStatus,
    pub line_items: Vec<LineItem>,
}
