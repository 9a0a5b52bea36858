//! cpk-schemas
//!
//! Shared data model for the cash-planning workspace.
//! - Tenant-scoped records: entities, accounts, contracts, schedules,
//!   transactions, debit notes, alerts
//! - Typed uuid identifiers (no raw `Uuid` crosses a crate boundary)
//! - `CoreError`: the boundary error with stable machine codes
//!
//! Plain data. No IO.

#[macro_use]
mod labels;

mod alert;
mod contract;
mod debit_note;
mod error;
mod ids;
mod party;
mod schedule;
mod transaction;

pub use alert::{Alert, AlertChanges, AlertState, DrillDown, Severity};
pub use contract::{
    ordered_line_items, AdjustmentIndex, AdjustmentTerms, Contract, ContractAmount,
    ContractLineItem, ContractStatus, LineItem, LineItemKind,
};
pub use debit_note::{DebitNote, DebitNoteStatus};
pub use error::{CoreError, CoreResult};
pub use ids::{
    AccountId, AlertId, ContractId, DebitNoteId, EntityId, ScheduleId, TransactionId, WorkspaceId,
};
pub use party::{Account, AccountKind, Entity, EntityKind, Workspace};
pub use schedule::{Direction, Schedule, ScheduleStatus};
pub use transaction::{Transaction, TransactionKind};

pub use cpk_calendar::{NaiveDate, Recurrence};
pub use cpk_money::Cents;
