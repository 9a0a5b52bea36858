//! cpk-billing
//!
//! Debit-Note Lifecycle
//! - Create / update / reconcile / cancel / delete as explicit commands
//! - Schedule eligibility and locks derived from current note rows, never
//!   from a cached flag
//! - Only a paid note locks its schedules; cancelled and deleted notes
//!   release them
//!
//! Deterministic, pure planning. The store applies a `BillingEffect` under a
//! per-tenant write lock.

mod eligibility;
mod planner;
mod types;

pub use eligibility::{available_schedules, live_claims, note_total, paid_claims};
pub use planner::plan_billing;
pub use types::{BillingCommand, BillingEffect, BillingSnapshot, NewDebitNote, NoteUpdate};
