//! cpk-reconcile
//!
//! Reconciliation Matcher
//! - Candidate transactions for a debit note or an unmatched schedule:
//!   amount within a cent tolerance, date within a day window
//! - A transaction settles at most one schedule and at most one live note
//! - Link / unlink planning for schedules (planned <-> realized)
//! - Reversal planning (one reversal per transaction)
//!
//! Deterministic, pure logic. No IO. Candidates are offered, never auto-linked.

mod engine;
mod link;
mod types;

pub use engine::{
    debit_note_candidates, find_candidates, is_match, note_linked_transactions,
    schedule_candidates, schedule_linked_transactions,
};
pub use link::{apply_link_command, plan_link, plan_reversal, plan_unlink};
pub use types::{LinkCommand, MatchCandidate, MatchTarget, MatchTolerance};
