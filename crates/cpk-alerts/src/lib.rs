//! cpk-alerts
//!
//! Alert Evaluation Engine
//! - Rules are typed, tagged configs evaluated through one dispatch match
//! - Findings are diffed against stored alerts into an `AlertChanges` write
//!   set: insert, re-open, refresh, stale resolution
//! - The batch runner evaluates tenants in parallel, bounded by a
//!   semaphore; one tenant's failure never aborts the others
//!
//! Rule evaluation and diffing are pure. Only the batch runner does IO.

mod batch;
mod diff;
mod evaluate;
mod rules;

pub use batch::{evaluate_tenant, run_batch, BatchOptions, BatchReport};
pub use diff::diff_alerts;
pub use evaluate::{evaluate_rules, Finding, TenantData};
pub use rules::{default_rules, validate_rules, RuleConfig, RuleKind};
