//! cpk-cashflow
//!
//! Cash-Flow Matrix Builder
//! - Zero-filled, chronologically ordered day/month buckets over a range
//! - Planned (schedules) vs realised (transactions) income and expense
//! - Running cumulative balances, raw and offset by the starting balance
//! - Executive KPIs as a read-only reduction over the matrix
//! - Per-period drill-down sharing the matrix's inclusion rules
//!
//! Deterministic, pure logic. No IO, no wall-clock. Callers provide `today`.

mod drill;
mod kpi;
mod matrix;
mod scope;

pub use drill::{drill_down, PeriodDetail};
pub use kpi::{derive_kpis, ExecutiveKpis, KpiSummary, TrendPoint, WorstPoint, TREND_LEN};
pub use matrix::{build_matrix, CashFlowMatrix, PeriodBucket, StartingBalance};
pub use scope::{CashFlowFilter, MatrixRequest};
