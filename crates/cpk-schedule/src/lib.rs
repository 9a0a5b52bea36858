//! cpk-schedule
//!
//! Schedule Generator
//! - Expands a contract (recurrence, amount, line items, adjustment terms)
//!   into dated, cent-exact planned schedules
//! - Total contracts are split with `divide_amount`, so the series sums to
//!   the contract total exactly
//! - Periodic re-pricing is applied once per boundary with cent rounding
//! - Regeneration and cancellation are planned as pure write sets
//!
//! The only IO seam is the `IndexRateProvider` collaborator.

mod generate;
mod index;
mod plan;

pub use generate::{build_schedules, generate_schedules, series_dates, GenerateOptions};
pub use index::{IndexRateError, IndexRateProvider, NoIndexRates};
pub use plan::{plan_cancellation, plan_regeneration, SchedulePlan};
