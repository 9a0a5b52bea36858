//! cpk-calendar
//!
//! Calendar / Recurrence Engine
//! - Month arithmetic with end-of-month clamping (Jan 31 + 1 month = Feb 28/29)
//! - Recurrence-date generation for contracts and commitments
//! - Period keys (day / month) for the cash-flow matrix
//! - ISO-8601 day-precision formatting and parsing
//!
//! Deterministic, pure logic. No IO, no wall-clock. Callers provide `today`.

mod dates;
mod error;
mod period;
mod recurrence;

pub use dates::{
    add_months, add_quarters, add_years, days_in_month, end_of_month, format_date_iso,
    is_date_in_range, months_between, parse_date_iso, same_day_next_month, start_of_month,
};
pub use error::CalendarError;
pub use period::{enumerate_periods, Granularity, PeriodKey};
pub use recurrence::{count_periods, generate_recurrence_dates, Recurrence};

pub use chrono::NaiveDate;
