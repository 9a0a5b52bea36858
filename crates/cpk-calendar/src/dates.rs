//! Calendar-day arithmetic.
//!
//! Everything works on `NaiveDate`: there is no time-of-day and no timezone.
//! A date read from a timestamp is normalised to its calendar day by the
//! caller before it reaches this module.

use chrono::{Datelike, Months, NaiveDate};

use crate::error::CalendarError;

const ISO_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Month arithmetic
// ---------------------------------------------------------------------------

/// Add `months` (may be negative) with end-of-month clamping.
///
/// The day of month is kept when the target month has it, otherwise it is
/// clamped to the target month's last day: 2024-01-31 + 1 = 2024-02-29,
/// 2023-01-31 + 1 = 2023-02-28. Never rolls over into the following month.
pub fn add_months(date: NaiveDate, months: i64) -> Result<NaiveDate, CalendarError> {
    let out_of_range = || CalendarError::OutOfRange {
        base: format_date_iso(date),
        months,
    };
    let magnitude = u32::try_from(months.unsigned_abs()).map_err(|_| out_of_range())?;
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(magnitude))
    } else {
        date.checked_sub_months(Months::new(magnitude))
    };
    shifted.ok_or_else(out_of_range)
}

pub fn add_quarters(date: NaiveDate, quarters: i64) -> Result<NaiveDate, CalendarError> {
    add_months(date, quarters.saturating_mul(3))
}

pub fn add_years(date: NaiveDate, years: i64) -> Result<NaiveDate, CalendarError> {
    add_months(date, years.saturating_mul(12))
}

/// "Same day next month" with end-of-month clamping.
pub fn same_day_next_month(date: NaiveDate) -> Result<NaiveDate, CalendarError> {
    add_months(date, 1)
}

/// Number of days in `month` (1..=12) of `year`. Returns 0 for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month.
    date.with_day(1).unwrap_or(date)
}

pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let last = days_in_month(date.year(), date.month());
    date.with_day(last).unwrap_or(date)
}

/// Whole calendar months from `from` to `to`, day-of-month aware.
///
/// 2024-01-15 → 2024-03-14 is 1 month; → 2024-03-15 is 2 months.
/// Negative when `to` precedes `from`.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    if to < from {
        return -months_between(to, from);
    }
    let raw = i64::from(to.year() - from.year()) * 12 + i64::from(to.month())
        - i64::from(from.month());
    // A clamped end-of-month target (Jan 31 → Feb 29) still counts as a full month.
    let reached_day = to.day() >= from.day() || to == end_of_month(to);
    if reached_day {
        raw
    } else {
        raw - 1
    }
}

// ---------------------------------------------------------------------------
// Ranges and ISO formatting
// ---------------------------------------------------------------------------

/// `from <= date <= to`, both bounds inclusive.
pub fn is_date_in_range(date: NaiveDate, from: NaiveDate, to: NaiveDate) -> bool {
    from <= date && date <= to
}

pub fn format_date_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

/// Parse `YYYY-MM-DD`. Surrounding whitespace is ignored; anything else is rejected.
pub fn parse_date_iso(raw: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(raw.trim(), ISO_FORMAT).map_err(|_| CalendarError::InvalidIsoDate {
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn jan_31_plus_one_month_clamps_to_leap_february() {
        assert_eq!(add_months(d(2024, 1, 31), 1).unwrap(), d(2024, 2, 29));
        assert_eq!(add_months(d(2023, 1, 31), 1).unwrap(), d(2023, 2, 28));
    }

    #[test]
    fn negative_months_clamp_too() {
        assert_eq!(add_months(d(2024, 3, 31), -1).unwrap(), d(2024, 2, 29));
    }

    #[test]
    fn quarters_and_years() {
        assert_eq!(add_quarters(d(2024, 11, 30), 1).unwrap(), d(2025, 2, 28));
        assert_eq!(add_years(d(2024, 2, 29), 1).unwrap(), d(2025, 2, 28));
    }

    #[test]
    fn add_months_out_of_range_is_error() {
        assert!(matches!(
            add_months(d(2024, 1, 1), i64::MAX),
            Err(CalendarError::OutOfRange { .. })
        ));
    }

    #[test]
    fn month_bounds() {
        assert_eq!(start_of_month(d(2024, 2, 17)), d(2024, 2, 1));
        assert_eq!(end_of_month(d(2024, 2, 17)), d(2024, 2, 29));
        assert_eq!(end_of_month(d(2100, 2, 1)), d(2100, 2, 28));
        assert_eq!(end_of_month(d(2000, 2, 1)), d(2000, 2, 29));
    }

    #[test]
    fn months_between_is_day_aware() {
        assert_eq!(months_between(d(2024, 1, 15), d(2024, 3, 14)), 1);
        assert_eq!(months_between(d(2024, 1, 15), d(2024, 3, 15)), 2);
        assert_eq!(months_between(d(2024, 1, 31), d(2024, 2, 29)), 1);
        assert_eq!(months_between(d(2024, 3, 15), d(2024, 1, 15)), -2);
        assert_eq!(months_between(d(2024, 5, 5), d(2024, 5, 5)), 0);
    }

    #[test]
    fn range_is_inclusive() {
        let from = d(2024, 1, 1);
        let to = d(2024, 1, 31);
        assert!(is_date_in_range(from, from, to));
        assert!(is_date_in_range(to, from, to));
        assert!(!is_date_in_range(d(2024, 2, 1), from, to));
    }

    #[test]
    fn iso_parse_rejects_garbage() {
        assert!(parse_date_iso("2024-02-30").is_err());
        assert!(parse_date_iso("24-1-1x").is_err());
        assert!(parse_date_iso("").is_err());
        assert_eq!(parse_date_iso(" 2024-02-29 ").unwrap(), d(2024, 2, 29));
    }
}
