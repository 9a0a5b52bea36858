use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dates::{add_months, end_of_month, format_date_iso, parse_date_iso, start_of_month};
use crate::error::CalendarError;

/// Bucket size of the cash-flow matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    #[default]
    Month,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Month => "month",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "month" | "monthly" => Ok(Granularity::Month),
            _ => Err(CalendarError::UnknownGranularity { raw: s.to_string() }),
        }
    }
}

/// One period of the matrix.
///
/// `Month` carries the first day of its month; constructors normalise it.
/// Keys of the same granularity order chronologically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodKey {
    Day(NaiveDate),
    Month(NaiveDate),
}

impl PeriodKey {
    /// The period of granularity `g` that contains `date`.
    pub fn containing(date: NaiveDate, g: Granularity) -> PeriodKey {
        match g {
            Granularity::Day => PeriodKey::Day(date),
            Granularity::Month => PeriodKey::Month(start_of_month(date)),
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            PeriodKey::Day(_) => Granularity::Day,
            PeriodKey::Month(_) => Granularity::Month,
        }
    }

    /// First day of the period.
    pub fn start(&self) -> NaiveDate {
        match *self {
            PeriodKey::Day(d) => d,
            PeriodKey::Month(d) => start_of_month(d),
        }
    }

    /// Last day of the period (inclusive).
    pub fn end(&self) -> NaiveDate {
        match *self {
            PeriodKey::Day(d) => d,
            PeriodKey::Month(d) => end_of_month(d),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start() <= date && date <= self.end()
    }

    /// The following period, `None` at the end of chrono's date range.
    pub fn next(&self) -> Option<PeriodKey> {
        match *self {
            PeriodKey::Day(d) => d.succ_opt().map(PeriodKey::Day),
            PeriodKey::Month(d) => add_months(start_of_month(d), 1).ok().map(PeriodKey::Month),
        }
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodKey::Day(d) => f.write_str(&format_date_iso(*d)),
            PeriodKey::Month(d) => write!(f, "{:04}-{:02}", d.year(), d.month()),
        }
    }
}

impl FromStr for PeriodKey {
    type Err = CalendarError;

    /// `YYYY-MM-DD` is a day key, `YYYY-MM` a month key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || CalendarError::InvalidPeriodKey { raw: s.to_string() };
        match raw.len() {
            10 => parse_date_iso(raw).map(PeriodKey::Day).map_err(|_| invalid()),
            7 => parse_date_iso(&format!("{raw}-01"))
                .map(PeriodKey::Month)
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeriodKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Every period of granularity `g` from the one containing `from` to the one
/// containing `to`, in chronological order. Empty when `to < from`.
pub fn enumerate_periods(from: NaiveDate, to: NaiveDate, g: Granularity) -> Vec<PeriodKey> {
    if to < from {
        return Vec::new();
    }
    let last = PeriodKey::containing(to, g);
    let mut out = Vec::new();
    let mut current = Some(PeriodKey::containing(from, g));
    while let Some(key) = current {
        if key > last {
            break;
        }
        out.push(key);
        current = key.next();
    }
    out
}
