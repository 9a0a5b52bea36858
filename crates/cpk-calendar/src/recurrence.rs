use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::add_months;
use crate::error::CalendarError;

/// How often a contract or commitment repeats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    /// One-off: a single date, whatever the end date says.
    None,
    Monthly,
    Quarterly,
    Yearly,
    /// Opts out of auto-generation; the caller supplies further dates.
    Custom,
}

impl Recurrence {
    /// Month step between consecutive dates, `None` for non-stepping kinds.
    pub fn step_months(self) -> Option<i64> {
        match self {
            Recurrence::Monthly => Some(1),
            Recurrence::Quarterly => Some(3),
            Recurrence::Yearly => Some(12),
            Recurrence::None | Recurrence::Custom => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Monthly => "monthly",
            Recurrence::Quarterly => "quarterly",
            Recurrence::Yearly => "yearly",
            Recurrence::Custom => "custom",
        }
    }
}

impl FromStr for Recurrence {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "once" => Ok(Recurrence::None),
            "monthly" => Ok(Recurrence::Monthly),
            "quarterly" => Ok(Recurrence::Quarterly),
            "yearly" | "annual" | "annually" => Ok(Recurrence::Yearly),
            "custom" => Ok(Recurrence::Custom),
            _ => Err(CalendarError::UnknownRecurrence { raw: s.to_string() }),
        }
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered recurrence dates from `start` to `end`, both inclusive.
///
/// Rules:
/// - `None` yields exactly `[start]`, even when `end < start`.
/// - `Custom` yields `[start]` when `start <= end`, otherwise nothing.
/// - Stepping kinds yield nothing when `end < start`.
/// - Each date is the previous generated date plus one step, clamped to the
///   target month's last day. A clamp therefore carries forward:
///   2024-01-31 monthly gives 01-31, 02-29, 03-29.
pub fn generate_recurrence_dates(
    start: NaiveDate,
    end: NaiveDate,
    recurrence: Recurrence,
) -> Result<Vec<NaiveDate>, CalendarError> {
    if recurrence == Recurrence::None {
        return Ok(vec![start]);
    }
    if end < start {
        return Ok(Vec::new());
    }
    let Some(step) = recurrence.step_months() else {
        return Ok(vec![start]);
    };

    let mut dates = vec![start];
    let mut current = start;
    loop {
        let next = add_months(current, step)?;
        if next > end {
            break;
        }
        dates.push(next);
        current = next;
    }
    Ok(dates)
}

/// Number of dates `generate_recurrence_dates` yields for the same inputs.
pub fn count_periods(
    start: NaiveDate,
    end: NaiveDate,
    recurrence: Recurrence,
) -> Result<usize, CalendarError> {
    generate_recurrence_dates(start, end, recurrence).map(|dates| dates.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn monthly_end_of_month_clamp_carries_forward() {
        let dates =
            generate_recurrence_dates(d(2024, 1, 31), d(2024, 3, 31), Recurrence::Monthly).unwrap();
        assert_eq!(dates, vec![d(2024, 1, 31), d(2024, 2, 29), d(2024, 3, 29)]);
    }

    #[test]
    fn quarterly_steps_three_months() {
        let dates =
            generate_recurrence_dates(d(2024, 1, 15), d(2024, 12, 31), Recurrence::Quarterly)
                .unwrap();
        assert_eq!(
            dates,
            vec![d(2024, 1, 15), d(2024, 4, 15), d(2024, 7, 15), d(2024, 10, 15)]
        );
    }

    #[test]
    fn yearly_includes_end_when_exact() {
        let dates =
            generate_recurrence_dates(d(2024, 6, 1), d(2026, 6, 1), Recurrence::Yearly).unwrap();
        assert_eq!(dates.len(), 3);
    }

    #[test]
    fn none_yields_start_even_when_end_precedes_start() {
        let dates =
            generate_recurrence_dates(d(2024, 5, 1), d(2024, 1, 1), Recurrence::None).unwrap();
        assert_eq!(dates, vec![d(2024, 5, 1)]);
        assert_eq!(
            count_periods(d(2024, 5, 1), d(2024, 1, 1), Recurrence::None).unwrap(),
            1
        );
    }

    #[test]
    fn stepping_kinds_yield_nothing_when_end_precedes_start() {
        for r in [Recurrence::Monthly, Recurrence::Quarterly, Recurrence::Yearly, Recurrence::Custom] {
            let dates = generate_recurrence_dates(d(2024, 5, 1), d(2024, 1, 1), r).unwrap();
            assert!(dates.is_empty(), "{r} produced {dates:?}");
        }
    }

    #[test]
    fn custom_yields_only_start() {
        let dates =
            generate_recurrence_dates(d(2024, 1, 1), d(2024, 12, 31), Recurrence::Custom).unwrap();
        assert_eq!(dates, vec![d(2024, 1, 1)]);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Monthly".parse::<Recurrence>().unwrap(), Recurrence::Monthly);
        assert_eq!(" YEARLY ".parse::<Recurrence>().unwrap(), Recurrence::Yearly);
        assert!("fortnightly".parse::<Recurrence>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&Recurrence::Quarterly).unwrap(), "\"quarterly\"");
    }
}
