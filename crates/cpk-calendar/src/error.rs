use thiserror::Error;

/// Failures raised by the calendar engine. All of them are caller input errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("invalid ISO date '{raw}' (expected YYYY-MM-DD)")]
    InvalidIsoDate { raw: String },

    #[error("unknown recurrence '{raw}'")]
    UnknownRecurrence { raw: String },

    #[error("unknown granularity '{raw}' (expected day or month)")]
    UnknownGranularity { raw: String },

    #[error("invalid period key '{raw}'")]
    InvalidPeriodKey { raw: String },

    /// Date arithmetic left chrono's representable range.
    #[error("date out of range: {base} + {months} months")]
    OutOfRange { base: String, months: i64 },
}
