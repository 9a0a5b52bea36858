use thiserror::Error;

/// Failures raised by the money kernel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// A float input was NaN or infinite.
    #[error("amount is not a finite number")]
    NotFinite,

    /// A value does not fit the i64 cent range.
    #[error("amount out of range: {raw}")]
    OutOfRange { raw: String },

    /// A decimal string could not be parsed.
    #[error("amount could not be parsed: '{raw}'")]
    InvalidDecimal { raw: String },

    /// More than two fractional digits (ambiguous cent conversion).
    #[error("amount has more than 2 decimal places: '{raw}'")]
    TooManyDecimalPlaces { raw: String },

    /// `divide_amount` needs at least one part.
    #[error("cannot divide into {parts} parts (must be >= 1)")]
    InvalidParts { parts: u32 },

    /// `divide_amount` needs a strictly positive total.
    #[error("total must be > 0, got {total_cents} cents")]
    NonPositiveTotal { total_cents: i64 },

    /// Post-condition of an exact split failed. Never tolerated.
    #[error("split sum mismatch: expected {expected_cents} cents, got {actual_cents} cents")]
    SumMismatch {
        expected_cents: i64,
        actual_cents: i64,
    },
}

impl MoneyError {
    /// `true` for violations of a cent-exact invariant (as opposed to bad input).
    pub fn is_internal(&self) -> bool {
        matches!(self, MoneyError::SumMismatch { .. })
    }
}
