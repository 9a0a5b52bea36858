//! `Cents`: every amount in the workspace as an integer count of cents.
//!
//! There is no `From<i64>`, so a day offset or period count cannot become
//! money by accident. Floats are accepted only through `from_f64` and
//! `apply_percent`, both of which round half-up to the cent.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::error::MoneyError;
use crate::CENTS_SCALE;

/// `Cents::new(1_050)` is 10.50 in the account currency.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(i64);

/// `floor(x + 0.5)` back into cent space, or `OutOfRange` naming `what`.
fn round_half_up(x: f64, what: impl FnOnce() -> String) -> Result<Cents, MoneyError> {
    let rounded = (x + 0.5).floor();
    if !(i64::MIN as f64..=i64::MAX as f64).contains(&rounded) {
        return Err(MoneyError::OutOfRange { raw: what() });
    }
    Ok(Cents(rounded as i64))
}

impl Cents {
    pub const ZERO: Cents = Cents(0);
    pub const MAX: Cents = Cents(i64::MAX);
    pub const MIN: Cents = Cents(i64::MIN);

    pub const fn new(raw: i64) -> Self {
        Cents(raw)
    }

    /// Whole currency units: `Cents::units(12)` is 12.00.
    pub const fn units(units: i64) -> Self {
        Cents(units * CENTS_SCALE)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Currency units to cents, `floor(x * 100 + 0.5)`.
    pub fn from_f64(amount: f64) -> Result<Cents, MoneyError> {
        if !amount.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        round_half_up(amount * CENTS_SCALE as f64, || amount.to_string())
    }

    /// `"1234.5"`, `"-0.01"`, `"+7"`. No floats involved.
    pub fn parse_decimal(s: &str) -> Result<Cents, MoneyError> {
        crate::parse::decimal_to_cents(s).map(Cents)
    }

    /// Output boundary only.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / CENTS_SCALE as f64
    }

    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).map(Cents)
    }

    pub fn checked_sub(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_sub(rhs.0).map(Cents)
    }

    /// `Cents::MIN.abs()` saturates to `Cents::MAX`.
    pub fn abs(self) -> Cents {
        Cents(self.0.saturating_abs())
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Scale by `1 + percent / 100` and round to the cent. Series adjustments
    /// chain this per boundary instead of compounding a float factor.
    pub fn apply_percent(self, percent: f64) -> Result<Cents, MoneyError> {
        if !percent.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        round_half_up(self.0 as f64 * (1.0 + percent / 100.0), || {
            format!("{self} * (1 + {percent}%)")
        })
    }
}

// Operators saturate at the i64 bounds and never panic. Totals that are
// persisted go through `checked_*` or `sum_amounts`, which report overflow.
macro_rules! saturating_op {
    ($op:ident, $method:ident, $assign:ident, $assign_method:ident, $int:ident) => {
        impl $op for Cents {
            type Output = Cents;
            fn $method(self, rhs: Cents) -> Cents {
                Cents(self.0.$int(rhs.0))
            }
        }

        impl $assign for Cents {
            fn $assign_method(&mut self, rhs: Cents) {
                *self = $op::$method(*self, rhs);
            }
        }
    };
}

saturating_op!(Add, add, AddAssign, add_assign, saturating_add);
saturating_op!(Sub, sub, SubAssign, sub_assign, saturating_sub);

impl Neg for Cents {
    type Output = Cents;
    fn neg(self) -> Cents {
        Cents(self.0.saturating_neg())
    }
}

/// Saturating; report aggregation only.
impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, |acc, c| acc + c)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let scale = CENTS_SCALE.unsigned_abs();
        write!(f, "{sign}{}.{:02}", magnitude / scale, magnitude % scale)
    }
}
