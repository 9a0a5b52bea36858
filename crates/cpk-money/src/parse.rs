//! Decimal string → cents conversion (no floats at any stage).

use crate::error::MoneyError;

/// Accepts `[+-]digits[.d[d]]`, with either side of the dot allowed to be
/// empty but not both. Anything else is `InvalidDecimal`.
pub(crate) fn decimal_to_cents(s: &str) -> Result<i64, MoneyError> {
    let raw = s.trim();
    let invalid = || MoneyError::InvalidDecimal {
        raw: raw.to_string(),
    };
    let overflow = || MoneyError::OutOfRange {
        raw: raw.to_string(),
    };

    let (sign, body) = match raw.as_bytes().first() {
        Some(b'-') => (-1, &raw[1..]),
        Some(b'+') => (1, &raw[1..]),
        _ => (1, raw),
    };
    let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if fraction.len() > 2 {
        return Err(MoneyError::TooManyDecimalPlaces {
            raw: raw.to_string(),
        });
    }

    // "1.5" is read as the digit run "150"
    let padded = format!("{whole}{fraction:0<2}");
    let mut cents: i64 = 0;
    for b in padded.bytes() {
        if !b.is_ascii_digit() {
            return Err(invalid());
        }
        cents = cents
            .checked_mul(10)
            .and_then(|v| v.checked_add(i64::from(b - b'0')))
            .ok_or_else(overflow)?;
    }
    Ok(sign * cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_number() {
        assert_eq!(decimal_to_cents("100").unwrap(), 10_000);
    }

    #[test]
    fn two_decimal_places() {
        assert_eq!(decimal_to_cents("182.34").unwrap(), 18_234);
    }

    #[test]
    fn one_decimal_place_is_padded() {
        assert_eq!(decimal_to_cents("1.5").unwrap(), 150);
    }

    #[test]
    fn leading_dot() {
        assert_eq!(decimal_to_cents(".05").unwrap(), 5);
    }

    #[test]
    fn signs() {
        assert_eq!(decimal_to_cents("-0.01").unwrap(), -1);
        assert_eq!(decimal_to_cents("+7").unwrap(), 700);
    }

    #[test]
    fn rejects_three_decimal_places() {
        assert!(matches!(
            decimal_to_cents("1.005"),
            Err(MoneyError::TooManyDecimalPlaces { .. })
        ));
    }

    #[test]
    fn rejects_garbage() {
        for raw in ["", "  ", "abc", "1.2.3", "-", "NaN", "1e5"] {
            assert!(decimal_to_cents(raw).is_err(), "accepted {raw:?}");
        }
    }
}
