//! Splitting, comparison and summation in cent space.

use crate::cents::Cents;
use crate::error::MoneyError;
use crate::CENTS_SCALE;

/// Split `total` into `n` integer-cent parts whose sum is exactly `total`.
///
/// Every part gets `total / n`; the remainder `r` is distributed one cent
/// each to the first `r` parts. So max(parts) - min(parts) <= 1 cent and the
/// front-loaded parts are the larger ones.
///
/// Errors:
/// - `n < 1` → `InvalidParts`
/// - `total <= 0` → `NonPositiveTotal`
/// - post-condition sum mismatch → `SumMismatch` (internal)
pub fn divide_amount(total: Cents, n: u32) -> Result<Vec<Cents>, MoneyError> {
    if n < 1 {
        return Err(MoneyError::InvalidParts { parts: n });
    }
    if !total.is_positive() {
        return Err(MoneyError::NonPositiveTotal {
            total_cents: total.raw(),
        });
    }

    let n_i64 = i64::from(n);
    let base = total.raw() / n_i64;
    let remainder = total.raw() % n_i64;

    let parts: Vec<Cents> = (0..n_i64)
        .map(|i| Cents::new(if i < remainder { base + 1 } else { base }))
        .collect();

    let actual = sum_amounts(parts.iter().copied())?;
    if actual != total {
        return Err(MoneyError::SumMismatch {
            expected_cents: total.raw(),
            actual_cents: actual.raw(),
        });
    }
    Ok(parts)
}

/// `|a - b| <= tolerance` in cents. Negative tolerances behave like zero.
pub fn amounts_match(a: Cents, b: Cents, tolerance_cents: i64) -> bool {
    let diff = (i128::from(a.raw()) - i128::from(b.raw())).abs();
    diff <= i128::from(tolerance_cents.max(0))
}

/// Exact sum, accumulated in i128. `OutOfRange` when the total does not fit
/// the i64 cent range.
pub fn sum_amounts<I>(amounts: I) -> Result<Cents, MoneyError>
where
    I: IntoIterator<Item = Cents>,
{
    let total: i128 = amounts.into_iter().map(|c| i128::from(c.raw())).sum();
    i64::try_from(total)
        .map(Cents::new)
        .map_err(|_| MoneyError::OutOfRange {
            raw: format!("{total} cents"),
        })
}

/// Round a float amount to two decimals with round-half-up on `x * 100`.
///
/// Output-boundary helper; internal arithmetic uses [`Cents`].
pub fn round_to_cents(amount: f64) -> f64 {
    let scale = CENTS_SCALE as f64;
    (amount * scale + 0.5).floor() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn thousand_split_three_ways_front_loads_remainder() {
        let parts = divide_amount(Cents::units(1000), 3).unwrap();
        assert_eq!(
            parts,
            vec![Cents::new(33_334), Cents::new(33_333), Cents::new(33_333)]
        );
    }

    #[test]
    fn single_part_is_the_total() {
        assert_eq!(
            divide_amount(Cents::new(1), 1).unwrap(),
            vec![Cents::new(1)]
        );
    }

    #[test]
    fn more_parts_than_cents_yields_zero_tail() {
        let parts = divide_amount(Cents::new(2), 4).unwrap();
        assert_eq!(
            parts,
            vec![Cents::new(1), Cents::new(1), Cents::ZERO, Cents::ZERO]
        );
    }

    #[test]
    fn zero_parts_rejected() {
        assert_eq!(
            divide_amount(Cents::units(10), 0),
            Err(MoneyError::InvalidParts { parts: 0 })
        );
    }

    #[test]
    fn non_positive_total_rejected() {
        assert_eq!(
            divide_amount(Cents::ZERO, 3),
            Err(MoneyError::NonPositiveTotal { total_cents: 0 })
        );
        assert!(divide_amount(Cents::new(-100), 2).is_err());
    }

    #[test]
    fn amounts_match_within_one_cent() {
        assert!(amounts_match(Cents::new(10_000), Cents::new(10_001), 1));
        assert!(!amounts_match(Cents::new(10_000), Cents::new(10_002), 1));
        assert!(amounts_match(Cents::new(5), Cents::new(5), 0));
        assert!(!amounts_match(Cents::new(5), Cents::new(6), -3));
    }

    #[test]
    fn amounts_match_does_not_overflow_at_extremes() {
        assert!(!amounts_match(Cents::MAX, Cents::MIN, i64::MAX));
    }

    #[test]
    fn sum_past_i64_is_out_of_range() {
        assert!(matches!(
            sum_amounts([Cents::MAX, Cents::new(1)]),
            Err(MoneyError::OutOfRange { .. })
        ));
        assert!(sum_amounts([Cents::MIN, Cents::new(-1)]).is_err());
        // intermediate overflow that cancels out is still exact
        assert_eq!(
            sum_amounts([Cents::MAX, Cents::new(1), Cents::new(-2)]).unwrap(),
            Cents::new(i64::MAX - 1)
        );
    }

    #[test]
    fn ten_thousand_small_amounts_sum_exactly() {
        let total = sum_amounts(std::iter::repeat(Cents::new(1)).take(10_000)).unwrap();
        assert_eq!(total, Cents::units(100));
    }

    #[test]
    fn round_to_cents_half_up() {
        assert_eq!(round_to_cents(0.125), 0.13);
        assert_eq!(round_to_cents(-0.125), -0.12);
        assert_eq!(round_to_cents(2.0), 2.0);
    }

    proptest! {
        #[test]
        fn split_sums_to_total(total in 1i64..1_000_000_000_000, n in 1u32..500) {
            let parts = divide_amount(Cents::new(total), n).unwrap();
            prop_assert_eq!(parts.len(), n as usize);
            prop_assert_eq!(sum_amounts(parts.iter().copied()).unwrap(), Cents::new(total));
        }

        #[test]
        fn split_parts_differ_by_at_most_one_cent(total in 1i64..1_000_000_000, n in 1u32..500) {
            let parts = divide_amount(Cents::new(total), n).unwrap();
            let max = parts.iter().copied().max().unwrap();
            let min = parts.iter().copied().min().unwrap();
            prop_assert!((max - min).raw() <= 1);
            // front-loaded: non-increasing
            prop_assert!(parts.windows(2).all(|w| w[0] >= w[1]));
        }

        #[test]
        fn amounts_match_is_symmetric(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000, tol in 0i64..100) {
            prop_assert_eq!(
                amounts_match(Cents::new(a), Cents::new(b), tol),
                amounts_match(Cents::new(b), Cents::new(a), tol)
            );
        }
    }
}
