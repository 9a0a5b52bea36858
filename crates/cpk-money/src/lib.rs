//! cpk-money
//!
//! Money Kernel
//! - `Cents` fixed-point newtype (1 currency unit = 100 cents)
//! - Round-half-up conversion at the float boundary
//! - Exact splitting of a total into N parts (front-loaded remainder)
//! - Tolerance comparison and drift-free summation
//!
//! Pure deterministic logic. No IO, no time.

mod cents;
mod error;
mod ops;
mod parse;

pub use cents::Cents;
pub use error::MoneyError;
pub use ops::{amounts_match, divide_amount, round_to_cents, sum_amounts};

/// Cents per currency unit.
pub const CENTS_SCALE: i64 = 100;

/// Default reconciliation tolerance (one cent).
pub const DEFAULT_TOLERANCE_CENTS: i64 = 1;
