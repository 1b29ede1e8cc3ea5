//! Core identifier and unit types.
//!
//! `Money` is kept as an integer minor-unit type throughout the core (spec
//! data model §3): every monetary computation in [`crate::credit`],
//! [`crate::ledger`], and [`crate::marketplace`] operates on `Money`, never
//! on a float, so rounding never silently drifts away from the amortization
//! identity checked in the test suite.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// An opaque farm identifier, assigned by the host.
pub type FarmId = i32;

/// An opaque vehicle identifier, assigned by the host.
pub type VehicleId = i64;

/// An opaque land parcel identifier, assigned by the host.
pub type LandId = i64;

/// Host-provided monotonic game-milliseconds. Never wall-clock time.
pub type GameTime = i64;

/// A stable deal identifier, e.g. `"vf-7-0042"` (see [`crate::deal::next_deal_id`]).
pub type DealId = String;

/// A stable search-request identifier.
pub type SearchId = String;

/// A stable listing identifier.
pub type ListingId = String;

/// A stable external (third-party mod) deal identifier.
pub type ExternalId = String;

/// Money expressed as an integer minor unit (cents). Arithmetic saturates
/// rather than overflowing, matching the "recoverable, nothing panics"
/// error policy in spec.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default, Hash)]
pub struct Money(pub i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_major(major: i64) -> Self {
        Money(major.saturating_mul(100))
    }

    /// Constructs from a floating-point major-unit amount, rounding to the
    /// nearest minor unit. Used only at the boundary where a listing price
    /// or percentage computation is naturally expressed in `f64`.
    pub fn from_f64_major(major: f64) -> Self {
        Money((major * 100.0).round() as i64)
    }

    pub fn as_f64_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_nan_or_infinite(major: f64) -> bool {
        major.is_nan() || major.is_infinite()
    }

    pub fn checked_mul_pct(self, pct: f64) -> Money {
        Money::from_f64_major(self.as_f64_major() * pct)
    }

    pub fn max(self, other: Money) -> Money {
        std::cmp::max(self, other)
    }

    pub fn min(self, other: Money) -> Money {
        std::cmp::min(self, other)
    }

    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.as_f64_major())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_roundtrips_major_units() {
        let m = Money::from_major(100);
        assert_eq!(m.as_f64_major(), 100.0);
    }

    #[test]
    fn money_arithmetic_saturates() {
        let m = Money(i64::MAX);
        let sum = m + Money(1);
        assert_eq!(sum.0, i64::MAX);

        let neg = Money(0) - Money(5);
        assert_eq!(neg.0, -5);
    }

    #[test]
    fn pct_multiplication_rounds() {
        let m = Money::from_major(1000);
        let half = m.checked_mul_pct(0.5);
        assert_eq!(half, Money::from_major(500));
    }

    #[test]
    fn nan_and_infinite_detected() {
        assert!(Money::is_nan_or_infinite(f64::NAN));
        assert!(Money::is_nan_or_infinite(f64::INFINITY));
        assert!(!Money::is_nan_or_infinite(42.0));
    }
}
