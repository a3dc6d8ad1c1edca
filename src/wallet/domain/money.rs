//! Currency amounts in integer cents.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed currency amount stored as whole cents.
///
/// Amounts are signed so ledger entries can carry debits as negative values.
///
/// # Examples
///
/// ```
/// use taskmarket::wallet::domain::Money;
///
/// let price = Money::from_cents(2_000);
/// assert_eq!(price.to_string(), "$20.00");
/// assert_eq!(price.percent(10), Money::from_cents(200));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from whole cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates an amount from whole dollars, saturating on overflow.
    #[must_use]
    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Returns the amount in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` for amounts strictly above zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` for amounts strictly below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Adds two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Subtracts `other`, returning `None` on overflow.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(difference) => Some(Self(difference)),
            None => None,
        }
    }

    /// Returns the negated amount, saturating at the numeric bounds.
    #[must_use]
    pub const fn negated(self) -> Self {
        Self(self.0.saturating_neg())
    }

    /// Returns `percent`% of this amount, rounded towards negative infinity.
    #[must_use]
    pub const fn percent(self, percent: u32) -> Self {
        let scaled = self.0.saturating_mul(percent as i64);
        Self(scaled.div_euclid(100))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let dollars = magnitude.div_euclid(100);
        let cents = magnitude.rem_euclid(100);
        write!(f, "{sign}${dollars}.{cents:02}")
    }
}
