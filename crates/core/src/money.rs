//! Exact-decimal money amounts.

use core::fmt;
use core::iter::Sum;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Non-negative amount with two decimal places.
///
/// Single currency; amounts are normalised to scale 2 on construction so that
/// `100`, `100.0` and `100.00` compare and serialize identically. Parsed
/// amounts never exceed [`Money::MAX_CENTS`], the largest value a
/// `NUMERIC(12, 2)` column holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const SCALE: u32 = 2;
    pub const MAX_CENTS: i64 = 999_999_999_999;

    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "amount must not be negative: {value}"
            )));
        }
        let mut normalised =
            value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        normalised.rescale(Self::SCALE);
        if normalised > Self::max().0 {
            return Err(DomainError::validation(format!(
                "amount must not exceed {}: {value}",
                Self::max()
            )));
        }
        Ok(Self(normalised))
    }

    /// Largest amount `new` accepts.
    pub fn max() -> Self {
        Self(Decimal::new(Self::MAX_CENTS, Self::SCALE))
    }

    pub fn zero() -> Self {
        Self(Decimal::new(0, Self::SCALE))
    }

    /// Amount expressed in hundredths (e.g. `from_cents(10050)` is `100.50`).
    pub fn from_cents(cents: u64) -> Self {
        Self(Decimal::from_i128_with_scale(i128::from(cents), Self::SCALE))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// `self + other`, or `None` when the sum is not representable.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Sum of `amounts`, or `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |total, amount| total.checked_add(amount))
    }

    /// `self - other`, clamped at zero.
    pub fn saturating_sub(self, other: Money) -> Money {
        if other.0 >= self.0 {
            Money::zero()
        } else {
            Money(self.0 - other.0)
        }
    }
}

impl ValueObject for Money {}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Saturates at the largest representable decimal instead of overflowing.
/// Use [`Money::checked_sum`] where an overflow must be reported.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |total, amount| {
            total.checked_add(amount).unwrap_or(Money(Decimal::MAX))
        })
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| DomainError::validation(format!("invalid amount '{s}': {e}")))?;
        Money::new(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
