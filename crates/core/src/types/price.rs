//! Type-safe price representation using decimal arithmetic.
//!
//! The store sells in a single currency, so a [`Price`] is just a
//! non-negative [`Decimal`] amount in dollars. Arithmetic stays in decimal
//! space so cart totals never pick up binary floating-point drift.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
}

/// A non-negative monetary amount.
///
/// ```
/// use beanvoyage_core::Price;
///
/// let unit = Price::from_cents(1000);
/// assert_eq!(unit.times(3).to_string(), "$30.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units, saturating at [`Decimal::MAX`].
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }

    /// Multiply by a non-negative rate (e.g. a tax rate).
    ///
    /// Negative rates are treated as zero.
    #[must_use]
    pub fn scale(self, rate: Decimal) -> Self {
        if rate.is_sign_negative() {
            return Self::ZERO;
        }
        Self(self.0.saturating_mul(rate))
    }

    /// Round half-up to whole cents.
    #[must_use]
    pub fn round_cents(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Amount remaining until `self` reaches `target`, or zero if already there.
    #[must_use]
    pub fn shortfall_to(self, target: Self) -> Self {
        if self.0 >= target.0 {
            Self::ZERO
        } else {
            Self(target.0 - self.0)
        }
    }

    /// Returns `true` if the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "${rounded:.2}")
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('$');
        let amount =
            Decimal::from_str(trimmed).map_err(|_| PriceError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Price {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
