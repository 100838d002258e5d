//! Fixed-point decimal types for prices and quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! All money-touching calculations in the workspace go through these types;
//! binary floats never enter a price, amount, or fee path.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use thiserror::Error;

/// Errors from constructing or parsing numeric values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericError {
    #[error("price must be strictly positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("quantity must be non-negative, got {0}")]
    NegativeQuantity(Decimal),

    #[error("unparseable decimal: {0}")]
    Parse(String),
}

/// A strictly positive execution or quote price
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a price, rejecting zero and negative values
    pub fn try_new(value: Decimal) -> Result<Self, NumericError> {
        if value <= Decimal::ZERO {
            return Err(NumericError::NonPositivePrice(value));
        }
        Ok(Self(value))
    }

    /// Create a price from a whole number
    ///
    /// # Panics
    /// Panics on zero (whole-number literals in tests are never zero)
    pub fn from_u64(value: u64) -> Self {
        Self::try_new(Decimal::from(value)).expect("non-zero literal")
    }

    /// Parse a price from its decimal string form
    pub fn from_str(s: &str) -> Result<Self, NumericError> {
        let d: Decimal = s.parse().map_err(|_| NumericError::Parse(s.to_string()))?;
        Self::try_new(d)
    }

    /// Get the underlying decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Check the fractional digit count against a pair's price precision
    pub fn fits_scale(&self, max_scale: u32) -> bool {
        fits_scale(self.0, max_scale)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-negative order or trade quantity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a quantity, rejecting negative values
    pub fn try_new(value: Decimal) -> Result<Self, NumericError> {
        if value < Decimal::ZERO {
            return Err(NumericError::NegativeQuantity(value));
        }
        Ok(Self(value))
    }

    /// Create a quantity from an already-validated decimal
    ///
    /// # Panics
    /// Panics on negative input
    pub fn new(value: Decimal) -> Self {
        Self::try_new(value).expect("quantity must be non-negative")
    }

    /// The zero quantity
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Parse a quantity from its decimal string form
    pub fn from_str(s: &str) -> Result<Self, NumericError> {
        let d: Decimal = s.parse().map_err(|_| NumericError::Parse(s.to_string()))?;
        Self::try_new(d)
    }

    /// Get the underlying decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Check if the quantity is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Check the fractional digit count against a pair's amount precision
    pub fn fits_scale(&self, max_scale: u32) -> bool {
        fits_scale(self.0, max_scale)
    }

    /// Subtract, clamping at zero
    pub fn saturating_sub(&self, other: Quantity) -> Quantity {
        if other.0 >= self.0 {
            Quantity::zero()
        } else {
            Quantity(self.0 - other.0)
        }
    }

    /// Truncate down to the given fractional digit count
    pub fn truncate_to_scale(&self, scale: u32) -> Quantity {
        Quantity(self.0.round_dp_with_strategy(scale, RoundingStrategy::ToZero))
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notional value of an order or fill: price × quantity
pub fn notional(price: Price, quantity: Quantity) -> Decimal {
    price.as_decimal() * quantity.as_decimal()
}

/// Check that a decimal has no more than `max_scale` significant fractional digits
///
/// Trailing zeros do not count ("1.50" fits scale 1).
pub fn fits_scale(value: Decimal, max_scale: u32) -> bool {
    value.normalize().scale() <= max_scale
}
