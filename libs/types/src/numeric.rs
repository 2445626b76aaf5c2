//! Fixed-point decimal types for prices and quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! `Price` is always strictly positive. `Quantity` is never negative; zero is
//! reserved for the remaining quantity of a filled order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use crate::errors::OrderError;

/// Limit price, denominated in the quote asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a price, rejecting zero and negative values
    pub fn try_new(value: Decimal) -> Result<Self, OrderError> {
        if value <= Decimal::ZERO {
            return Err(OrderError::InvalidPrice(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Price {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|_| OrderError::InvalidPrice(s.to_string()))?;
        Self::try_new(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order quantity, denominated in the base asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a quantity, returning None for negative values
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value < Decimal::ZERO {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Create a quantity that must be strictly positive (order submission)
    pub fn positive(value: Decimal) -> Result<Self, OrderError> {
        if value <= Decimal::ZERO {
            return Err(OrderError::InvalidQuantity(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Subtract, returning None if the result would be negative
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        Self::try_new(self.0 - other.0)
    }

    /// Quote-asset value of this quantity at `price`, or None when it does
    /// not fit in a `Decimal`
    pub fn notional(&self, price: Price) -> Option<Decimal> {
        self.0.checked_mul(price.as_decimal())
    }

    /// Sum clamped at `Decimal::MAX`, for aggregates only
    pub fn saturating_add(self, other: Quantity) -> Quantity {
        Self(self.0.saturating_add(other.0))
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl FromStr for Quantity {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s.trim()).map_err(|_| OrderError::InvalidQuantity(s.to_string()))?;
        Self::try_new(value).ok_or_else(|| OrderError::InvalidQuantity(s.to_string()))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
