//! Order lifecycle types
//!
//! An order is `Open` until its first fill, `PartiallyFilled` while it still
//! rests with a smaller remaining quantity, and ends either `Filled`
//! (remaining == 0) or `Cancelled`.

use crate::errors::OrderError;
use crate::ids::{OrderId, TradingPair, UserId};
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl FromStr for Side {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(OrderError::InvalidSide(s.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("buy"),
            Side::Sell => f.write_str("sell"),
        }
    }
}

/// Why an order left the book without filling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// Explicit CancelOrder call
    UserRequested,
    /// The owner could no longer cover a crossing trade
    InsufficientBalance,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled(CancelReason),
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled(_))
    }
}

/// Unvalidated order submission, as decoded by the transport layer
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    /// Caller-supplied ID; the engine generates one when absent
    pub order_id: Option<OrderId>,
    pub user_id: UserId,
    pub asset: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl NewOrder {
    pub fn new(
        order_id: Option<OrderId>,
        user_id: impl Into<String>,
        asset: impl Into<String>,
        side: Side,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self {
            order_id,
            user_id: UserId::new(user_id),
            asset: asset.into(),
            side,
            price,
            quantity,
        }
    }

    /// Decode raw string fields, reporting the first invalid one
    pub fn parse(
        order_id: Option<&str>,
        user_id: &str,
        asset: &str,
        side: &str,
        price: &str,
        quantity: &str,
    ) -> Result<Self, OrderError> {
        let side = side.parse::<Side>()?;
        let price = Decimal::from_str(price.trim())
            .map_err(|_| OrderError::InvalidPrice(price.to_string()))?;
        let quantity = Decimal::from_str(quantity.trim())
            .map_err(|_| OrderError::InvalidQuantity(quantity.to_string()))?;
        Ok(Self::new(
            order_id.filter(|id| !id.is_empty()).map(OrderId::new),
            user_id,
            asset,
            side,
            price,
            quantity,
        ))
    }
}

/// An accepted limit order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub pair: TradingPair,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub remaining_quantity: Quantity,
    pub status: OrderStatus,
    /// Journal sequence of the placement; the time-priority key
    pub arrival: u64,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
}

impl Order {
    /// Create a new open order
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: OrderId,
        user_id: UserId,
        pair: TradingPair,
        side: Side,
        price: Price,
        quantity: Quantity,
        arrival: u64,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id,
            user_id,
            pair,
            side,
            price,
            quantity,
            filled_quantity: Quantity::zero(),
            remaining_quantity: quantity,
            status: OrderStatus::Open,
            arrival,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Check quantity invariant: filled + remaining = total
    pub fn check_invariant(&self) -> bool {
        self.filled_quantity + self.remaining_quantity == self.quantity
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity.is_zero()
    }

    /// Record a fill and advance the status.
    ///
    /// Returns false (and leaves the order untouched) if the fill exceeds the
    /// remaining quantity.
    pub fn add_fill(&mut self, fill_quantity: Quantity, timestamp: i64) -> bool {
        let Some(remaining) = self.remaining_quantity.checked_sub(fill_quantity) else {
            return false;
        };

        self.remaining_quantity = remaining;
        self.filled_quantity = self.filled_quantity + fill_quantity;
        self.status = if remaining.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.updated_at = timestamp;
        true
    }

    /// Cancel the order. Terminal orders are left as they are.
    pub fn cancel(&mut self, reason: CancelReason, timestamp: i64) {
        if self.status.is_terminal() {
            return;
        }
        self.status = OrderStatus::Cancelled(reason);
        self.updated_at = timestamp;
    }
}
