//! Results reported back to engine callers
//!
//! Snapshots are owned copies taken under the book read lock, so callers can
//! hold them without blocking matching.

use serde::Serialize;
use types::ids::{OrderId, TradingPair, UserId};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderStatus, Side};
use types::trade::Fill;

/// One resting order as seen by `get_orders`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub remaining_quantity: Quantity,
    pub status: OrderStatus,
    pub arrival: u64,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id.clone(),
            user_id: order.user_id.clone(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            filled_quantity: order.filled_quantity,
            remaining_quantity: order.remaining_quantity,
            status: order.status,
            arrival: order.arrival,
        }
    }
}

/// Both sides of the book in priority order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookSnapshot {
    pub pair: TradingPair,
    /// Highest price first, then earliest arrival
    pub bids: Vec<OrderView>,
    /// Lowest price first, then earliest arrival
    pub asks: Vec<OrderView>,
}

impl BookSnapshot {
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn find(&self, order_id: &OrderId) -> Option<&OrderView> {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .find(|o| &o.order_id == order_id)
    }
}

/// Aggregated quantity per price level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthSnapshot {
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}

/// Everything one matching pass changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    pub fills: Vec<Fill>,
    /// Orders that left the book fully filled
    pub filled: Vec<Order>,
    /// Orders the engine cancelled because their owner could not cover a fill
    pub cancelled: Vec<Order>,
}

impl MatchReport {
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty() && self.cancelled.is_empty()
    }

    /// Final state of an order that left the book during this pass
    pub fn departed(&self, order_id: &OrderId) -> Option<&Order> {
        self.filled
            .iter()
            .chain(self.cancelled.iter())
            .find(|o| &o.order_id == order_id)
    }
}

/// Result of a successful `place_order`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceOutcome {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub filled_quantity: Quantity,
    pub remaining_quantity: Quantity,
    /// Fills the order took part in, in execution order
    pub fills: Vec<Fill>,
}

impl PlaceOutcome {
    pub(crate) fn new(order: &Order, fills: Vec<Fill>) -> Self {
        Self {
            order_id: order.order_id.clone(),
            status: order.status,
            filled_quantity: order.filled_quantity,
            remaining_quantity: order.remaining_quantity,
            fills,
        }
    }
}
