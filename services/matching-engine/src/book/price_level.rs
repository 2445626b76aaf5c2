//! Price level implementation with FIFO queue
//!
//! A price level contains all resting orders at one price. Orders are kept
//! in arrival order, so the front of the queue always has time priority.

use std::collections::VecDeque;
use types::errors::OrderError;
use types::ids::OrderId;
use types::numeric::Quantity;
use types::order::Order;

/// A price level containing orders at a specific price
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// Queue of orders at this price level (FIFO order)
    orders: VecDeque<Order>,
    /// Total remaining quantity at this level
    total_quantity: Quantity,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Insert an order, keeping the queue sorted by arrival.
    ///
    /// New orders always carry the highest arrival so far and go to the back;
    /// the scan only matters if an older order is re-inserted.
    pub fn insert(&mut self, order: Order) {
        self.total_quantity = self.total_quantity.saturating_add(order.remaining_quantity);
        let position = self
            .orders
            .iter()
            .rposition(|o| o.arrival < order.arrival)
            .map_or(0, |p| p + 1);
        self.orders.insert(position, order);
    }

    /// Remove an order from the queue by OrderId
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        let position = self.orders.iter().position(|o| &o.order_id == order_id)?;
        let order = self.orders.remove(position)?;
        self.subtract_total(order.remaining_quantity);
        Some(order)
    }

    /// Peek at the order with time priority
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Apply a fill to a resting order.
    ///
    /// Returns `Some(order)` if the order is now filled and has been removed
    /// from the level, `None` if it keeps resting.
    pub fn fill(&mut self, order_id: &OrderId, quantity: Quantity, timestamp: i64) -> Result<Option<Order>, OrderError> {
        let position = self
            .orders
            .iter()
            .position(|o| &o.order_id == order_id)
            .ok_or_else(|| OrderError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        let order = &mut self.orders[position];
        if !order.add_fill(quantity, timestamp) {
            return Err(OrderError::InvalidQuantity(format!(
                "fill of {} exceeds remaining {} of order {}",
                quantity, order.remaining_quantity, order_id
            )));
        }
        let filled = order.is_filled();
        self.subtract_total(quantity);

        if filled {
            Ok(self.orders.remove(position))
        } else {
            Ok(None)
        }
    }

    /// Orders in time priority
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    fn subtract_total(&mut self, quantity: Quantity) {
        self.total_quantity = self
            .total_quantity
            .checked_sub(quantity)
            .unwrap_or_else(Quantity::zero);
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}
