//! Ask (sell-side) order book
//!
//! Maintains sell orders sorted by price ascending (best ask first).

use std::collections::BTreeMap;
use types::errors::OrderError;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::Order;

use super::price_level::PriceLevel;

/// Ask (sell) side order book
///
/// Orders are sorted by price ascending, so the lowest ask is first.
/// At each price level, orders are maintained in arrival order.
#[derive(Debug, Clone)]
pub struct AskBook {
    /// Price levels sorted ascending (lowest price first)
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    /// Create a new empty ask book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Insert an order into the ask book
    pub fn insert(&mut self, order: Order) {
        self.levels.entry(order.price).or_default().insert(order);
    }

    /// Remove an order from the ask book
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> Option<Order> {
        let level = self.levels.get_mut(&price)?;
        let order = level.remove(order_id)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(order)
    }

    /// Look up a resting ask by id at its price
    pub fn get(&self, order_id: &OrderId, price: Price) -> Option<&Order> {
        self.levels
            .get(&price)?
            .iter()
            .find(|o| &o.order_id == order_id)
    }

    /// Fill a resting ask; see [`PriceLevel::fill`]
    pub(crate) fn fill(
        &mut self,
        order_id: &OrderId,
        price: Price,
        quantity: Quantity,
        timestamp: i64,
    ) -> Result<Option<Order>, OrderError> {
        let level = self.levels.get_mut(&price).ok_or_else(|| OrderError::OrderNotFound {
            order_id: order_id.to_string(),
        })?;
        let done = level.fill(order_id, quantity, timestamp)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Ok(done)
    }

    /// Get the best ask (lowest price) and its total quantity
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.levels
            .iter()
            .next()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    /// Get the best ask price
    pub fn best_ask_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// The ask with price-time priority
    pub fn front(&self) -> Option<&Order> {
        self.levels.values().next().and_then(PriceLevel::front)
    }

    /// All resting asks, best price first, then by arrival
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.levels.values().flat_map(PriceLevel::iter)
    }

    /// Get depth snapshot (top N price levels)
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.levels
            .iter()
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

impl Default for AskBook {
    fn default() -> Self {
        Self::new()
    }
}
