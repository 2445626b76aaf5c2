//! Bid (buy-side) order book
//!
//! Maintains buy orders sorted by price descending (best bid first).
//! BTreeMap keeps iteration deterministic, which replay relies on.

use std::collections::BTreeMap;
use types::errors::OrderError;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::Order;

use super::price_level::PriceLevel;

/// Bid (buy) side order book
///
/// Orders are sorted by price descending, so the highest bid is first.
/// At each price level, orders are maintained in arrival order.
#[derive(Debug, Clone)]
pub struct BidBook {
    /// Price levels, ascending in the map; the best bid is the last key
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    /// Create a new empty bid book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Insert an order into the bid book
    pub fn insert(&mut self, order: Order) {
        self.levels.entry(order.price).or_default().insert(order);
    }

    /// Remove an order from the bid book
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> Option<Order> {
        let level = self.levels.get_mut(&price)?;
        let order = level.remove(order_id)?;
        // Remove empty price levels to keep book clean
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(order)
    }

    /// Look up a resting bid by id at its price
    pub fn get(&self, order_id: &OrderId, price: Price) -> Option<&Order> {
        self.levels
            .get(&price)?
            .iter()
            .find(|o| &o.order_id == order_id)
    }

    /// Fill a resting bid; see [`PriceLevel::fill`]
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

    /// Get the best bid (highest price) and its total quantity
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        // BTreeMap iter is ascending, so we need last()
        self.levels
            .iter()
            .next_back()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    /// Get the best bid price
    pub fn best_bid_price(&self) -> Option<Price> {
        self.levels.keys().next_back().copied()
    }

    /// The bid with price-time priority
    pub fn front(&self) -> Option<&Order> {
        self.levels.values().next_back().and_then(PriceLevel::front)
    }

    /// All resting bids, best price first, then by arrival
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.levels.values().rev().flat_map(PriceLevel::iter)
    }

    /// Get depth snapshot (top N price levels)
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.levels
            .iter()
            .rev() // Reverse to get highest prices first
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    /// Check if the bid book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

impl Default for BidBook {
    fn default() -> Self {
        Self::new()
    }
}
