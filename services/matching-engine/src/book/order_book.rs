//! Order book for a single trading pair
//!
//! Combines the bid and ask books with an index of active order IDs. The
//! index maps each resting order to its side and price so cancels and fills
//! go straight to the right level.

use std::collections::HashMap;
use types::errors::OrderError;
use types::ids::{OrderId, TradingPair};
use types::numeric::{Price, Quantity};
use types::order::{CancelReason, Order, Side};
use types::trade::Fill;

use super::ask_book::AskBook;
use super::bid_book::BidBook;
use crate::events::{BookSnapshot, DepthSnapshot, OrderView};
use crate::matching::can_match;

#[derive(Debug, Clone)]
pub struct OrderBook {
    pair: TradingPair,
    bids: BidBook,
    asks: AskBook,
    index: HashMap<OrderId, (Side, Price)>,
}

impl OrderBook {
    pub fn new(pair: TradingPair) -> Self {
        Self {
            pair,
            bids: BidBook::new(),
            asks: AskBook::new(),
            index: HashMap::new(),
        }
    }

    pub fn pair(&self) -> &TradingPair {
        &self.pair
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        let (side, price) = self.index.get(order_id)?;
        match side {
            Side::Buy => self.bids.get(order_id, *price),
            Side::Sell => self.asks.get(order_id, *price),
        }
    }

    /// Number of resting orders
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Rest an order on its side. Fails if the ID is already active.
    pub fn insert(&mut self, order: Order) -> Result<(), OrderError> {
        if self.index.contains_key(&order.order_id) {
            return Err(OrderError::DuplicateOrder {
                order_id: order.order_id.to_string(),
            });
        }

        self.index
            .insert(order.order_id.clone(), (order.side, order.price));
        match order.side {
            Side::Buy => self.bids.insert(order),
            Side::Sell => self.asks.insert(order),
        }
        Ok(())
    }

    /// Take an order out of the book without changing its status
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        let (side, price) = self.index.remove(order_id)?;
        match side {
            Side::Buy => self.bids.remove(order_id, price),
            Side::Sell => self.asks.remove(order_id, price),
        }
    }

    /// Remove an order and mark it cancelled
    pub fn cancel(
        &mut self,
        order_id: &OrderId,
        reason: CancelReason,
        timestamp: i64,
    ) -> Result<Order, OrderError> {
        let mut order = self
            .remove(order_id)
            .ok_or_else(|| OrderError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        order.cancel(reason, timestamp);
        Ok(order)
    }

    /// The best bid and best ask, if they cross
    pub fn crossing(&self) -> Option<(&Order, &Order)> {
        let bid = self.bids.front()?;
        let ask = self.asks.front()?;
        can_match(bid.price, ask.price).then_some((bid, ask))
    }

    pub fn is_crossed(&self) -> bool {
        self.crossing().is_some()
    }

    /// Decrement both orders of a fill, removing any that are now filled.
    ///
    /// Both orders are checked before either is touched, so an invalid fill
    /// leaves the book unchanged.
    pub fn apply_fill(&mut self, fill: &Fill, timestamp: i64) -> Result<Vec<Order>, OrderError> {
        let (buy_id, sell_id) = (fill.buy_order_id(), fill.sell_order_id());
        let buy_price = self.checked_price(buy_id, Side::Buy, fill.quantity)?;
        let sell_price = self.checked_price(sell_id, Side::Sell, fill.quantity)?;

        let mut done = Vec::new();
        if let Some(order) = self.bids.fill(buy_id, buy_price, fill.quantity, timestamp)? {
            done.push(order);
        }
        if let Some(order) = self.asks.fill(sell_id, sell_price, fill.quantity, timestamp)? {
            done.push(order);
        }

        for order in &done {
            self.index.remove(&order.order_id);
        }
        Ok(done)
    }

    fn checked_price(&self, order_id: &OrderId, side: Side, quantity: Quantity) -> Result<Price, OrderError> {
        let not_found = || OrderError::OrderNotFound {
            order_id: order_id.to_string(),
        };
        let order = self.get(order_id).ok_or_else(not_found)?;
        if order.side != side {
            return Err(not_found());
        }
        if order.remaining_quantity < quantity {
            return Err(OrderError::InvalidQuantity(format!(
                "fill of {} exceeds remaining {} on {}",
                quantity, order.remaining_quantity, order_id
            )));
        }
        Ok(order.price)
    }

    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.bids.best_bid()
    }

    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.asks.best_ask()
    }

    /// Best ask minus best bid, when both sides are present
    pub fn spread(&self) -> Option<rust_decimal::Decimal> {
        let bid = self.bids.best_bid_price()?;
        let ask = self.asks.best_ask_price()?;
        Some(ask.as_decimal() - bid.as_decimal())
    }

    /// Resting bids then asks, each in priority order
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.bids.orders().chain(self.asks.orders())
    }

    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            pair: self.pair.clone(),
            bids: self.bids.orders().map(OrderView::from).collect(),
            asks: self.asks.orders().map(OrderView::from).collect(),
        }
    }

    pub fn depth(&self, levels: usize) -> DepthSnapshot {
        DepthSnapshot {
            bids: self.bids.depth_snapshot(levels),
            asks: self.asks.depth_snapshot(levels),
        }
    }
}
