//! Matching engine core
//!
//! Owns the order book, the balance ledger and the transaction log for one
//! trading pair, and sequences every mutation as validate, log, apply.
//!
//! Lock order is book, then ledger, then the log's append lock. Balance
//! adjustments skip the book lock but take the other two in the same order.

use parking_lot::{Mutex, RwLock};
use persistence::record::{CancelRecord, FillRecord, PlaceOrderRecord};
use persistence::{AppendReceipt, LogRecord, ReplayMetrics, TransactionLog};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::slice;
use types::account::{BalanceDelta, SeedBalance};
use types::errors::OrderError;
use types::ids::{Asset, OrderId, TradingPair, UserId};
use types::numeric::{Price, Quantity};
use types::order::{CancelReason, NewOrder, Order};

use crate::book::OrderBook;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{BookSnapshot, DepthSnapshot, MatchReport, PlaceOutcome};
use crate::ledger::BalanceLedger;
use crate::matching::{plan_fill, underfunded_order};
use crate::replay::ReplayCoordinator;

/// Engine lifecycle: `init` once, `replay_all` once, then serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Seeded,
    Replaying,
    Serving,
    /// A durability or replay failure; no further mutations
    Halted,
    ShutDown,
}

pub struct MatchingEngine {
    pair: TradingPair,
    book: RwLock<OrderBook>,
    ledger: BalanceLedger,
    log: TransactionLog,
    lifecycle: Mutex<Lifecycle>,
}

impl MatchingEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            book: RwLock::new(OrderBook::new(config.pair.clone())),
            pair: config.pair,
            ledger: BalanceLedger::new(),
            log: TransactionLog::new(config.journal),
            lifecycle: Mutex::new(Lifecycle::Created),
        }
    }

    pub fn pair(&self) -> &TradingPair {
        &self.pair
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Load starting balances. Must be called exactly once, before replay.
    pub fn init(&self, seed: &[SeedBalance]) -> Result<(), EngineError> {
        let mut lifecycle = self.lifecycle.lock();
        expect_state(*lifecycle, Lifecycle::Created, "init")?;

        if let Some(bad) = seed.iter().find(|s| s.amount < Decimal::ZERO) {
            return Err(EngineError::InvalidSeed {
                user: bad.user.to_string(),
                asset: bad.asset.to_string(),
                amount: bad.amount.to_string(),
            });
        }

        self.ledger.seed(seed)?;
        *lifecycle = Lifecycle::Seeded;
        tracing::info!(pair = %self.pair, balances = seed.len(), "engine seeded");
        Ok(())
    }

    /// Rebuild the book and ledger from the transaction log, then start
    /// serving. A damaged or inconsistent log halts the engine. A crossing
    /// left at the end of the log is matched before serving starts.
    pub fn replay_all(&self) -> Result<ReplayMetrics, EngineError> {
        {
            let mut lifecycle = self.lifecycle.lock();
            expect_state(*lifecycle, Lifecycle::Seeded, "replay_all")?;
            *lifecycle = Lifecycle::Replaying;
        }

        let result = {
            let mut book = self.book.write();
            let mut coordinator = ReplayCoordinator::new(&mut book, &self.ledger);
            self.log.replay_all(&mut coordinator)
        };

        let metrics = match result {
            Ok(metrics) => metrics,
            Err(e) => {
                *self.lifecycle.lock() = Lifecycle::Halted;
                tracing::error!(pair = %self.pair, error = %e, "replay failed; engine halted");
                return Err(e.into());
            }
        };

        // A crash between a placement and its fills leaves the book crossed.
        // Finish that matching before any caller gets the book lock.
        let mut book = self.book.write();
        *self.lifecycle.lock() = Lifecycle::Serving;
        let report = self.run_matching(&mut book)?;
        if !report.is_empty() {
            tracing::warn!(
                fills = report.fills.len(),
                cancelled = report.cancelled.len(),
                "resolved crossing left by an interrupted placement"
            );
        }

        tracing::info!(
            pair = %self.pair,
            entries = metrics.replay_count,
            resting_orders = book.len(),
            "engine serving"
        );
        Ok(metrics)
    }

    /// Flush the journal and stop accepting mutations
    pub fn shutdown(&self) -> Result<(), EngineError> {
        let synced = self.log.sync();
        let mut lifecycle = self.lifecycle.lock();
        if *lifecycle != Lifecycle::Halted {
            *lifecycle = Lifecycle::ShutDown;
        }
        synced?;
        tracing::info!(pair = %self.pair, "engine shut down");
        Ok(())
    }

    // ── Order Book ──────────────────────────────────────────────────

    /// Validate, log and rest an order, then match it against the book.
    ///
    /// The book write lock is held from the duplicate check until matching
    /// finishes, so no other order can interleave.
    pub fn place_order(&self, request: NewOrder) -> Result<PlaceOutcome, EngineError> {
        self.ensure_serving()?;
        let placement = self.validate(request)?;
        let order_id = placement.order_id.clone();

        let mut book = self.book.write();
        if book.contains(&order_id) {
            return Err(OrderError::DuplicateOrder {
                order_id: order_id.to_string(),
            }
            .into());
        }

        let receipt = self.append(&LogRecord::PlaceOrder(placement.clone()))?;
        let order = placement.into_order(receipt.sequence, receipt.timestamp);
        tracing::debug!(
            order_id = %order.order_id,
            user = %order.user_id,
            side = %order.side,
            price = %order.price,
            quantity = %order.quantity,
            sequence = receipt.sequence,
            "order accepted"
        );
        book.insert(order).map_err(|e| self.diverged(e))?;

        let report = self.run_matching(&mut book)?;
        let final_state = match book.get(&order_id) {
            Some(order) => order.clone(),
            None => report
                .departed(&order_id)
                .cloned()
                .ok_or_else(|| self.diverged(format!("order {} vanished during matching", order_id)))?,
        };
        Ok(PlaceOutcome::new(&final_state, report.fills))
    }

    /// Match the best bid against the best ask until they no longer cross
    pub fn match_orders(&self) -> Result<MatchReport, EngineError> {
        self.ensure_serving()?;
        let mut book = self.book.write();
        self.run_matching(&mut book)
    }

    /// Cancel a resting order at the owner's request
    pub fn cancel_order(&self, order_id: &OrderId) -> Result<Order, EngineError> {
        self.ensure_serving()?;
        let mut book = self.book.write();
        if !book.contains(order_id) {
            return Err(OrderError::OrderNotFound {
                order_id: order_id.to_string(),
            }
            .into());
        }
        let order = self.cancel_resting(&mut book, order_id, CancelReason::UserRequested)?;
        tracing::debug!(order_id = %order_id, remaining = %order.remaining_quantity, "order cancelled");
        Ok(order)
    }

    pub fn get_orders(&self) -> BookSnapshot {
        self.book.read().snapshot()
    }

    pub fn depth(&self, levels: usize) -> DepthSnapshot {
        self.book.read().depth(levels)
    }

    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.book.read().best_bid()
    }

    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.book.read().best_ask()
    }

    pub fn spread(&self) -> Option<Decimal> {
        self.book.read().spread()
    }

    // ── Balance Ledger ──────────────────────────────────────────────

    pub fn get_balance(&self, user: &str, asset: &str) -> (Decimal, bool) {
        self.ledger.get_balance(&UserId::new(user), &Asset::new(asset))
    }

    /// Log and apply a signed balance change; returns the new balance
    pub fn adjust_balance(&self, user: &str, asset: &str, delta: Decimal) -> Result<Decimal, EngineError> {
        self.ensure_serving()?;
        let delta = BalanceDelta::new(UserId::new(user), Asset::new(asset), delta);
        let deltas = slice::from_ref(&delta);

        let mut ledger = self.ledger.write();
        ledger.check(deltas)?;
        let receipt = self.append(&LogRecord::BalanceAdjust(delta.clone()))?;
        ledger.apply(deltas).map_err(|e| self.diverged(e))?;

        let balance = ledger.balance(&delta.user, &delta.asset);
        tracing::debug!(
            user = %delta.user,
            asset = %delta.asset,
            delta = %delta.delta,
            balance = %balance,
            sequence = receipt.sequence,
            "balance adjusted"
        );
        Ok(balance)
    }

    /// Sum of all balances per asset
    pub fn total_balances(&self) -> BTreeMap<Asset, Decimal> {
        self.ledger.totals()
    }

    /// SHA-256 over the resting orders (priority order) and every balance
    /// (sorted by user and asset). Equal digests mean equal engine state.
    pub fn state_digest(&self) -> String {
        let book = self.book.read();
        let mut hasher = Sha256::new();
        hasher.update(self.pair.to_string().as_bytes());

        for order in book.orders() {
            hasher.update(
                format!(
                    "\norder|{}|{}|{}|{}|{}|{}|{}|{:?}|{}|{}|{}",
                    order.order_id,
                    order.user_id,
                    order.side,
                    order.price.as_decimal().normalize(),
                    order.quantity.as_decimal().normalize(),
                    order.filled_quantity.as_decimal().normalize(),
                    order.remaining_quantity.as_decimal().normalize(),
                    order.status,
                    order.arrival,
                    order.created_at,
                    order.updated_at,
                )
                .as_bytes(),
            );
        }
        for ((user, asset), amount) in self.ledger.snapshot() {
            hasher.update(format!("\nbalance|{}|{}|{}", user, asset, amount.normalize()).as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    // ── Internals ───────────────────────────────────────────────────

    fn ensure_serving(&self) -> Result<(), EngineError> {
        match *self.lifecycle.lock() {
            Lifecycle::Serving => Ok(()),
            Lifecycle::Halted => Err(EngineError::Halted),
            other => Err(EngineError::NotServing(other)),
        }
    }

    fn validate(&self, request: NewOrder) -> Result<PlaceOrderRecord, OrderError> {
        if !self.pair.accepts(&request.asset) {
            return Err(OrderError::InvalidAsset(request.asset));
        }
        let price = Price::try_new(request.price)?;
        let quantity = Quantity::positive(request.quantity)?;
        if quantity.notional(price).is_none() {
            return Err(OrderError::InvalidQuantity(format!(
                "{} at {} overflows the quote amount",
                quantity, price
            )));
        }
        let order_id = request
            .order_id
            .filter(|id| !id.as_str().is_empty())
            .unwrap_or_else(OrderId::generate);

        Ok(PlaceOrderRecord {
            order_id,
            user_id: request.user_id,
            pair: self.pair.clone(),
            side: request.side,
            price,
            quantity,
        })
    }

    /// Append to the log, halting the engine if the write fails
    fn append(&self, record: &LogRecord) -> Result<AppendReceipt, EngineError> {
        self.log.append(record).map_err(|e| {
            self.halt();
            tracing::error!(tag = record.tag(), error = %e, "transaction log append failed; engine halted");
            EngineError::Journal(e)
        })
    }

    /// A logged record could not be applied in memory
    fn diverged(&self, cause: impl std::fmt::Display) -> EngineError {
        self.halt();
        tracing::error!(error = %cause, "state diverged from transaction log; engine halted");
        EngineError::Diverged(cause.to_string())
    }

    fn halt(&self) {
        *self.lifecycle.lock() = Lifecycle::Halted;
    }

    fn cancel_resting(
        &self,
        book: &mut OrderBook,
        order_id: &OrderId,
        reason: CancelReason,
    ) -> Result<Order, EngineError> {
        let receipt = self.append(&LogRecord::CancelOrder(CancelRecord {
            order_id: order_id.clone(),
            reason,
        }))?;
        book.cancel(order_id, reason, receipt.timestamp)
            .map_err(|e| self.diverged(e))
    }

    /// Resolve every crossing at the top of the book.
    ///
    /// Each fill is funded, logged and applied under the ledger write lock.
    /// An order whose owner cannot cover its side of a fill is cancelled with
    /// a logged `insufficient_balance` record instead, and scanning continues.
    fn run_matching(&self, book: &mut OrderBook) -> Result<MatchReport, EngineError> {
        let mut report = MatchReport::default();

        loop {
            let fill = match book.crossing() {
                Some((bid, ask)) => plan_fill(&self.pair, bid, ask),
                None => break,
            };
            // Placement bounds every order's notional, so this cannot fail
            // for orders that passed validation
            let record = FillRecord::new(fill).map_err(|e| self.diverged(e))?;

            let mut ledger = self.ledger.write();
            if let Err(shortfall) = ledger.check(&record.deltas) {
                drop(ledger);
                let victim = underfunded_order(&record.fill, &shortfall).clone();
                let cancelled = self.cancel_resting(book, &victim, CancelReason::InsufficientBalance)?;
                tracing::warn!(
                    order_id = %victim,
                    user = %cancelled.user_id,
                    reason = %shortfall,
                    "order cancelled: owner cannot cover fill"
                );
                report.cancelled.push(cancelled);
                continue;
            }

            let receipt = self.append(&LogRecord::Fill(record.clone()))?;
            let done = book
                .apply_fill(&record.fill, receipt.timestamp)
                .map_err(|e| self.diverged(e))?;
            ledger.apply(&record.deltas).map_err(|e| self.diverged(e))?;
            drop(ledger);

            tracing::debug!(
                maker = %record.fill.maker_order_id,
                taker = %record.fill.taker_order_id,
                price = %record.fill.price,
                quantity = %record.fill.quantity,
                sequence = receipt.sequence,
                "fill"
            );
            report.filled.extend(done);
            report.fills.push(record.fill);
        }

        Ok(report)
    }
}

fn expect_state(actual: Lifecycle, expected: Lifecycle, operation: &'static str) -> Result<(), EngineError> {
    if actual == expected {
        Ok(())
    } else {
        Err(EngineError::Lifecycle {
            operation,
            expected,
            actual,
        })
    }
}
