//! Replay Coordinator
//!
//! Feeds logged records back into the order book and ledger through the same
//! apply paths the engine uses at runtime, minus logging and matching. Every
//! match outcome is already in the log as `fill` and `cancel_order` records,
//! so replay never re-runs the balance checks that decided them.

use persistence::record::{CancelRecord, FillRecord, PlaceOrderRecord};
use persistence::{EntryMeta, RecordApplier};
use std::slice;
use thiserror::Error;
use types::account::BalanceDelta;
use types::errors::{BalanceError, OrderError};
use types::ids::TradingPair;
use types::numeric::{Price, Quantity};

use crate::book::OrderBook;
use crate::ledger::BalanceLedger;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Record for pair {found} in a journal for {expected}")]
    WrongPair { expected: String, found: String },

    #[error("Fill of {maker_order_id}/{taker_order_id} carries deltas that do not match its price and quantity")]
    FillDeltaMismatch {
        maker_order_id: String,
        taker_order_id: String,
    },

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Balance(#[from] BalanceError),
}

pub struct ReplayCoordinator<'a> {
    book: &'a mut OrderBook,
    ledger: &'a BalanceLedger,
}

impl<'a> ReplayCoordinator<'a> {
    pub fn new(book: &'a mut OrderBook, ledger: &'a BalanceLedger) -> Self {
        Self { book, ledger }
    }

    fn check_pair(&self, pair: &TradingPair) -> Result<(), ReplayError> {
        if pair != self.book.pair() {
            return Err(ReplayError::WrongPair {
                expected: self.book.pair().to_string(),
                found: pair.to_string(),
            });
        }
        Ok(())
    }
}

impl RecordApplier for ReplayCoordinator<'_> {
    type Error = ReplayError;

    fn apply_place_order(&mut self, meta: EntryMeta, record: PlaceOrderRecord) -> Result<(), ReplayError> {
        self.check_pair(&record.pair)?;
        validate_placement(&record)?;
        let order = record.into_order(meta.sequence, meta.timestamp);
        self.book.insert(order)?;
        Ok(())
    }

    fn apply_fill(&mut self, meta: EntryMeta, record: FillRecord) -> Result<(), ReplayError> {
        self.check_pair(&record.fill.pair)?;
        if record.fill.quantity.is_zero() {
            return Err(OrderError::InvalidQuantity(record.fill.quantity.to_string()).into());
        }
        if record.deltas != record.fill.balance_deltas()? {
            return Err(ReplayError::FillDeltaMismatch {
                maker_order_id: record.fill.maker_order_id.to_string(),
                taker_order_id: record.fill.taker_order_id.to_string(),
            });
        }

        self.book.apply_fill(&record.fill, meta.timestamp)?;
        self.ledger.apply(&record.deltas)?;
        Ok(())
    }

    fn apply_cancel(&mut self, meta: EntryMeta, record: CancelRecord) -> Result<(), ReplayError> {
        self.book
            .cancel(&record.order_id, record.reason, meta.timestamp)?;
        Ok(())
    }

    fn apply_balance_adjust(&mut self, _meta: EntryMeta, delta: BalanceDelta) -> Result<(), ReplayError> {
        self.ledger.apply(slice::from_ref(&delta))?;
        Ok(())
    }
}

/// Apply the submission checks again. Decoding a `Price` or `Quantity`
/// skips its constructor, so a well-framed record can still carry values the
/// engine would never have accepted.
fn validate_placement(record: &PlaceOrderRecord) -> Result<(), OrderError> {
    Price::try_new(record.price.as_decimal())?;
    Quantity::positive(record.quantity.as_decimal())?;
    if record.quantity.notional(record.price).is_none() {
        return Err(OrderError::InvalidQuantity(format!(
            "{} at {} overflows the quote amount",
            record.quantity, record.price
        )));
    }
    Ok(())
}
