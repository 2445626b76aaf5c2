//! Typed log records
//!
//! Each record kind maps to one journal tag. Payloads are bincode-encoded and
//! carry everything needed to replay the effect without consulting other
//! state: user IDs, assets and signed deltas are spelled out rather than
//! derived at replay time.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use types::account::BalanceDelta;
use types::errors::BalanceError;
use types::ids::{OrderId, TradingPair, UserId};
use types::numeric::{Price, Quantity};
use types::order::{CancelReason, Order, Side};
use types::trade::Fill;

use crate::journal::JournalError;

pub const TAG_PLACE_ORDER: &str = "place_order";
pub const TAG_FILL: &str = "fill";
pub const TAG_CANCEL_ORDER: &str = "cancel_order";
pub const TAG_BALANCE_ADJUST: &str = "balance_adjust";

/// An accepted order placement. Arrival order and creation time come from
/// the journal entry's sequence and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderRecord {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub pair: TradingPair,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

impl PlaceOrderRecord {
    /// The resting order this placement creates, with `arrival` set to the
    /// entry's sequence number.
    pub fn into_order(self, arrival: u64, timestamp: i64) -> Order {
        Order::new(
            self.order_id,
            self.user_id,
            self.pair,
            self.side,
            self.price,
            self.quantity,
            arrival,
            timestamp,
        )
    }
}

/// One execution and the balance changes it caused, applied atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    pub fill: Fill,
    pub deltas: Vec<BalanceDelta>,
}

impl FillRecord {
    pub fn new(fill: Fill) -> Result<Self, BalanceError> {
        let deltas = fill.balance_deltas()?;
        Ok(Self { fill, deltas })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelRecord {
    pub order_id: OrderId,
    pub reason: CancelReason,
}

/// Every state-changing operation the engine persists
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    PlaceOrder(PlaceOrderRecord),
    Fill(FillRecord),
    CancelOrder(CancelRecord),
    BalanceAdjust(BalanceDelta),
}

impl LogRecord {
    pub fn tag(&self) -> &'static str {
        match self {
            LogRecord::PlaceOrder(_) => TAG_PLACE_ORDER,
            LogRecord::Fill(_) => TAG_FILL,
            LogRecord::CancelOrder(_) => TAG_CANCEL_ORDER,
            LogRecord::BalanceAdjust(_) => TAG_BALANCE_ADJUST,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, JournalError> {
        match self {
            LogRecord::PlaceOrder(r) => encode_payload(r),
            LogRecord::Fill(r) => encode_payload(r),
            LogRecord::CancelOrder(r) => encode_payload(r),
            LogRecord::BalanceAdjust(r) => encode_payload(r),
        }
    }

    pub fn decode(tag: &str, payload: &[u8]) -> Result<Self, JournalError> {
        match tag {
            TAG_PLACE_ORDER => decode_payload(payload).map(LogRecord::PlaceOrder),
            TAG_FILL => decode_payload(payload).map(LogRecord::Fill),
            TAG_CANCEL_ORDER => decode_payload(payload).map(LogRecord::CancelOrder),
            TAG_BALANCE_ADJUST => decode_payload(payload).map(LogRecord::BalanceAdjust),
            other => Err(JournalError::Serialization(format!(
                "unknown record tag: {:?}",
                other
            ))),
        }
    }
}

fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, JournalError> {
    bincode::serialize(value).map_err(|e| JournalError::Serialization(e.to_string()))
}

fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, JournalError> {
    bincode::deserialize(payload).map_err(|e| JournalError::Serialization(e.to_string()))
}
