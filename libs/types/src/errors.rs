//! Error types shared by the order book and the balance ledger
//!
//! Every variant here is recoverable: it is returned to the caller, never
//! logged to the journal, and leaves engine state untouched.

use thiserror::Error;

/// Order validation and lookup errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Invalid side: {0}")]
    InvalidSide(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    #[error("Duplicate order: {order_id} is already active")]
    DuplicateOrder { order_id: String },

    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },
}

/// Balance ledger errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BalanceError {
    #[error("Insufficient balance for {user} in asset {asset}: required {required}, available {available}")]
    InsufficientBalance {
        user: String,
        asset: String,
        required: String,
        available: String,
    },

    #[error("Balance overflow for {user} in asset {asset}")]
    Overflow { user: String, asset: String },
}

impl BalanceError {
    /// Asset whose balance the operation could not move
    pub fn asset(&self) -> &str {
        match self {
            BalanceError::InsufficientBalance { asset, .. } | BalanceError::Overflow { asset, .. } => asset,
        }
    }
}
