//! Engine error taxonomy
//!
//! Validation and balance errors are recoverable and leave state untouched.
//! Journal errors halt the engine; replay errors keep it from starting.

use persistence::{JournalError, RecoveryError};
use thiserror::Error;
use types::errors::{BalanceError, OrderError};

use crate::engine::Lifecycle;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error("Durability failure: {0}")]
    Journal(#[from] JournalError),

    #[error("Replay failed: {0}")]
    Replay(#[from] RecoveryError),

    #[error("Engine halted after a durability failure")]
    Halted,

    #[error("Engine is not serving requests (state: {0:?})")]
    NotServing(Lifecycle),

    #[error("{operation} requires the engine to be {expected:?}, but it is {actual:?}")]
    Lifecycle {
        operation: &'static str,
        expected: Lifecycle,
        actual: Lifecycle,
    },

    #[error("Invalid seed balance for {user} in {asset}: {amount}")]
    InvalidSeed {
        user: String,
        asset: String,
        amount: String,
    },

    #[error("In-memory state diverged from the transaction log: {0}")]
    Diverged(String),
}

impl EngineError {
    /// Errors after which the engine accepts no further mutations
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Journal(_) | EngineError::Replay(_) | EngineError::Halted | EngineError::Diverged(_)
        )
    }
}
