//! Types library for the matching engine
//!
//! Core type definitions shared by the order book, the balance ledger and the
//! transaction log. Everything here is plain data: no locks, no I/O.
//!
//! # Modules
//! - `ids`: Identifiers (OrderId, UserId, Asset, TradingPair)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `order`: Order lifecycle types
//! - `trade`: Fill (execution) types
//! - `account`: Balance deltas and seed balances
//! - `clock`: Monotonic logical timestamps
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;
pub mod account;
pub mod clock;
pub mod errors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::account::*;
    pub use crate::clock::*;
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::trade::*;
}
