//! Matching Engine Service
//!
//! Single-pair limit order matching with durable replay. Orders match under
//! price-time priority at the resting order's price; every accepted mutation
//! is written to the transaction log before it touches memory, and replaying
//! that log from an empty book and the seeded balances rebuilds the exact
//! pre-crash state.
//!
//! **Key Invariants:**
//! - Price-time priority strictly enforced
//! - No crossed book at rest
//! - Balances never go negative; each fill conserves every asset
//! - Replay reproduces the book and ledger exactly

pub mod book;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod matching;
pub mod replay;

pub use config::{load_seed, EngineConfig};
pub use engine::{Lifecycle, MatchingEngine};
pub use error::EngineError;
pub use events::{BookSnapshot, DepthSnapshot, MatchReport, OrderView, PlaceOutcome};
