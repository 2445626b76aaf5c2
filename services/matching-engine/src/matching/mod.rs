//! Matching logic module
//!
//! Implements price-time priority matching: crossing detection, and the
//! fill a crossing pair produces.

pub mod crossing;
pub mod executor;

pub use crossing::can_match;
pub use executor::{plan_fill, underfunded_order};
