//! Identifier types for engine entities
//!
//! Order IDs are caller-supplied strings; when the caller leaves one out the
//! engine generates a UUID v7 so generated IDs still sort by creation time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::OrderError;

/// Unique identifier for an order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wrap a caller-supplied ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh, time-sortable ID
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier for a user (balance owner)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Asset symbol (e.g. "X", "USD")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset(String);

impl Asset {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Asset {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Trading pair identifier
///
/// Format: "BASE/QUOTE" (e.g., "X/USD"). Orders trade the base asset and are
/// priced in the quote asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingPair {
    pub base: Asset,
    pub quote: Asset,
}

impl TradingPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: Asset::new(base),
            quote: Asset::new(quote),
        }
    }

    /// Try to parse a "BASE/QUOTE" symbol, returning None if invalid
    pub fn try_new(symbol: &str) -> Option<Self> {
        let (base, quote) = symbol.split_once('/')?;
        if base.is_empty() || quote.is_empty() || quote.contains('/') || base == quote {
            return None;
        }
        Some(Self::new(base, quote))
    }

    /// Check whether an order's asset field refers to this pair.
    ///
    /// Accepts either the base asset ("X") or the full symbol ("X/USD").
    pub fn accepts(&self, asset: &str) -> bool {
        asset == self.base.as_str() || asset == self.to_string()
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s).ok_or_else(|| OrderError::InvalidAsset(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_order_ids_unique() {
        let id1 = OrderId::generate();
        let id2 = OrderId::generate();
        assert_ne!(id1, id2, "OrderIds should be unique");
    }

    #[test]
    fn test_order_id_serialization() {
        let id = OrderId::new("ord-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ord-1\"");
        let deserialized: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_trading_pair_parse() {
        let pair: TradingPair = "X/USD".parse().unwrap();
        assert_eq!(pair.base, Asset::new("X"));
        assert_eq!(pair.quote, Asset::new("USD"));
        assert_eq!(pair.to_string(), "X/USD");
    }

    #[test]
    fn test_trading_pair_try_new_rejects_malformed() {
        assert!(TradingPair::try_new("INVALID").is_none());
        assert!(TradingPair::try_new("/USD").is_none());
        assert!(TradingPair::try_new("X/").is_none());
        assert!(TradingPair::try_new("X/Y/Z").is_none());
        assert!(TradingPair::try_new("X/X").is_none());
    }

    #[test]
    fn test_trading_pair_accepts() {
        let pair = TradingPair::new("X", "USD");
        assert!(pair.accepts("X"));
        assert!(pair.accepts("X/USD"));
        assert!(!pair.accepts("USD"));
        assert!(!pair.accepts("Y"));
    }
}
