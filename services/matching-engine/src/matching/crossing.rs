//! Crossing detection logic
//!
//! Determines when a bid and ask can match based on price compatibility

use types::numeric::Price;

/// Check if a bid and ask can match at given prices
///
/// For a buy order to match with a sell order the buy price must be at or
/// above the sell price.
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    #[test]
    fn test_can_match_crossing() {
        assert!(can_match(price("50000"), price("49000")), "Bid >= ask should match");
    }

    #[test]
    fn test_can_match_exact() {
        assert!(can_match(price("100.50"), price("100.5")), "Equal prices should match");
    }

    #[test]
    fn test_can_match_no_cross() {
        assert!(!can_match(price("49000"), price("50000")), "Bid < ask should not match");
    }
}
