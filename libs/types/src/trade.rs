//! Fill (trade execution) types
//!
//! A fill is one execution between a resting (maker) order and the incoming
//! (taker) order. It always executes at the maker's price.

use crate::account::BalanceDelta;
use crate::errors::BalanceError;
use crate::ids::{OrderId, TradingPair, UserId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use serde::{Deserialize, Serialize};

/// One execution between two orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub pair: TradingPair,

    // Order references
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    /// Side of the incoming order
    pub taker_side: Side,

    // Counterparties
    pub buyer: UserId,
    pub seller: UserId,

    pub price: Price,
    pub quantity: Quantity,
}

impl Fill {
    /// The buy-side order of this fill
    pub fn buy_order_id(&self) -> &OrderId {
        match self.taker_side {
            Side::Buy => &self.taker_order_id,
            Side::Sell => &self.maker_order_id,
        }
    }

    /// The sell-side order of this fill
    pub fn sell_order_id(&self) -> &OrderId {
        match self.taker_side {
            Side::Buy => &self.maker_order_id,
            Side::Sell => &self.taker_order_id,
        }
    }

    /// Balance changes implied by this fill.
    ///
    /// Buyer: +quantity base, -quantity*price quote. Seller: the inverse.
    /// Debits come first so a ledger applying them in order checks the
    /// tighter constraints before crediting.
    ///
    /// Fails when `quantity * price` does not fit in a `Decimal`.
    pub fn balance_deltas(&self) -> Result<Vec<BalanceDelta>, BalanceError> {
        let base = self.quantity.as_decimal();
        let quote = self.quantity.notional(self.price).ok_or_else(|| BalanceError::Overflow {
            user: self.buyer.to_string(),
            asset: self.pair.quote.to_string(),
        })?;

        Ok(vec![
            BalanceDelta::new(self.buyer.clone(), self.pair.quote.clone(), -quote),
            BalanceDelta::new(self.seller.clone(), self.pair.base.clone(), -base),
            BalanceDelta::new(self.buyer.clone(), self.pair.base.clone(), base),
            BalanceDelta::new(self.seller.clone(), self.pair.quote.clone(), quote),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn sample_fill() -> Fill {
        Fill {
            pair: TradingPair::new("X", "USD"),
            maker_order_id: OrderId::new("s-1"),
            taker_order_id: OrderId::new("b-1"),
            taker_side: Side::Buy,
            buyer: UserId::new("B"),
            seller: UserId::new("A"),
            price: "100".parse().unwrap(),
            quantity: "5".parse().unwrap(),
        }
    }

    #[test]
    fn test_deltas_conserve_each_asset() {
        let deltas = sample_fill().balance_deltas().unwrap();
        assert_eq!(deltas.len(), 4);

        for asset in ["X", "USD"] {
            let net: Decimal = deltas
                .iter()
                .filter(|d| d.asset.as_str() == asset)
                .map(|d| d.delta)
                .sum();
            assert_eq!(net, Decimal::ZERO, "asset {} not conserved", asset);
        }
    }

    #[test]
    fn test_buyer_pays_quote_at_fill_price() {
        let deltas = sample_fill().balance_deltas().unwrap();
        let buyer_quote = deltas
            .iter()
            .find(|d| d.user.as_str() == "B" && d.asset.as_str() == "USD")
            .unwrap();
        assert_eq!(buyer_quote.delta, Decimal::from(-500));
    }

    #[test]
    fn test_order_ids_by_side() {
        let mut fill = sample_fill();
        assert_eq!(fill.buy_order_id().as_str(), "b-1");
        assert_eq!(fill.sell_order_id().as_str(), "s-1");

        fill.taker_side = Side::Sell;
        assert_eq!(fill.buy_order_id().as_str(), "s-1");
        assert_eq!(fill.sell_order_id().as_str(), "b-1");
    }

    #[test]
    fn test_unrepresentable_notional_rejected() {
        let mut fill = sample_fill();
        fill.price = "10000000000000000".parse().unwrap();
        fill.quantity = "10000000000000000".parse().unwrap();
        assert_eq!(
            fill.balance_deltas(),
            Err(BalanceError::Overflow {
                user: "B".into(),
                asset: "USD".into(),
            })
        );
    }
}
