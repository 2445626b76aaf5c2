//! Trade execution logic
//!
//! Turns a crossing bid/ask pair into a fill and, when the ledger cannot
//! cover that fill, decides which of the two orders has to go.

use std::cmp;
use types::errors::BalanceError;
use types::ids::{OrderId, TradingPair};
use types::order::Order;
use types::trade::Fill;

/// Build the fill for a crossing bid and ask.
///
/// The order that arrived first is the maker and sets the execution price;
/// the fill quantity is the smaller of the two remaining quantities.
pub fn plan_fill(pair: &TradingPair, bid: &Order, ask: &Order) -> Fill {
    let (maker, taker) = if bid.arrival < ask.arrival {
        (bid, ask)
    } else {
        (ask, bid)
    };

    Fill {
        pair: pair.clone(),
        maker_order_id: maker.order_id.clone(),
        taker_order_id: taker.order_id.clone(),
        taker_side: taker.side,
        buyer: bid.user_id.clone(),
        seller: ask.user_id.clone(),
        price: maker.price,
        quantity: cmp::min(bid.remaining_quantity, ask.remaining_quantity),
    }
}

/// The order whose owner cannot take their side of `fill`.
///
/// A missing quote balance is the buyer's problem, a missing base balance the
/// seller's. This holds for self-trades too, since the two legs debit
/// different assets. A credit that would overflow blames the receiving side:
/// the seller for quote, the buyer for base.
pub fn underfunded_order<'a>(fill: &'a Fill, shortfall: &BalanceError) -> &'a OrderId {
    let quote = shortfall.asset() == fill.pair.quote.as_str();
    let blames_buyer = match shortfall {
        BalanceError::InsufficientBalance { .. } => quote,
        BalanceError::Overflow { .. } => !quote,
    };
    if blames_buyer {
        fill.buy_order_id()
    } else {
        fill.sell_order_id()
    }
}
