//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use matching_engine::{EngineConfig, MatchingEngine};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use types::account::SeedBalance;
use types::ids::{OrderId, TradingPair};
use types::order::{NewOrder, Side};

pub fn pair() -> TradingPair {
    TradingPair::new("X", "USD")
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Seeded and replayed engine over `dir`
pub fn start(dir: &Path, seed: &[SeedBalance]) -> MatchingEngine {
    let engine = MatchingEngine::new(EngineConfig::new(pair(), dir));
    engine.init(seed).unwrap();
    engine.replay_all().unwrap();
    engine
}

pub fn limit(id: &str, user: &str, side: Side, price: &str, qty: &str) -> NewOrder {
    NewOrder::new(Some(OrderId::new(id)), user, "X", side, dec(price), dec(qty))
}

pub fn sell(id: &str, user: &str, price: &str, qty: &str) -> NewOrder {
    limit(id, user, Side::Sell, price, qty)
}

pub fn buy(id: &str, user: &str, price: &str, qty: &str) -> NewOrder {
    limit(id, user, Side::Buy, price, qty)
}

/// A holds 10 X, B holds 1000 USD
pub fn scenario_seed() -> Vec<SeedBalance> {
    vec![
        SeedBalance::new("A", "X", Decimal::from(10)),
        SeedBalance::new("B", "USD", Decimal::from(1000)),
    ]
}
