//! Balance types
//!
//! A balance is a single non-negative amount keyed by (user, asset). These
//! types describe changes to balances; the ledger itself lives with the
//! engine.

use crate::ids::{Asset, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Signed change to one (user, asset) balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub user: UserId,
    pub asset: Asset,
    pub delta: Decimal,
}

impl BalanceDelta {
    pub fn new(user: UserId, asset: Asset, delta: Decimal) -> Self {
        Self { user, asset, delta }
    }
}

/// Starting balance loaded at startup, before replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedBalance {
    pub user: UserId,
    pub asset: Asset,
    pub amount: Decimal,
}

impl SeedBalance {
    pub fn new(user: impl Into<String>, asset: impl Into<String>, amount: Decimal) -> Self {
        Self {
            user: UserId::new(user),
            asset: Asset::new(asset),
            amount,
        }
    }
}
