//! Balance Ledger
//!
//! Per-user, per-asset available balances behind one read/write lock.
//! Balances never go negative: every batch of deltas is checked as a whole
//! and either applied completely or not at all.
//!
//! The ledger does no logging of its own. Callers that need a durable record
//! take the write guard, check, append to the transaction log, then apply,
//! all without releasing the guard.

use parking_lot::{RwLock, RwLockWriteGuard};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use types::account::{BalanceDelta, SeedBalance};
use types::errors::BalanceError;
use types::ids::{Asset, UserId};

type BalanceKey = (UserId, Asset);

#[derive(Debug, Default)]
pub struct BalanceLedger {
    balances: RwLock<HashMap<BalanceKey, Decimal>>,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load starting balances. Repeated (user, asset) entries add up.
    ///
    /// Nothing is loaded if any sum overflows.
    pub fn seed(&self, seeds: &[SeedBalance]) -> Result<(), BalanceError> {
        let deltas: Vec<BalanceDelta> = seeds
            .iter()
            .map(|s| BalanceDelta::new(s.user.clone(), s.asset.clone(), s.amount))
            .collect();
        self.apply(&deltas)
    }

    /// Current balance, and whether the (user, asset) pair has ever been
    /// referenced.
    pub fn get_balance(&self, user: &UserId, asset: &Asset) -> (Decimal, bool) {
        let key = (user.clone(), asset.clone());
        match self.balances.read().get(&key) {
            Some(amount) => (*amount, true),
            None => (Decimal::ZERO, false),
        }
    }

    pub fn write(&self) -> LedgerWriteGuard<'_> {
        LedgerWriteGuard {
            balances: self.balances.write(),
        }
    }

    /// Check and apply a batch in one step
    pub fn apply(&self, deltas: &[BalanceDelta]) -> Result<(), BalanceError> {
        self.write().apply(deltas)
    }

    /// Every balance, sorted by (user, asset)
    pub fn snapshot(&self) -> BTreeMap<BalanceKey, Decimal> {
        self.balances
            .read()
            .iter()
            .map(|(key, amount)| (key.clone(), *amount))
            .collect()
    }

    /// Sum of all balances per asset, clamped at `Decimal::MAX`
    pub fn totals(&self) -> BTreeMap<Asset, Decimal> {
        let mut totals = BTreeMap::new();
        for ((_, asset), amount) in self.balances.read().iter() {
            let total = totals.entry(asset.clone()).or_insert(Decimal::ZERO);
            *total = amount.saturating_add(*total);
        }
        totals
    }
}

/// Exclusive access to the ledger across a check, log and apply sequence
pub struct LedgerWriteGuard<'a> {
    balances: RwLockWriteGuard<'a, HashMap<BalanceKey, Decimal>>,
}

impl LedgerWriteGuard<'_> {
    pub fn balance(&self, user: &UserId, asset: &Asset) -> Decimal {
        self.balances
            .get(&(user.clone(), asset.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Verify that applying `deltas` in order keeps every balance
    /// non-negative at each step.
    pub fn check(&self, deltas: &[BalanceDelta]) -> Result<(), BalanceError> {
        self.resulting_balances(deltas).map(|_| ())
    }

    /// Apply all deltas, or none if any balance would go negative
    pub fn apply(&mut self, deltas: &[BalanceDelta]) -> Result<(), BalanceError> {
        let updated = self.resulting_balances(deltas)?;
        self.balances.extend(updated);
        Ok(())
    }

    fn resulting_balances(&self, deltas: &[BalanceDelta]) -> Result<HashMap<BalanceKey, Decimal>, BalanceError> {
        let mut running: HashMap<BalanceKey, Decimal> = HashMap::new();
        for d in deltas {
            let key = (d.user.clone(), d.asset.clone());
            let current = match running.get(&key) {
                Some(amount) => *amount,
                None => self.balances.get(&key).copied().unwrap_or(Decimal::ZERO),
            };
            let next = current.checked_add(d.delta).ok_or_else(|| BalanceError::Overflow {
                user: d.user.to_string(),
                asset: d.asset.to_string(),
            })?;
            if next < Decimal::ZERO {
                return Err(BalanceError::InsufficientBalance {
                    user: d.user.to_string(),
                    asset: d.asset.to_string(),
                    required: (-d.delta).normalize().to_string(),
                    available: current.normalize().to_string(),
                });
            }
            running.insert(key, next);
        }
        Ok(running)
    }
}
