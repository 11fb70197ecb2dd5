//! Atomic economic ledger.
//!
//! Accounts are keyed by `(player, scope)` and hold three currency buckets
//! (wallet, bank, chips) plus an item inventory and asset holdings. All
//! balances are unsigned, so a negative balance is unrepresentable; the only
//! thing to enforce is that every debit is a single conditional decrement.
//!
//! Concurrency model: one `DashMap` entry guard per account. Check and
//! mutation always happen under the same guard, never as a read followed by
//! a separate write. Cross-account operations (transfers) take the two
//! guards strictly one at a time and compensate on late failure instead of
//! holding both.

use crate::errors::{EngineError, EngineResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One account per player per scope (a guild, a shard, a test bench).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId {
    pub player: String,
    pub scope: String,
}

impl AccountId {
    pub fn new(player: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            scope: scope.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Wallet,
    Bank,
    Chips,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Wallet => "wallet",
            Bucket::Bank => "bank",
            Bucket::Chips => "chips",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    pub wallet: u64,
    pub bank: u64,
    pub chips: u64,
    /// Item name -> owned quantity. Entries are removed at zero.
    pub inventory: HashMap<String, u64>,
    /// Asset ticker -> owned units. Entries are removed at zero.
    pub holdings: HashMap<String, u64>,
}

impl Account {
    fn bucket_mut(&mut self, bucket: Bucket) -> &mut u64 {
        match bucket {
            Bucket::Wallet => &mut self.wallet,
            Bucket::Bank => &mut self.bank,
            Bucket::Chips => &mut self.chips,
        }
    }

    pub fn bucket(&self, bucket: Bucket) -> u64 {
        match bucket {
            Bucket::Wallet => self.wallet,
            Bucket::Bank => self.bank,
            Bucket::Chips => self.chips,
        }
    }
}

/// Read-only account state returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub wallet: u64,
    pub bank: u64,
    pub chips: u64,
    pub inventory: HashMap<String, u64>,
    pub holdings: HashMap<String, u64>,
}

/// In-process account store. Accounts are created lazily on first reference
/// and never deleted.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: DashMap<AccountId, Account>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance of one bucket; zero for an account never seen.
    pub fn balance(&self, id: &AccountId, bucket: Bucket) -> u64 {
        self.accounts
            .get(id)
            .map(|account| account.bucket(bucket))
            .unwrap_or(0)
    }

    /// Full snapshot, creating the account if this is its first reference.
    pub fn snapshot(&self, id: &AccountId) -> AccountSnapshot {
        let account = self.accounts.entry(id.clone()).or_default();
        AccountSnapshot {
            id: id.clone(),
            wallet: account.wallet,
            bank: account.bank,
            chips: account.chips,
            inventory: account.inventory.clone(),
            holdings: account.holdings.clone(),
        }
    }

    /// Conditionally debit `amount` from one bucket. The check and the
    /// decrement run under the account's entry guard, so a concurrent
    /// reserve can never drive the balance negative.
    pub fn reserve(&self, id: &AccountId, bucket: Bucket, amount: u64) -> EngineResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let mut account = self.accounts.entry(id.clone()).or_default();
        let balance = account.bucket_mut(bucket);
        if *balance < amount {
            return Err(EngineError::InsufficientFunds(format!(
                "{} has {}, need {}",
                bucket.as_str(),
                *balance,
                amount
            )));
        }
        *balance -= amount;
        debug!(player = %id.player, bucket = bucket.as_str(), amount, "reserved");
        Ok(())
    }

    /// Unconditionally credit one bucket. Zero is a no-op. Overflow aborts
    /// with `StorageFailure` and leaves the balance untouched.
    pub fn credit(&self, id: &AccountId, bucket: Bucket, amount: u64) -> EngineResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let mut account = self.accounts.entry(id.clone()).or_default();
        let balance = account.bucket_mut(bucket);
        *balance = balance.checked_add(amount).ok_or_else(|| {
            EngineError::StorageFailure(format!("{} balance overflow", bucket.as_str()))
        })?;
        debug!(player = %id.player, bucket = bucket.as_str(), amount, "credited");
        Ok(())
    }

    /// Move `amount` between two buckets of the same account, atomically
    /// under the account's guard.
    pub fn move_between_buckets(
        &self,
        id: &AccountId,
        from: Bucket,
        to: Bucket,
        amount: u64,
    ) -> EngineResult<()> {
        if from == to || amount == 0 {
            return Ok(());
        }
        let mut account = self.accounts.entry(id.clone()).or_default();
        let source = account.bucket_mut(from);
        if *source < amount {
            return Err(EngineError::InsufficientFunds(format!(
                "{} has {}, need {}",
                from.as_str(),
                *source,
                amount
            )));
        }
        *source -= amount;
        let target = account.bucket_mut(to);
        match target.checked_add(amount) {
            Some(next) => *target = next,
            None => {
                // roll the debit back before surfacing
                *account.bucket_mut(from) += amount;
                return Err(EngineError::StorageFailure(format!(
                    "{} balance overflow",
                    to.as_str()
                )));
            }
        }
        debug!(player = %id.player, from = from.as_str(), to = to.as_str(), amount, "moved");
        Ok(())
    }

    /// Debit the sender, then credit the receiver `amount - fee`. The two
    /// guards are never held together; if the receiving credit fails the
    /// sender is made whole by a compensating credit.
    pub fn transfer(
        &self,
        from: &AccountId,
        from_bucket: Bucket,
        to: &AccountId,
        to_bucket: Bucket,
        amount: u64,
        fee: u64,
    ) -> EngineResult<()> {
        if fee > amount {
            return Err(EngineError::StorageFailure(
                "transfer fee exceeds amount".into(),
            ));
        }
        self.reserve(from, from_bucket, amount)?;
        if let Err(e) = self.credit(to, to_bucket, amount - fee) {
            // compensation cannot itself overflow: the amount just left
            let _ = self.credit(from, from_bucket, amount);
            return Err(e);
        }
        debug!(
            from = %from.player, to = %to.player, amount, fee,
            "transfer settled"
        );
        Ok(())
    }

    /// Add items to an inventory.
    pub fn credit_item(&self, id: &AccountId, item: &str, qty: u64) -> EngineResult<()> {
        if qty == 0 {
            return Ok(());
        }
        let mut account = self.accounts.entry(id.clone()).or_default();
        let owned = account.inventory.entry(item.to_string()).or_insert(0);
        *owned = owned
            .checked_add(qty)
            .ok_or_else(|| EngineError::StorageFailure("inventory overflow".into()))?;
        Ok(())
    }

    /// Conditionally remove items from an inventory.
    pub fn debit_item(&self, id: &AccountId, item: &str, qty: u64) -> EngineResult<()> {
        if qty == 0 {
            return Ok(());
        }
        let mut account = self.accounts.entry(id.clone()).or_default();
        match account.inventory.get_mut(item) {
            Some(owned) if *owned >= qty => {
                *owned -= qty;
                if *owned == 0 {
                    account.inventory.remove(item);
                }
                Ok(())
            }
            Some(owned) => Err(EngineError::InsufficientFunds(format!(
                "own {} of {}, need {}",
                owned, item, qty
            ))),
            None => Err(EngineError::InsufficientFunds(format!(
                "own 0 of {}, need {}",
                item, qty
            ))),
        }
    }

    /// Add asset units to holdings.
    pub fn credit_holding(&self, id: &AccountId, ticker: &str, units: u64) -> EngineResult<()> {
        if units == 0 {
            return Ok(());
        }
        let mut account = self.accounts.entry(id.clone()).or_default();
        let held = account.holdings.entry(ticker.to_string()).or_insert(0);
        *held = held
            .checked_add(units)
            .ok_or_else(|| EngineError::StorageFailure("holdings overflow".into()))?;
        Ok(())
    }

    /// Conditionally remove asset units from holdings.
    pub fn debit_holding(&self, id: &AccountId, ticker: &str, units: u64) -> EngineResult<()> {
        if units == 0 {
            return Ok(());
        }
        let mut account = self.accounts.entry(id.clone()).or_default();
        match account.holdings.get_mut(ticker) {
            Some(held) if *held >= units => {
                *held -= units;
                if *held == 0 {
                    account.holdings.remove(ticker);
                }
                Ok(())
            }
            Some(held) => Err(EngineError::InsufficientFunds(format!(
                "hold {} {}, need {}",
                held, ticker, units
            ))),
            None => Err(EngineError::InsufficientFunds(format!(
                "hold 0 {}, need {}",
                ticker, units
            ))),
        }
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn funded(ledger: &Ledger, player: &str, wallet: u64, chips: u64) -> AccountId {
        let id = AccountId::new(player, "bench");
        ledger.credit(&id, Bucket::Wallet, wallet).unwrap();
        ledger.credit(&id, Bucket::Chips, chips).unwrap();
        id
    }

    #[test]
    fn test_reserve_rejects_without_side_effect() {
        let ledger = Ledger::new();
        let id = funded(&ledger, "ana", 100, 0);

        let err = ledger.reserve(&id, Bucket::Wallet, 101).unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(ledger.balance(&id, Bucket::Wallet), 100);

        ledger.reserve(&id, Bucket::Wallet, 100).unwrap();
        assert_eq!(ledger.balance(&id, Bucket::Wallet), 0);
    }

    #[test]
    fn test_unknown_account_reads_as_zero() {
        let ledger = Ledger::new();
        let id = AccountId::new("ghost", "bench");
        assert_eq!(ledger.balance(&id, Bucket::Chips), 0);
        assert_eq!(
            ledger.reserve(&id, Bucket::Chips, 1).unwrap_err().code(),
            "INSUFFICIENT_FUNDS"
        );
    }

    #[test]
    fn test_move_between_buckets_round_trips() {
        let ledger = Ledger::new();
        let id = funded(&ledger, "ana", 1000, 0);

        ledger
            .move_between_buckets(&id, Bucket::Wallet, Bucket::Bank, 600)
            .unwrap();
        assert_eq!(ledger.balance(&id, Bucket::Wallet), 400);
        assert_eq!(ledger.balance(&id, Bucket::Bank), 600);

        let err = ledger
            .move_between_buckets(&id, Bucket::Wallet, Bucket::Chips, 401)
            .unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(ledger.balance(&id, Bucket::Wallet), 400);
    }

    #[test]
    fn test_transfer_applies_fee_and_conserves() {
        let ledger = Ledger::new();
        let ana = funded(&ledger, "ana", 1000, 0);
        let bo = AccountId::new("bo", "bench");

        ledger
            .transfer(&ana, Bucket::Wallet, &bo, Bucket::Wallet, 200, 10)
            .unwrap();
        assert_eq!(ledger.balance(&ana, Bucket::Wallet), 800);
        assert_eq!(ledger.balance(&bo, Bucket::Wallet), 190);
    }

    #[test]
    fn test_transfer_insufficient_leaves_both_untouched() {
        let ledger = Ledger::new();
        let ana = funded(&ledger, "ana", 50, 0);
        let bo = AccountId::new("bo", "bench");

        assert!(ledger
            .transfer(&ana, Bucket::Wallet, &bo, Bucket::Wallet, 200, 10)
            .is_err());
        assert_eq!(ledger.balance(&ana, Bucket::Wallet), 50);
        assert_eq!(ledger.balance(&bo, Bucket::Wallet), 0);
    }

    #[test]
    fn test_inventory_debit_is_conditional() {
        let ledger = Ledger::new();
        let id = AccountId::new("ana", "bench");
        ledger.credit_item(&id, "Paper", 3).unwrap();

        assert!(ledger.debit_item(&id, "Paper", 4).is_err());
        ledger.debit_item(&id, "Paper", 3).unwrap();
        assert!(ledger.snapshot(&id).inventory.is_empty());
    }

    #[test]
    fn test_holdings_entry_removed_at_zero() {
        let ledger = Ledger::new();
        let id = AccountId::new("ana", "bench");
        ledger.credit_holding(&id, "NOX", 5).unwrap();
        ledger.debit_holding(&id, "NOX", 5).unwrap();
        assert!(ledger.snapshot(&id).holdings.is_empty());
        assert!(ledger.debit_holding(&id, "NOX", 1).is_err());
    }

    #[test]
    fn test_concurrent_reserves_never_go_negative() {
        let ledger = Arc::new(Ledger::new());
        let id = funded(&ledger, "ana", 0, 1000);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let id = id.clone();
                std::thread::spawn(move || {
                    let mut won = 0u64;
                    for _ in 0..100 {
                        if ledger.reserve(&id, Bucket::Chips, 1).is_ok() {
                            won += 1;
                        }
                    }
                    won
                })
            })
            .collect();

        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 1000);
        assert_eq!(ledger.balance(&id, Bucket::Chips), 0);
    }
}
