use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ledger::{AccountId, Amount, AssetId};

/// External fungible-asset collaborator.
///
/// Implementations report success with a boolean, mirroring token transfer
/// interfaces in the wild; the pool maps a `false` into
/// [`PoolError::TransferFailed`](crate::PoolError::TransferFailed).
/// Implementations are untrusted code from the pool's point of view, which
/// is why every pool entry point is wrapped in an entry guard.
pub trait AssetTransfer {
    /// Pull `amount` of `asset` out of `from`'s custody into the pool's.
    fn pull(&mut self, from: &str, asset: &str, amount: Amount) -> bool;

    /// Push `amount` of `asset` from the pool's custody to `to`.
    fn push(&mut self, to: &str, asset: &str, amount: Amount) -> bool;
}

/// Account holding the pool's own custody inside [`MemoryBank`].
pub const POOL_VAULT: &str = "@pool";

/// In-memory multi-asset bank used by the CLI and tests.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryBank {
    balances: BTreeMap<AssetId, BTreeMap<AccountId, Amount>>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, account: &str, asset: &str, amount: Amount) {
        let holdings = self.balances.entry(asset.to_string()).or_default();
        let entry = holdings.entry(account.to_string()).or_default();
        *entry = entry.saturating_add(amount);
    }

    pub fn balance(&self, account: &str, asset: &str) -> Amount {
        self.balances
            .get(asset)
            .and_then(|holdings| holdings.get(account))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(&mut self, from: &str, to: &str, asset: &str, amount: Amount) -> bool {
        if amount == 0 {
            return true;
        }
        let holdings = self.balances.entry(asset.to_string()).or_default();
        let available = holdings.get(from).copied().unwrap_or(0);
        if available < amount {
            return false;
        }
        holdings.insert(from.to_string(), available - amount);
        let entry = holdings.entry(to.to_string()).or_default();
        *entry = entry.saturating_add(amount);
        true
    }
}

impl AssetTransfer for MemoryBank {
    fn pull(&mut self, from: &str, asset: &str, amount: Amount) -> bool {
        self.transfer(from, POOL_VAULT, asset, amount)
    }

    fn push(&mut self, to: &str, asset: &str, amount: Amount) -> bool {
        self.transfer(POOL_VAULT, to, asset, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_moves_funds_into_the_vault() {
        let mut bank = MemoryBank::new();
        bank.mint("alice", "NOS", 100);
        assert!(bank.pull("alice", "NOS", 60));
        assert_eq!(bank.balance("alice", "NOS"), 40);
        assert_eq!(bank.balance(POOL_VAULT, "NOS"), 60);
    }

    #[test]
    fn pull_beyond_holdings_fails_without_changes() {
        let mut bank = MemoryBank::new();
        bank.mint("alice", "NOS", 10);
        assert!(!bank.pull("alice", "NOS", 11));
        assert_eq!(bank.balance("alice", "NOS"), 10);
        assert_eq!(bank.balance(POOL_VAULT, "NOS"), 0);
    }

    #[test]
    fn push_pays_out_of_the_vault_and_assets_are_isolated() {
        let mut bank = MemoryBank::new();
        bank.mint(POOL_VAULT, "RWD", 50);
        assert!(bank.push("bob", "RWD", 30));
        assert_eq!(bank.balance("bob", "RWD"), 30);
        assert_eq!(bank.balance("bob", "NOS"), 0);
        assert!(!bank.push("bob", "RWD", 21));
    }

    #[test]
    fn minting_saturates_at_the_maximum() {
        let mut bank = MemoryBank::new();
        bank.mint("alice", "NOS", u64::MAX);
        bank.mint("alice", "NOS", 5);
        assert_eq!(bank.balance("alice", "NOS"), u64::MAX);
    }

    #[test]
    fn zero_amount_transfers_always_succeed() {
        let mut bank = MemoryBank::new();
        assert!(bank.pull("alice", "NOS", 0));
        assert!(bank.push("alice", "NOS", 0));
    }
}
