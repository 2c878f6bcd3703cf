use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PoolError;

pub type AccountId = String;
pub type AssetId = String;
pub type Amount = u64;

/// Balance that took effect at a given distribution index.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    pub index: u64,
    pub balance: Amount,
}

/// Append-only, index-ordered series of balance checkpoints.
///
/// Settlement reads balances "as of distribution index k": the latest entry
/// whose index is ≤ k. Entries are only ever appended (or overwritten in
/// place when several changes land at the same index), so the series stays
/// sorted and lookups are a binary search.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointSeries {
    entries: Vec<Checkpoint>,
}

impl CheckpointSeries {
    /// Record `balance` as the value in effect from `index` onwards.
    pub fn record(&mut self, index: u64, balance: Amount) {
        match self.entries.last_mut() {
            Some(last) if last.index == index => last.balance = balance,
            _ => self.entries.push(Checkpoint { index, balance }),
        }
    }

    /// Latest balance recorded at or before `index`; zero when the series
    /// starts after it.
    pub fn balance_at(&self, index: u64) -> Amount {
        let pos = self.entries.partition_point(|c| c.index <= index);
        if pos == 0 {
            0
        } else {
            self.entries[pos - 1].balance
        }
    }

    pub fn latest(&self) -> Amount {
        self.entries.last().map(|c| c.balance).unwrap_or(0)
    }
}

/// Per-account stake balances and the running total, with checkpoint
/// history for both.
///
/// Invariant: `total == sum(balances)` after every mutation. Accounts are
/// never removed; a zero balance is a valid persistent state.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StakeLedger {
    balances: BTreeMap<AccountId, Amount>,
    total: Amount,
    account_history: BTreeMap<AccountId, CheckpointSeries>,
    total_history: CheckpointSeries,
}

impl StakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: &str) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    pub fn balances(&self) -> &BTreeMap<AccountId, Amount> {
        &self.balances
    }

    /// Balance the account held when distribution `index` was created.
    pub fn balance_as_of(&self, account: &str, index: u64) -> Amount {
        self.account_history
            .get(account)
            .map(|series| series.balance_at(index))
            .unwrap_or(0)
    }

    /// Total stake in effect when distribution `index` was created.
    pub fn total_as_of(&self, index: u64) -> Amount {
        self.total_history.balance_at(index)
    }

    /// Increase the account's stake, checkpointing at `index` (the registry
    /// length at the time of the change).
    pub fn record_stake(&mut self, account: &str, amount: Amount, index: u64) {
        let balance = self.balances.entry(account.to_string()).or_default();
        *balance = balance.saturating_add(amount);
        let updated = *balance;
        self.total = self.total.saturating_add(amount);
        self.account_history
            .entry(account.to_string())
            .or_default()
            .record(index, updated);
        self.total_history.record(index, self.total);
    }

    /// Decrease the account's stake, checkpointing at `index`.
    pub fn record_unstake(
        &mut self,
        account: &str,
        amount: Amount,
        index: u64,
    ) -> Result<(), PoolError> {
        let balance = self.balance(account);
        if balance < amount {
            return Err(PoolError::InsufficientStake {
                account: account.to_string(),
                balance,
                requested: amount,
            });
        }
        let updated = balance - amount;
        self.balances.insert(account.to_string(), updated);
        self.total -= amount;
        self.account_history
            .entry(account.to_string())
            .or_default()
            .record(index, updated);
        self.total_history.record(index, self.total);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_lookup_finds_latest_at_or_before_index() {
        let mut series = CheckpointSeries::default();
        series.record(0, 100);
        series.record(2, 250);
        series.record(5, 40);
        assert_eq!(series.balance_at(0), 100);
        assert_eq!(series.balance_at(1), 100);
        assert_eq!(series.balance_at(2), 250);
        assert_eq!(series.balance_at(4), 250);
        assert_eq!(series.balance_at(5), 40);
        assert_eq!(series.balance_at(100), 40);
        assert_eq!(series.latest(), 40);
    }

    #[test]
    fn checkpoint_before_first_entry_is_zero() {
        let mut series = CheckpointSeries::default();
        assert_eq!(series.balance_at(3), 0);
        series.record(4, 7);
        assert_eq!(series.balance_at(3), 0);
        assert_eq!(series.balance_at(4), 7);
    }

    #[test]
    fn same_index_record_overwrites_in_place() {
        let mut series = CheckpointSeries::default();
        series.record(1, 10);
        series.record(1, 30);
        series.record(1, 5);
        assert_eq!(series.balance_at(1), 5);
        assert_eq!(series.entries.len(), 1);
    }

    #[test]
    fn total_tracks_sum_of_balances() {
        let mut ledger = StakeLedger::new();
        ledger.record_stake("alice", 100, 0);
        ledger.record_stake("bob", 300, 0);
        ledger.record_unstake("alice", 40, 1).unwrap();
        let sum: Amount = ledger.balances().values().sum();
        assert_eq!(ledger.total(), sum);
        assert_eq!(ledger.total(), 360);
    }

    #[test]
    fn unstake_above_balance_is_rejected_without_changes() {
        let mut ledger = StakeLedger::new();
        ledger.record_stake("alice", 50, 0);
        let err = ledger.record_unstake("alice", 51, 0).unwrap_err();
        match err {
            PoolError::InsufficientStake {
                balance, requested, ..
            } => {
                assert_eq!(balance, 50);
                assert_eq!(requested, 51);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ledger.balance("alice"), 50);
        assert_eq!(ledger.total(), 50);
    }

    #[test]
    fn stake_recording_saturates_instead_of_wrapping() {
        let mut ledger = StakeLedger::new();
        ledger.record_stake("alice", u64::MAX, 0);
        ledger.record_stake("alice", 1, 0);
        assert_eq!(ledger.balance("alice"), u64::MAX);
        assert_eq!(ledger.total(), u64::MAX);
    }

    #[test]
    fn historical_balances_survive_later_changes() {
        let mut ledger = StakeLedger::new();
        ledger.record_stake("alice", 100, 0);
        // Distribution 0 happens here, then alice exits entirely.
        ledger.record_unstake("alice", 100, 1).unwrap();
        assert_eq!(ledger.balance("alice"), 0);
        assert_eq!(ledger.balance_as_of("alice", 0), 100);
        assert_eq!(ledger.total_as_of(0), 100);
        assert_eq!(ledger.balance_as_of("alice", 1), 0);
    }
}
