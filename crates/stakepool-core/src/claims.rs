use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ledger::AccountId;

/// Per-account claim progress: the registry length at first stake plus the
/// set of indices already settled.
///
/// The settled set (rather than a single "highest settled" scalar) lets a
/// caller submit claim batches in any order without forfeiting skipped
/// lower indices, while still making every replay a no-op.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimRecord {
    pub join_index: u64,
    settled: BTreeSet<u64>,
}

/// Tracker mapping accounts to their claim records. Records are created
/// lazily on first stake and never removed.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimTracker {
    records: BTreeMap<AccountId, ClaimRecord>,
}

impl ClaimTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the account's record at first stake. Later calls keep the
    /// original join index, so re-staking never re-opens old distributions.
    pub fn register(&mut self, account: &str, join_index: u64) {
        self.records
            .entry(account.to_string())
            .or_insert_with(|| ClaimRecord {
                join_index,
                settled: BTreeSet::new(),
            });
    }

    pub fn contains(&self, account: &str) -> bool {
        self.records.contains_key(account)
    }

    /// Whether `index` can still be settled for the account: at or after the
    /// account's join index, below the registry length, and not yet settled.
    pub fn claimable(&self, account: &str, index: u64, registry_len: u64) -> bool {
        match self.records.get(account) {
            Some(record) => {
                index >= record.join_index
                    && index < registry_len
                    && !record.settled.contains(&index)
            }
            None => false,
        }
    }

    pub fn is_settled(&self, account: &str, index: u64) -> bool {
        self.records
            .get(account)
            .map(|record| record.settled.contains(&index))
            .unwrap_or(false)
    }

    pub fn mark_settled(&mut self, account: &str, index: u64) {
        if let Some(record) = self.records.get_mut(account) {
            record.settled.insert(index);
        }
    }

    /// Undo a settlement mark. Used when a claim batch is rolled back after
    /// a failed outbound transfer.
    pub fn unmark(&mut self, account: &str, index: u64) {
        if let Some(record) = self.records.get_mut(account) {
            record.settled.remove(&index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_keeps_the_original_join_index() {
        let mut tracker = ClaimTracker::new();
        tracker.register("alice", 2);
        tracker.register("alice", 9);
        assert!(tracker.claimable("alice", 2, 10));
        assert!(!tracker.claimable("alice", 1, 10));
    }

    #[test]
    fn claimable_gates_on_join_settled_and_registry_length() {
        let mut tracker = ClaimTracker::new();
        tracker.register("alice", 1);
        // Before the join index.
        assert!(!tracker.claimable("alice", 0, 5));
        // Future / nonexistent index.
        assert!(!tracker.claimable("alice", 5, 5));
        // Fresh past index.
        assert!(tracker.claimable("alice", 3, 5));
        tracker.mark_settled("alice", 3);
        assert!(!tracker.claimable("alice", 3, 5));
        assert!(tracker.is_settled("alice", 3));
        // Unknown account.
        assert!(!tracker.claimable("bob", 3, 5));
    }

    #[test]
    fn unmark_restores_claimability() {
        let mut tracker = ClaimTracker::new();
        tracker.register("alice", 0);
        tracker.mark_settled("alice", 0);
        tracker.unmark("alice", 0);
        assert!(tracker.claimable("alice", 0, 1));
    }
}
