use serde::{Deserialize, Serialize};

use crate::ledger::{Amount, AssetId};

/// A single reward-issuance event. Immutable once appended.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistributionEvent {
    pub index: u64,
    pub reward_asset: AssetId,
    pub total_amount: Amount,
}

/// Append-only log of distributions with zero-based, gapless indices
/// assigned in call order. One registry is shared across all reward assets.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistributionRegistry {
    entries: Vec<DistributionEvent>,
}

impl DistributionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u64) -> Option<&DistributionEvent> {
        self.entries.get(index as usize)
    }

    pub fn entries(&self) -> &[DistributionEvent] {
        &self.entries
    }

    /// Append the next event and return its index.
    pub fn append(&mut self, reward_asset: AssetId, total_amount: Amount) -> u64 {
        let index = self.len();
        self.entries.push(DistributionEvent {
            index,
            reward_asset,
            total_amount,
        });
        index
    }
}
