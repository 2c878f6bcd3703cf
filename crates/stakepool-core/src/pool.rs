use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::claims::ClaimTracker;
use crate::error::PoolError;
use crate::ledger::{AccountId, Amount, AssetId, StakeLedger};
use crate::registry::{DistributionEvent, DistributionRegistry};
use crate::transfer::AssetTransfer;

/// Observable side effects, appended in commit order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PoolEvent {
    StakeChanged {
        account: AccountId,
        amount: Amount,
        direction: StakeDirection,
    },
    DistributionCreated {
        asset: AssetId,
        amount: Amount,
        index: u64,
    },
    ClaimSettled {
        account: AccountId,
        asset: AssetId,
        amount: Amount,
        index: u64,
    },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StakeDirection {
    Deposit,
    Withdrawal,
}

/// Rejects nested calls made by an untrusted transfer collaborator while a
/// pool operation is still in flight.
#[derive(Clone, Debug, Default)]
struct EntryGuard {
    in_flight: bool,
}

impl EntryGuard {
    fn enter(&mut self) -> Result<(), PoolError> {
        if self.in_flight {
            return Err(PoolError::ReentrantCall);
        }
        self.in_flight = true;
        Ok(())
    }

    fn exit(&mut self) {
        self.in_flight = false;
    }
}

/// Point-in-time view of the pool with a commitment over its contents.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub stake_asset: AssetId,
    pub total_staked: Amount,
    pub stakes: BTreeMap<AccountId, Amount>,
    pub distributions: Vec<DistributionEvent>,
    pub state_root: [u8; 32],
}

/// The reward-distribution pool.
///
/// Accounts deposit a stake of the reference asset, anyone may inject
/// reward distributions, and stakers later settle their proportional share
/// of any past distribution. Each public operation is an all-or-nothing
/// transaction: either the ledger writes and the external transfers all
/// commit, or nothing does.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakePool {
    stake_asset: AssetId,
    ledger: StakeLedger,
    registry: DistributionRegistry,
    claims: ClaimTracker,
    events: Vec<PoolEvent>,
    #[serde(skip)]
    guard: EntryGuard,
}

impl StakePool {
    pub fn new(stake_asset: impl Into<AssetId>) -> Self {
        Self {
            stake_asset: stake_asset.into(),
            ledger: StakeLedger::new(),
            registry: DistributionRegistry::new(),
            claims: ClaimTracker::new(),
            events: Vec::new(),
            guard: EntryGuard::default(),
        }
    }

    pub fn stake_asset(&self) -> &str {
        &self.stake_asset
    }

    pub fn ledger(&self) -> &StakeLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &DistributionRegistry {
        &self.registry
    }

    pub fn claims(&self) -> &ClaimTracker {
        &self.claims
    }

    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    /// Deposit `amount` of the reference asset from `account`.
    ///
    /// The deposit is pulled through the collaborator first; if it does not
    /// confirm, no state changes. A first-time staker's claim record is
    /// created at the current registry length, so distributions that
    /// predate the stake are never claimable.
    pub fn stake(
        &mut self,
        account: &str,
        amount: Amount,
        bank: &mut dyn AssetTransfer,
    ) -> Result<(), PoolError> {
        self.guard.enter()?;
        let result = self.stake_inner(account, amount, bank);
        self.guard.exit();
        result
    }

    fn stake_inner(
        &mut self,
        account: &str,
        amount: Amount,
        bank: &mut dyn AssetTransfer,
    ) -> Result<(), PoolError> {
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        // The total bounds every balance, so one check covers both.
        if self.ledger.total().checked_add(amount).is_none() {
            return Err(PoolError::Overflow);
        }
        if !bank.pull(account, &self.stake_asset, amount) {
            return Err(PoolError::TransferFailed {
                asset: self.stake_asset.clone(),
                amount,
            });
        }
        let index = self.registry.len();
        self.claims.register(account, index);
        self.ledger.record_stake(account, amount, index);
        self.events.push(PoolEvent::StakeChanged {
            account: account.to_string(),
            amount,
            direction: StakeDirection::Deposit,
        });
        Ok(())
    }

    /// Withdraw `amount` of the reference asset back to `account`.
    ///
    /// Rewards for already-issued distributions stay claimable afterwards;
    /// settlement reads checkpointed balances, not live ones. A zero amount
    /// is accepted and does nothing.
    pub fn unstake(
        &mut self,
        account: &str,
        amount: Amount,
        bank: &mut dyn AssetTransfer,
    ) -> Result<(), PoolError> {
        self.guard.enter()?;
        let result = self.unstake_inner(account, amount, bank);
        self.guard.exit();
        result
    }

    fn unstake_inner(
        &mut self,
        account: &str,
        amount: Amount,
        bank: &mut dyn AssetTransfer,
    ) -> Result<(), PoolError> {
        if amount == 0 {
            return Ok(());
        }
        let index = self.registry.len();
        self.ledger.record_unstake(account, amount, index)?;
        if !bank.push(account, &self.stake_asset, amount) {
            // Effects ran before the interaction; put them back.
            self.ledger.record_stake(account, amount, index);
            return Err(PoolError::TransferFailed {
                asset: self.stake_asset.clone(),
                amount,
            });
        }
        self.events.push(PoolEvent::StakeChanged {
            account: account.to_string(),
            amount,
            direction: StakeDirection::Withdrawal,
        });
        Ok(())
    }

    /// Append a reward distribution of `amount` of `asset`, funded by
    /// `caller`. Permissionless; returns the new distribution index.
    pub fn distribute(
        &mut self,
        caller: &str,
        asset: &str,
        amount: Amount,
        bank: &mut dyn AssetTransfer,
    ) -> Result<u64, PoolError> {
        self.guard.enter()?;
        let result = self.distribute_inner(caller, asset, amount, bank);
        self.guard.exit();
        result
    }

    fn distribute_inner(
        &mut self,
        caller: &str,
        asset: &str,
        amount: Amount,
        bank: &mut dyn AssetTransfer,
    ) -> Result<u64, PoolError> {
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        if !bank.pull(caller, asset, amount) {
            return Err(PoolError::TransferFailed {
                asset: asset.to_string(),
                amount,
            });
        }
        let index = self.registry.append(asset.to_string(), amount);
        self.events.push(PoolEvent::DistributionCreated {
            asset: asset.to_string(),
            amount,
            index,
        });
        Ok(index)
    }

    /// Settle the listed distribution indices for `account`, in caller
    /// order, and return the total paid out.
    ///
    /// Indices that are unknown, not yet issued, before the account's join
    /// index, or already settled are silently skipped; a skip never aborts
    /// the batch. A failed outbound transfer rolls back the failed index
    /// and abandons the rest of the batch; indices whose payout already
    /// confirmed stay settled, since a confirmed external transfer cannot
    /// be reverted and un-settling it would pay the index twice.
    pub fn claim_rewards(
        &mut self,
        account: &str,
        indices: &[u64],
        bank: &mut dyn AssetTransfer,
    ) -> Result<Amount, PoolError> {
        self.guard.enter()?;
        let result = self.claim_rewards_inner(account, indices, bank);
        self.guard.exit();
        result
    }

    fn claim_rewards_inner(
        &mut self,
        account: &str,
        indices: &[u64],
        bank: &mut dyn AssetTransfer,
    ) -> Result<Amount, PoolError> {
        let registry_len = self.registry.len();
        let mut paid: Amount = 0;
        for &index in indices {
            if !self.claims.claimable(account, index, registry_len) {
                continue;
            }
            let event = match self.registry.get(index) {
                Some(event) => event,
                None => continue,
            };
            let asset = event.reward_asset.clone();
            let payout = proportional_payout(
                event.total_amount,
                self.ledger.balance_as_of(account, index),
                self.ledger.total_as_of(index),
            );
            // Effects before the interaction, one index at a time: each
            // index commits as soon as its push confirms. Only the failed
            // index may be unmarked; earlier payouts are already out the
            // door.
            self.claims.mark_settled(account, index);
            if payout > 0 && !bank.push(account, &asset, payout) {
                self.claims.unmark(account, index);
                return Err(PoolError::TransferFailed {
                    asset,
                    amount: payout,
                });
            }
            paid = paid.saturating_add(payout);
            self.events.push(PoolEvent::ClaimSettled {
                account: account.to_string(),
                asset,
                amount: payout,
                index,
            });
        }
        Ok(paid)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            stake_asset: self.stake_asset.clone(),
            total_staked: self.ledger.total(),
            stakes: self.ledger.balances().clone(),
            distributions: self.registry.entries().to_vec(),
            state_root: self.state_root(),
        }
    }

    fn state_root(&self) -> [u8; 32] {
        let mut leaves: Vec<[u8; 32]> = Vec::new();
        for (account, balance) in self.ledger.balances() {
            let mut hasher = Sha256::new();
            hasher.update(b"stake");
            hasher.update(account.as_bytes());
            hasher.update(balance.to_le_bytes());
            leaves.push(hasher.finalize().into());
        }
        for event in self.registry.entries() {
            let mut hasher = Sha256::new();
            hasher.update(b"dist");
            hasher.update(event.index.to_le_bytes());
            hasher.update(event.reward_asset.as_bytes());
            hasher.update(event.total_amount.to_le_bytes());
            leaves.push(hasher.finalize().into());
        }
        build_merkle(leaves)
    }
}

/// Floor share of `total_amount` owed to `balance` out of `total` stake.
fn proportional_payout(total_amount: Amount, balance: Amount, total: Amount) -> Amount {
    if total == 0 {
        return 0;
    }
    ((total_amount as u128) * (balance as u128) / (total as u128)) as Amount
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"stakepool-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            if chunk.len() == 2 {
                hasher.update(chunk[1]);
            } else {
                hasher.update(chunk[0]);
            }
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}
