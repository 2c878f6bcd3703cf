//! Reward-distribution ledger for staked accounts.
//!
//! This crate exposes the building blocks that the CLI and higher level
//! tooling combine:
//!
//! * [`ledger`] — per-account stake balances plus append-only balance
//!   checkpoints for historical lookups.
//! * [`registry`] — the monotonically indexed, append-only log of reward
//!   distributions.
//! * [`claims`] — per-account settlement tracking that prevents double
//!   claims.
//! * [`transfer`] — the external asset-transfer collaborator seam and an
//!   in-memory bank implementing it.
//! * [`pool`] — the entry point tying the pieces together: staking,
//!   distribution, and proportional claim settlement.
//!
//! The modules are intentionally small and focused so that consumers can
//! embed the accounting core without pulling in transport or storage
//! plumbing.

pub mod claims;
pub mod ledger;
pub mod pool;
pub mod registry;
pub mod transfer;

mod error;

pub use error::PoolError;
