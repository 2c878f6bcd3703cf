use thiserror::Error;

/// Canonical error type exposed by the pool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Zero-amount stake or distribution; rejected instead of becoming a
    /// confusing no-op transaction.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Attempted unstake above the account's current stake.
    #[error("insufficient stake in account {account}: have {balance}, requested {requested}")]
    InsufficientStake {
        account: String,
        balance: u64,
        requested: u64,
    },

    /// The external asset-transfer collaborator did not confirm success.
    #[error("transfer of {amount} {asset} failed")]
    TransferFailed { asset: String, amount: u64 },

    /// A stake deposit would overflow the ledger total.
    #[error("stake amount overflows the ledger total")]
    Overflow,

    /// A mutating entry point was invoked while another call was in flight.
    #[error("reentrant call rejected")]
    ReentrantCall,
}
