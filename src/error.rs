//! Error types for chain extension

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    /// An input is unresolved or already spent in the active scope.
    #[error("Transaction not attachable: {0}")]
    NotAttachable(String),

    /// Reserved for full block validation.
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    /// A transaction that passed the dry run failed on commit.
    #[error("Commit-phase attach failure: {0}")]
    CommitPhaseAttachFailure(String),

    #[error("Genesis block must be stored directly on the chain: {0}")]
    UnexpectedGenesis(String),

    #[error("Duplicate transaction: {0}")]
    DuplicateTransaction(String),

    #[error("Transaction conflicts with pool: {0}")]
    PoolConflict(String),

    #[error("Transaction rejected by pool: {0}")]
    PoolRejected(String),

    #[error("Invalid miner address: {0}")]
    InvalidAddress(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ChainError {
    /// True for the recoverable "not yet attachable" outcome of a dry run.
    pub fn is_not_attachable(&self) -> bool {
        matches!(self, ChainError::NotAttachable(_))
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
