use std::time::Duration;

use todochain_types::LedgerAddress;

/// Errors produced by ledger operations.
///
/// Contract-level rejections are permanent for the attempt that caused them;
/// [`LedgerError::Timeout`] and [`LedgerError::Transport`] are transient.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger record already exists: {0}")]
    AlreadyExists(String),

    #[error("ledger record not found: {0}")]
    NotFound(String),

    #[error("caller {caller} does not own ledger record {id}")]
    NotOwner { id: String, caller: LedgerAddress },

    #[error("ledger record already deleted: {0}")]
    AlreadyDeleted(String),

    #[error("ledger record is not deleted: {0}")]
    NotDeleted(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("transaction not confirmed within {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transport(_))
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
