use thiserror::Error;
use todochain_ledger::LedgerError;
use todochain_store::StoreError;
use todochain_types::{SyncStatus, TodoId};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("todo not found: {0}")]
    NotFound(TodoId),

    #[error("todo {id} is {status}, not synced to the ledger yet; retry once it is synced")]
    NotSynced { id: TodoId, status: SyncStatus },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
