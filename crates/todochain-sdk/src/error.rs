use thiserror::Error;
use todochain_ledger::LedgerError;
use todochain_store::StoreError;
use todochain_sync::SyncError;
use todochain_types::{SyncStatus, TodoId, TypeError};

/// Broad class of an [`SdkError`], for mapping onto a transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    NotSynced,
    /// The ledger could not answer right now; retrying may help.
    LedgerUnavailable,
    /// The ledger answered with an error.
    Ledger,
    Internal,
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("todo not found: {0}")]
    NotFound(TodoId),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("todo {id} is {status}, not synced to the ledger yet; try again once it is synced")]
    NotSynced { id: TodoId, status: SyncStatus },

    #[error("ledger error: {0}")]
    Ledger(LedgerError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotSynced { .. } => ErrorKind::NotSynced,
            Self::Ledger(LedgerError::NotFound(_) | LedgerError::NotOwner { .. }) => {
                ErrorKind::NotFound
            }
            Self::Ledger(LedgerError::AlreadyExists(_)) => ErrorKind::Conflict,
            Self::Ledger(e) if e.is_transient() => ErrorKind::LedgerUnavailable,
            Self::Ledger(_) => ErrorKind::Ledger,
            Self::Config(_) | Self::Store(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::NotSynced => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Ledger => 502,
            ErrorKind::LedgerUnavailable => 503,
            ErrorKind::Internal => 500,
        }
    }
}

impl From<TypeError> for SdkError {
    fn from(e: TypeError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<LedgerError> for SdkError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Config(msg) => Self::Config(msg),
            other => Self::Ledger(other),
        }
    }
}

impl From<StoreError> for SdkError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Validation(e) => Self::Validation(e.to_string()),
            e @ (StoreError::AlreadyExists(_)
            | StoreError::NotDeleted(_)
            | StoreError::InvalidTransition { .. }) => Self::Conflict(e.to_string()),
            other => Self::Store(other),
        }
    }
}

impl From<SyncError> for SdkError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::NotFound(id) => Self::NotFound(id),
            SyncError::NotSynced { id, status } => Self::NotSynced { id, status },
            SyncError::Ledger(e) => e.into(),
            SyncError::Store(e) => e.into(),
            SyncError::Config(msg) => Self::Config(msg),
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
