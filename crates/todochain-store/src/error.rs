use todochain_types::{AuditEntryId, SyncStatus, TodoId, TypeError};

/// Errors from primary store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No todo with this ID is visible to the caller.
    #[error("todo not found: {0}")]
    NotFound(TodoId),

    /// A todo with this ID is already stored.
    #[error("todo already exists: {0}")]
    AlreadyExists(TodoId),

    /// Restore was requested for a todo that is not deleted.
    #[error("todo is not deleted: {0}")]
    NotDeleted(TodoId),

    /// The sync envelope may not move between these states.
    #[error("invalid sync transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: TodoId,
        from: SyncStatus,
        to: SyncStatus,
    },

    /// Input rejected by field validation.
    #[error("validation failed: {0}")]
    Validation(#[from] TypeError),

    #[error("audit entry not found: {0}")]
    AuditEntryNotFound(AuditEntryId),

    /// Audit entries resolve exactly once.
    #[error("audit entry already resolved: {0}")]
    AlreadyResolved(AuditEntryId),

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("store backend unavailable: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
