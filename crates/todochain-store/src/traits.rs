use async_trait::async_trait;
use chrono::{DateTime, Utc};
use todochain_types::{
    AuditEntryId, OwnerId, SyncAuditEntry, SyncEnvelopePatch, Todo, TodoId, TodoPatch, TxRef,
};

use crate::error::StoreResult;

/// Owner-scoped todo storage.
///
/// All implementations must satisfy these invariants:
/// - Every owner-facing lookup is keyed by `(owner, id)`; a todo owned by
///   someone else is indistinguishable from a missing one.
/// - Every write is a single atomic step. Callers never read, modify, and
///   save across two calls.
/// - A semantic mutation (field update, soft delete, restore) bumps the
///   revision and resets the envelope to `pending`.
/// - Soft-deleted todos are hidden from default queries but remain visible
///   to [`find_any`](TodoStore::find_any) and the sync queries.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Insert a freshly built todo.
    async fn create(&self, todo: Todo) -> StoreResult<Todo>;

    /// Active todo by ID. Returns `Ok(None)` if absent, deleted, or not owned.
    async fn find_by_id(&self, id: &TodoId, owner: &OwnerId) -> StoreResult<Option<Todo>>;

    /// Like [`find_by_id`](TodoStore::find_by_id) but includes soft-deleted todos.
    async fn find_any(&self, id: &TodoId, owner: &OwnerId) -> StoreResult<Option<Todo>>;

    /// Active todos of one owner, newest first.
    async fn list_for_owner(&self, owner: &OwnerId, filter: &TodoFilter) -> StoreResult<Vec<Todo>>;

    /// Apply a semantic patch to an active todo and return the result.
    ///
    /// A patch that changes nothing leaves the todo (revision and envelope
    /// included) untouched.
    async fn update_fields(&self, id: &TodoId, owner: &OwnerId, patch: &TodoPatch)
        -> StoreResult<Todo>;

    /// Atomically write sync-envelope fields only.
    ///
    /// Fails with `InvalidTransition` for a disallowed status change. When
    /// the patch carries an expected revision that no longer matches, nothing
    /// is written and [`EnvelopeWrite::Stale`] is returned.
    async fn update_sync_envelope(
        &self,
        id: &TodoId,
        patch: &SyncEnvelopePatch,
    ) -> StoreResult<EnvelopeWrite>;

    /// Flag an active todo deleted by `owner`.
    async fn soft_delete(&self, id: &TodoId, owner: &OwnerId) -> StoreResult<Todo>;

    /// Clear the deletion flag. Fails with `NotDeleted` for an active todo.
    async fn restore(&self, id: &TodoId, owner: &OwnerId) -> StoreResult<Todo>;

    /// `failed` todos with `retry_count < max_retries`, oldest update first.
    /// Includes soft-deleted todos.
    async fn list_failed_syncs(&self, max_retries: u32, limit: usize) -> StoreResult<Vec<Todo>>;

    /// `failed` todos that exhausted their retries, oldest update first.
    async fn list_permanent_failures(&self, max_retries: u32, limit: usize)
        -> StoreResult<Vec<Todo>>;

    /// `pending` todos with no activity since `older_than`, oldest first.
    async fn list_stale_pending(
        &self,
        older_than: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Todo>>;

    /// Put a `failed` todo back to `pending` with a zero retry count.
    async fn reset_sync(&self, id: &TodoId, owner: &OwnerId) -> StoreResult<Todo>;
}

/// Result of a conditional envelope write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvelopeWrite {
    /// The write landed; carries the todo as stored afterwards.
    Applied(Todo),
    /// The todo moved to a newer revision; nothing was written.
    Stale { current_revision: u64 },
}

impl EnvelopeWrite {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Options for [`TodoStore::list_for_owner`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoFilter {
    /// Only todos with this completion flag.
    pub completed: Option<bool>,
    pub limit: Option<usize>,
}

impl TodoFilter {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, todo: &Todo) -> bool {
        self.completed.map_or(true, |c| todo.completed == c)
    }
}

/// Terminal outcome of an audited ledger write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuditResolution {
    Confirmed(TxRef),
    Failed(String),
}

/// Append-only log of attempted ledger writes.
///
/// Entries are appended `pending` and resolved exactly once.
#[async_trait]
pub trait SyncAuditLog: Send + Sync {
    async fn append(&self, entry: SyncAuditEntry) -> StoreResult<()>;

    /// Resolve a pending entry. Fails with `AlreadyResolved` on a second call.
    async fn resolve(
        &self,
        id: &AuditEntryId,
        resolution: AuditResolution,
    ) -> StoreResult<SyncAuditEntry>;

    /// Entries for one todo in append order.
    async fn list_for_todo(&self, todo_id: &TodoId) -> StoreResult<Vec<SyncAuditEntry>>;
}
