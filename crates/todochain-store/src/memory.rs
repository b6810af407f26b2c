use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use todochain_types::{
    time, AuditEntryId, AuditOutcome, OwnerId, SyncAuditEntry, SyncEnvelopePatch, SyncStatus,
    Todo, TodoId, TodoPatch, TypeError,
};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{AuditResolution, EnvelopeWrite, SyncAuditLog, TodoFilter, TodoStore};

/// In-memory todo store.
///
/// Intended for tests and embedding. Todos are keyed by `(owner, id)`, with
/// a secondary `id -> owner` index for the owner-less sync paths. Every
/// operation takes the state lock once, so each write is atomic.
pub struct InMemoryTodoStore {
    state: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    todos: HashMap<(OwnerId, TodoId), Todo>,
    owners: HashMap<TodoId, OwnerId>,
}

impl StoreState {
    fn get_mut(&mut self, id: &TodoId, owner: &OwnerId) -> Option<&mut Todo> {
        self.todos.get_mut(&(owner.clone(), *id))
    }

    fn get_any_mut(&mut self, id: &TodoId) -> Option<&mut Todo> {
        let owner = self.owners.get(id)?.clone();
        self.todos.get_mut(&(owner, *id))
    }

    fn select(&self, limit: usize, keep: impl Fn(&Todo) -> bool) -> Vec<Todo> {
        let mut out: Vec<Todo> = self.todos.values().filter(|t| keep(t)).cloned().collect();
        out.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
        out.truncate(limit);
        out
    }
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Number of todos stored, deleted ones included.
    pub fn len(&self) -> usize {
        self.read().map(|s| s.todos.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look a todo up by ID alone, bypassing owner scoping.
    pub fn snapshot(&self, id: &TodoId) -> Option<Todo> {
        let state = self.read().ok()?;
        let owner = state.owners.get(id)?;
        state.todos.get(&(owner.clone(), *id)).cloned()
    }

    /// Replace a stored todo as-is, without touching revision or envelope.
    ///
    /// Simulates an out-of-band edit to the primary store.
    pub fn overwrite(&self, todo: Todo) -> StoreResult<()> {
        let mut state = self.write()?;
        let key = (todo.owner.clone(), todo.id);
        if !state.todos.contains_key(&key) {
            return Err(StoreError::NotFound(todo.id));
        }
        state.todos.insert(key, todo);
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| poisoned())
    }
}

impl Default for InMemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".into())
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn create(&self, todo: Todo) -> StoreResult<Todo> {
        let mut state = self.write()?;
        if state.owners.contains_key(&todo.id) {
            return Err(StoreError::AlreadyExists(todo.id));
        }
        state.owners.insert(todo.id, todo.owner.clone());
        state
            .todos
            .insert((todo.owner.clone(), todo.id), todo.clone());
        Ok(todo)
    }

    async fn find_by_id(&self, id: &TodoId, owner: &OwnerId) -> StoreResult<Option<Todo>> {
        Ok(self
            .find_any(id, owner)
            .await?
            .filter(|todo| todo.is_active()))
    }

    async fn find_any(&self, id: &TodoId, owner: &OwnerId) -> StoreResult<Option<Todo>> {
        let state = self.read()?;
        Ok(state.todos.get(&(owner.clone(), *id)).cloned())
    }

    async fn list_for_owner(&self, owner: &OwnerId, filter: &TodoFilter) -> StoreResult<Vec<Todo>> {
        let state = self.read()?;
        let mut out: Vec<Todo> = state
            .todos
            .values()
            .filter(|t| &t.owner == owner && t.is_active() && filter.matches(t))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn update_fields(
        &self,
        id: &TodoId,
        owner: &OwnerId,
        patch: &TodoPatch,
    ) -> StoreResult<Todo> {
        patch.validate()?;
        let mut state = self.write()?;
        let todo = state
            .get_mut(id, owner)
            .filter(|t| t.is_active())
            .ok_or(StoreError::NotFound(*id))?;
        if todo.apply(patch, time::now_millis()) {
            debug!(todo_id = %id, revision = todo.revision, "todo fields updated");
        }
        Ok(todo.clone())
    }

    async fn update_sync_envelope(
        &self,
        id: &TodoId,
        patch: &SyncEnvelopePatch,
    ) -> StoreResult<EnvelopeWrite> {
        let mut state = self.write()?;
        let todo = state.get_any_mut(id).ok_or(StoreError::NotFound(*id))?;

        if let Some(expected) = patch.expected_revision {
            if todo.revision != expected {
                return Ok(EnvelopeWrite::Stale {
                    current_revision: todo.revision,
                });
            }
        }
        if !todo.sync.status.allows(patch.status) {
            return Err(StoreError::InvalidTransition {
                id: *id,
                from: todo.sync.status,
                to: patch.status,
            });
        }
        if patch.status == SyncStatus::Synced
            && patch.ledger_hash.is_none()
            && todo.sync.ledger_hash.is_none()
        {
            return Err(StoreError::Validation(TypeError::InvalidField {
                field: "ledgerHash",
                reason: "a synced todo needs a ledger hash".into(),
            }));
        }

        todo.sync.apply(patch, time::now_millis());
        Ok(EnvelopeWrite::Applied(todo.clone()))
    }

    async fn soft_delete(&self, id: &TodoId, owner: &OwnerId) -> StoreResult<Todo> {
        let mut state = self.write()?;
        let todo = state
            .get_mut(id, owner)
            .filter(|t| t.is_active())
            .ok_or(StoreError::NotFound(*id))?;
        let now = time::now_millis();
        todo.is_deleted = true;
        todo.deleted_at = Some(now);
        todo.deleted_by = Some(owner.clone());
        todo.touch(now);
        Ok(todo.clone())
    }

    async fn restore(&self, id: &TodoId, owner: &OwnerId) -> StoreResult<Todo> {
        let mut state = self.write()?;
        let todo = state.get_mut(id, owner).ok_or(StoreError::NotFound(*id))?;
        if todo.is_active() {
            return Err(StoreError::NotDeleted(*id));
        }
        todo.is_deleted = false;
        todo.deleted_at = None;
        todo.deleted_by = None;
        todo.touch(time::now_millis());
        Ok(todo.clone())
    }

    async fn list_failed_syncs(&self, max_retries: u32, limit: usize) -> StoreResult<Vec<Todo>> {
        let state = self.read()?;
        Ok(state.select(limit, |t| {
            t.sync.status == SyncStatus::Failed && t.sync.retry_count < max_retries
        }))
    }

    async fn list_permanent_failures(
        &self,
        max_retries: u32,
        limit: usize,
    ) -> StoreResult<Vec<Todo>> {
        let state = self.read()?;
        Ok(state.select(limit, |t| {
            t.sync.status == SyncStatus::Failed && t.sync.retry_count >= max_retries
        }))
    }

    async fn list_stale_pending(
        &self,
        older_than: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Todo>> {
        let state = self.read()?;
        Ok(state.select(limit, |t| {
            t.sync.status == SyncStatus::Pending
                && t.sync.last_attempt_at.unwrap_or(t.updated_at) < older_than
        }))
    }

    async fn reset_sync(&self, id: &TodoId, owner: &OwnerId) -> StoreResult<Todo> {
        let mut state = self.write()?;
        let todo = state.get_mut(id, owner).ok_or(StoreError::NotFound(*id))?;
        if todo.sync.status == SyncStatus::Synced {
            return Err(StoreError::InvalidTransition {
                id: *id,
                from: SyncStatus::Synced,
                to: SyncStatus::Pending,
            });
        }
        todo.sync.status = SyncStatus::Pending;
        todo.sync.retry_count = 0;
        todo.sync.last_error = None;
        Ok(todo.clone())
    }
}

impl std::fmt::Debug for InMemoryTodoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTodoStore")
            .field("todo_count", &self.len())
            .finish()
    }
}

/// In-memory [`SyncAuditLog`].
#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<SyncAuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries still waiting for a terminal outcome.
    pub fn unresolved(&self) -> Vec<SyncAuditEntry> {
        self.entries
            .read()
            .map(|e| e.iter().filter(|x| !x.is_resolved()).cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SyncAuditLog for InMemoryAuditLog {
    async fn append(&self, entry: SyncAuditEntry) -> StoreResult<()> {
        self.entries.write().map_err(|_| poisoned())?.push(entry);
        Ok(())
    }

    async fn resolve(
        &self,
        id: &AuditEntryId,
        resolution: AuditResolution,
    ) -> StoreResult<SyncAuditEntry> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let entry = entries
            .iter_mut()
            .rev()
            .find(|e| &e.id == id)
            .ok_or(StoreError::AuditEntryNotFound(*id))?;
        if entry.is_resolved() {
            return Err(StoreError::AlreadyResolved(*id));
        }
        match resolution {
            AuditResolution::Confirmed(tx_ref) => {
                entry.outcome = AuditOutcome::Confirmed;
                entry.tx_ref = Some(tx_ref);
            }
            AuditResolution::Failed(error) => {
                entry.outcome = AuditOutcome::Failed;
                entry.error = Some(error);
            }
        }
        entry.resolved_at = Some(time::now_millis());
        Ok(entry.clone())
    }

    async fn list_for_todo(&self, todo_id: &TodoId) -> StoreResult<Vec<SyncAuditEntry>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .iter()
            .filter(|e| &e.todo_id == todo_id)
            .cloned()
            .collect())
    }
}

impl std::fmt::Debug for InMemoryAuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryAuditLog")
            .field("entry_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use todochain_types::{Digest, NewTodo, SyncOperation, TxRef};

    fn alice() -> OwnerId {
        OwnerId::new("alice").unwrap()
    }

    fn bob() -> OwnerId {
        OwnerId::new("bob").unwrap()
    }

    async fn seed(store: &InMemoryTodoStore, owner: OwnerId, title: &str) -> Todo {
        store
            .create(Todo::new(owner, NewTodo::new(title), time::now_millis()))
            .await
            .unwrap()
    }

    fn hash(byte: u8) -> Digest {
        Digest::from_bytes([byte; 32])
    }

    async fn fail(store: &InMemoryTodoStore, todo: &Todo, times: u32) {
        for _ in 0..times {
            store
                .update_sync_envelope(&todo.id, &SyncEnvelopePatch::failed("rpc down"))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn lookups_are_owner_scoped() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "mine").await;

        assert!(store.find_by_id(&todo.id, &alice()).await.unwrap().is_some());
        assert!(store.find_by_id(&todo.id, &bob()).await.unwrap().is_none());
        assert!(matches!(
            store.update_fields(&todo.id, &bob(), &TodoPatch::title("x")).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.soft_delete(&todo.id, &bob()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "a").await;
        assert!(matches!(
            store.create(todo.clone()).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn update_fields_resets_envelope_but_keeps_hash() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "a").await;
        store
            .update_sync_envelope(&todo.id, &SyncEnvelopePatch::synced(hash(1), None))
            .await
            .unwrap();

        let updated = store
            .update_fields(&todo.id, &alice(), &TodoPatch::title("b"))
            .await
            .unwrap();
        assert_eq!(updated.revision, 2);
        assert_eq!(updated.sync.status, SyncStatus::Pending);
        assert_eq!(updated.sync.ledger_hash, Some(hash(1)));
    }

    #[tokio::test]
    async fn no_op_patch_keeps_synced_status() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "a").await;
        store
            .update_sync_envelope(&todo.id, &SyncEnvelopePatch::synced(hash(1), None))
            .await
            .unwrap();
        let same = store
            .update_fields(&todo.id, &alice(), &TodoPatch::title("a"))
            .await
            .unwrap();
        assert_eq!(same.revision, 1);
        assert_eq!(same.sync.status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn invalid_patch_is_a_validation_error() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "a").await;
        assert!(matches!(
            store.update_fields(&todo.id, &alice(), &TodoPatch::title("  ")).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn each_failure_write_increments_retry_count_by_one() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "a").await;
        for expected in 1..=3 {
            let write = store
                .update_sync_envelope(&todo.id, &SyncEnvelopePatch::failed("boom"))
                .await
                .unwrap();
            let EnvelopeWrite::Applied(stored) = write else {
                panic!("expected applied write");
            };
            assert_eq!(stored.sync.retry_count, expected);
        }
    }

    #[tokio::test]
    async fn stale_revision_skips_the_write() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "a").await;
        store
            .update_fields(&todo.id, &alice(), &TodoPatch::title("b"))
            .await
            .unwrap();

        let write = store
            .update_sync_envelope(
                &todo.id,
                &SyncEnvelopePatch::synced(hash(1), None).at_revision(1),
            )
            .await
            .unwrap();
        assert_eq!(write, EnvelopeWrite::Stale { current_revision: 2 });
        let stored = store.snapshot(&todo.id).unwrap();
        assert_eq!(stored.sync.status, SyncStatus::Pending);
        assert!(stored.sync.ledger_hash.is_none());
    }

    #[tokio::test]
    async fn synced_cannot_go_back_to_pending_or_failed() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "a").await;
        store
            .update_sync_envelope(&todo.id, &SyncEnvelopePatch::synced(hash(1), None))
            .await
            .unwrap();
        assert!(matches!(
            store
                .update_sync_envelope(&todo.id, &SyncEnvelopePatch::attempt())
                .await,
            Err(StoreError::InvalidTransition { .. })
        ));
        assert!(matches!(
            store
                .update_sync_envelope(&todo.id, &SyncEnvelopePatch::failed("late"))
                .await,
            Err(StoreError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn synced_requires_a_hash() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "a").await;
        let mut patch = SyncEnvelopePatch::synced(hash(1), None);
        patch.ledger_hash = None;
        assert!(matches!(
            store.update_sync_envelope(&todo.id, &patch).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn soft_delete_hides_from_default_queries() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "a").await;
        let deleted = store.soft_delete(&todo.id, &alice()).await.unwrap();
        assert!(deleted.is_deleted);
        assert_eq!(deleted.deleted_by, Some(alice()));
        assert!(deleted.deleted_at.is_some());

        assert!(store.find_by_id(&todo.id, &alice()).await.unwrap().is_none());
        assert!(store.find_any(&todo.id, &alice()).await.unwrap().is_some());
        assert!(store
            .list_for_owner(&alice(), &TodoFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            store.soft_delete(&todo.id, &alice()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn restore_clears_deletion() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "a").await;
        assert!(matches!(
            store.restore(&todo.id, &alice()).await,
            Err(StoreError::NotDeleted(_))
        ));
        store.soft_delete(&todo.id, &alice()).await.unwrap();
        let restored = store.restore(&todo.id, &alice()).await.unwrap();
        assert!(restored.is_active());
        assert!(restored.deleted_at.is_none());
        assert!(restored.deleted_by.is_none());
        assert_eq!(restored.revision, 3);
    }

    #[tokio::test]
    async fn list_for_owner_filters_and_orders_newest_first() {
        let store = InMemoryTodoStore::new();
        let first = seed(&store, alice(), "first").await;
        let second = seed(&store, alice(), "second").await;
        seed(&store, bob(), "theirs").await;
        store
            .update_fields(&first.id, &alice(), &TodoPatch::toggle_complete())
            .await
            .unwrap();

        let all = store
            .list_for_owner(&alice(), &TodoFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);

        let done = store
            .list_for_owner(&alice(), &TodoFilter::completed(true))
            .await
            .unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, first.id);

        let capped = store
            .list_for_owner(&alice(), &TodoFilter::default().with_limit(1))
            .await
            .unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn failed_syncs_respect_retry_cap_and_include_deleted() {
        let store = InMemoryTodoStore::new();
        let retryable = seed(&store, alice(), "retryable").await;
        let exhausted = seed(&store, alice(), "exhausted").await;
        let deleted = seed(&store, alice(), "deleted").await;
        store.soft_delete(&deleted.id, &alice()).await.unwrap();

        fail(&store, &retryable, 2).await;
        fail(&store, &exhausted, 3).await;
        fail(&store, &deleted, 1).await;

        let failed = store.list_failed_syncs(3, 10).await.unwrap();
        let ids: Vec<TodoId> = failed.iter().map(|t| t.id).collect();
        assert!(ids.contains(&retryable.id));
        assert!(ids.contains(&deleted.id));
        assert!(!ids.contains(&exhausted.id));

        let permanent = store.list_permanent_failures(3, 10).await.unwrap();
        assert_eq!(permanent.len(), 1);
        assert_eq!(permanent[0].id, exhausted.id);

        assert_eq!(store.list_failed_syncs(3, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_syncs_are_oldest_first() {
        let store = InMemoryTodoStore::new();
        let older = seed(&store, alice(), "older").await;
        let newer = seed(&store, alice(), "newer").await;
        fail(&store, &newer, 1).await;
        fail(&store, &older, 1).await;
        let failed = store.list_failed_syncs(10, 10).await.unwrap();
        assert_eq!(failed[0].id, older.id);
        assert_eq!(failed[1].id, newer.id);
    }

    #[tokio::test]
    async fn stale_pending_uses_last_activity() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "a").await;
        let future = time::now_millis() + TimeDelta::minutes(5);
        let past = time::now_millis() - TimeDelta::minutes(5);

        assert_eq!(store.list_stale_pending(future, 10).await.unwrap().len(), 1);
        assert!(store.list_stale_pending(past, 10).await.unwrap().is_empty());

        store
            .update_sync_envelope(&todo.id, &SyncEnvelopePatch::synced(hash(1), None))
            .await
            .unwrap();
        assert!(store.list_stale_pending(future, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_sync_clears_retries() {
        let store = InMemoryTodoStore::new();
        let todo = seed(&store, alice(), "a").await;
        fail(&store, &todo, 4).await;
        let reset = store.reset_sync(&todo.id, &alice()).await.unwrap();
        assert_eq!(reset.sync.status, SyncStatus::Pending);
        assert_eq!(reset.sync.retry_count, 0);
        assert!(reset.sync.last_error.is_none());
        assert_eq!(reset.revision, todo.revision);

        store
            .update_sync_envelope(&todo.id, &SyncEnvelopePatch::synced(hash(1), None))
            .await
            .unwrap();
        assert!(matches!(
            store.reset_sync(&todo.id, &alice()).await,
            Err(StoreError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn audit_entries_resolve_exactly_once() {
        let log = InMemoryAuditLog::new();
        let todo_id = TodoId::new();
        let entry = SyncAuditEntry::pending(
            todo_id,
            SyncOperation::Create,
            Some(hash(1)),
            time::now_millis(),
        );
        let entry_id = entry.id;
        log.append(entry).await.unwrap();
        assert_eq!(log.unresolved().len(), 1);

        let resolved = log
            .resolve(&entry_id, AuditResolution::Confirmed(TxRef::new("0xabc")))
            .await
            .unwrap();
        assert_eq!(resolved.outcome, AuditOutcome::Confirmed);
        assert!(resolved.resolved_at.is_some());
        assert!(log.unresolved().is_empty());

        assert!(matches!(
            log.resolve(&entry_id, AuditResolution::Failed("again".into()))
                .await,
            Err(StoreError::AlreadyResolved(_))
        ));
        assert!(matches!(
            log.resolve(&AuditEntryId::new(), AuditResolution::Failed("x".into()))
                .await,
            Err(StoreError::AuditEntryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn audit_entries_list_per_todo_in_order() {
        let log = InMemoryAuditLog::new();
        let a = TodoId::new();
        let b = TodoId::new();
        let now = time::now_millis();
        log.append(SyncAuditEntry::pending(a, SyncOperation::Create, None, now))
            .await
            .unwrap();
        log.append(SyncAuditEntry::pending(b, SyncOperation::Create, None, now))
            .await
            .unwrap();
        log.append(SyncAuditEntry::pending(a, SyncOperation::Delete, None, now))
            .await
            .unwrap();

        let entries = log.list_for_todo(&a).await.unwrap();
        let ops: Vec<SyncOperation> = entries.iter().map(|e| e.operation).collect();
        assert_eq!(ops, vec![SyncOperation::Create, SyncOperation::Delete]);
    }
}
