use std::sync::Arc;

use tracing::{debug, info};

use todochain_store::{SyncAuditLog, TodoFilter, TodoStore};
use todochain_sync::{SyncOrchestrator, VerificationResult, VerificationService};
use todochain_types::{
    time, NewTodo, OwnerId, SyncAuditEntry, SyncOperation, SyncStatus, Todo, TodoId, TodoPatch,
};

use crate::error::{SdkError, SdkResult};

/// Caller-facing todo operations.
///
/// Mutations commit to the primary store and return at once; the ledger
/// sync runs in the background. Only [`verify_todo`](Self::verify_todo)
/// talks to the ledger before returning.
pub struct TodoService {
    store: Arc<dyn TodoStore>,
    audit: Arc<dyn SyncAuditLog>,
    orchestrator: SyncOrchestrator,
    verifier: VerificationService,
    max_retries: u32,
}

impl TodoService {
    pub fn new(
        store: Arc<dyn TodoStore>,
        audit: Arc<dyn SyncAuditLog>,
        orchestrator: SyncOrchestrator,
        verifier: VerificationService,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            audit,
            orchestrator,
            verifier,
            max_retries,
        }
    }

    pub async fn create_todo(&self, owner: &OwnerId, input: NewTodo) -> SdkResult<Todo> {
        input.validate()?;
        let todo = self
            .store
            .create(Todo::new(owner.clone(), input, time::now_millis()))
            .await?;
        info!(todo_id = %todo.id, owner = %owner, "todo created");
        self.orchestrator
            .dispatch(todo.id, owner.clone(), SyncOperation::Create);
        Ok(todo)
    }

    pub async fn update_todo(&self, id: &TodoId, owner: &OwnerId, patch: TodoPatch) -> SdkResult<Todo> {
        if patch.is_empty() {
            return Err(SdkError::Validation("no fields to update".into()));
        }
        patch.validate()?;
        self.mutate(id, owner, &patch).await
    }

    pub async fn toggle_complete(&self, id: &TodoId, owner: &OwnerId) -> SdkResult<Todo> {
        self.mutate(id, owner, &TodoPatch::toggle_complete()).await
    }

    /// Soft-delete. The ledger delete follows in the background and its
    /// failure never undoes the deletion.
    pub async fn delete_todo(&self, id: &TodoId, owner: &OwnerId) -> SdkResult<Todo> {
        let todo = self.store.soft_delete(id, owner).await?;
        info!(todo_id = %id, "todo deleted");
        self.orchestrator
            .dispatch(*id, owner.clone(), SyncOperation::Delete);
        Ok(todo)
    }

    pub async fn restore_todo(&self, id: &TodoId, owner: &OwnerId) -> SdkResult<Todo> {
        let todo = self.store.restore(id, owner).await?;
        info!(todo_id = %id, "todo restored");
        self.orchestrator
            .dispatch(*id, owner.clone(), SyncOperation::Restore);
        Ok(todo)
    }

    /// Check the todo's current content against the ledger.
    pub async fn verify_todo(&self, id: &TodoId, owner: &OwnerId) -> SdkResult<VerificationResult> {
        Ok(self.verifier.verify(id, owner).await?)
    }

    pub async fn get_todo(&self, id: &TodoId, owner: &OwnerId) -> SdkResult<Todo> {
        self.store
            .find_by_id(id, owner)
            .await?
            .ok_or(SdkError::NotFound(*id))
    }

    pub async fn list_todos(&self, owner: &OwnerId, filter: &TodoFilter) -> SdkResult<Vec<Todo>> {
        Ok(self.store.list_for_owner(owner, filter).await?)
    }

    /// Ledger writes attempted for a todo, oldest first.
    pub async fn sync_history(&self, id: &TodoId, owner: &OwnerId) -> SdkResult<Vec<SyncAuditEntry>> {
        if self.store.find_any(id, owner).await?.is_none() {
            return Err(SdkError::NotFound(*id));
        }
        Ok(self.audit.list_for_todo(id).await?)
    }

    /// Operator action: give a todo that ran out of retries a fresh start.
    pub async fn resync_todo(&self, id: &TodoId, owner: &OwnerId) -> SdkResult<Todo> {
        let todo = self.store.reset_sync(id, owner).await?;
        info!(todo_id = %id, "manual resync requested");
        self.orchestrator
            .dispatch(*id, owner.clone(), todochain_sync::intent_for(&todo));
        Ok(todo)
    }

    /// Todos left `failed` after exhausting their retries.
    pub async fn permanent_failures(&self, limit: usize) -> SdkResult<Vec<Todo>> {
        Ok(self
            .store
            .list_permanent_failures(self.max_retries, limit)
            .await?)
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    async fn mutate(&self, id: &TodoId, owner: &OwnerId, patch: &TodoPatch) -> SdkResult<Todo> {
        let todo = self.store.update_fields(id, owner, patch).await?;
        // An unchanged todo keeps its envelope, so only a fresh pending one
        // needs a sync.
        if todo.sync.status == SyncStatus::Pending {
            debug!(todo_id = %id, revision = todo.revision, "todo updated");
            self.orchestrator
                .dispatch(*id, owner.clone(), todochain_sync::intent_for(&todo));
        }
        Ok(todo)
    }
}

impl std::fmt::Debug for TodoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoService")
            .field("orchestrator", &self.orchestrator)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
