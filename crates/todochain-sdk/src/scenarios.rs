//! End-to-end flows through a wired runtime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use todochain_crypto::compute_hash;
use todochain_ledger::{LedgerClient, LedgerError, LedgerRecord, LedgerResult};
use todochain_store::{InMemoryAuditLog, InMemoryTodoStore, TodoFilter};
use todochain_sync::{SyncOrchestrator, VerificationService};
use todochain_types::{
    AuditOutcome, Digest, LedgerAddress, NewTodo, OwnerId, SyncOperation, SyncStatus, TodoId,
    TodoPatch, TxRef,
};

use crate::config::TodoChainConfig;
use crate::error::SdkError;
use crate::runtime::TodoRuntime;
use crate::service::TodoService;

fn alice() -> OwnerId {
    OwnerId::new("alice").unwrap()
}

fn runtime() -> TodoRuntime {
    TodoRuntime::new(TodoChainConfig::default()).unwrap()
}

#[tokio::test]
async fn created_todo_syncs_and_verifies() {
    let rt = runtime();
    let service = rt.service();
    let todo = service
        .create_todo(&alice(), NewTodo::new("buy milk"))
        .await
        .unwrap();
    assert_eq!(todo.sync.status, SyncStatus::Pending);

    rt.wait_idle().await;
    let stored = service.get_todo(&todo.id, &alice()).await.unwrap();
    assert_eq!(stored.sync.status, SyncStatus::Synced);
    assert_eq!(stored.sync.ledger_hash, Some(compute_hash(&stored)));
    assert!(stored.sync.tx_ref.is_some());

    let result = service.verify_todo(&todo.id, &alice()).await.unwrap();
    assert!(result.is_valid);
    assert!(result.cache_matches);
    assert_eq!(result.ledger_meta.owner, rt.ledger_address());
    assert!(!result.ledger_meta.deleted);
}

#[tokio::test]
async fn every_mutation_moves_the_ledger_hash() {
    let rt = runtime();
    let service = rt.service();
    let todo = service
        .create_todo(&alice(), NewTodo::new("draft"))
        .await
        .unwrap();
    rt.wait_idle().await;
    let first = service.get_todo(&todo.id, &alice()).await.unwrap();

    service
        .update_todo(&todo.id, &alice(), TodoPatch::title("final"))
        .await
        .unwrap();
    rt.wait_idle().await;
    let renamed = service.get_todo(&todo.id, &alice()).await.unwrap();
    assert_eq!(renamed.sync.status, SyncStatus::Synced);
    assert_ne!(renamed.sync.ledger_hash, first.sync.ledger_hash);

    let toggled = service.toggle_complete(&todo.id, &alice()).await.unwrap();
    assert!(toggled.completed);
    assert!(toggled.completed_at.is_some());
    rt.wait_idle().await;
    assert!(service.verify_todo(&todo.id, &alice()).await.unwrap().is_valid);

    service.delete_todo(&todo.id, &alice()).await.unwrap();
    rt.wait_idle().await;
    let result = service.verify_todo(&todo.id, &alice()).await.unwrap();
    assert!(result.is_valid);
    assert!(result.ledger_meta.deleted);
    assert!(service.get_todo(&todo.id, &alice()).await.is_err());

    service.restore_todo(&todo.id, &alice()).await.unwrap();
    rt.wait_idle().await;
    let result = service.verify_todo(&todo.id, &alice()).await.unwrap();
    assert!(result.is_valid);
    assert!(!result.ledger_meta.deleted);

    let ops: Vec<SyncOperation> = service
        .sync_history(&todo.id, &alice())
        .await
        .unwrap()
        .iter()
        .map(|e| e.operation)
        .collect();
    assert_eq!(
        ops,
        vec![
            SyncOperation::Create,
            SyncOperation::Update,
            SyncOperation::Update,
            SyncOperation::Delete,
            SyncOperation::Restore,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn slow_ledger_fails_then_sweeper_recovers() {
    let mut config = TodoChainConfig::default();
    config.ledger.confirmation_timeout_ms = 50;
    config.ledger.simulated_latency_ms = 200;
    let rt = TodoRuntime::new(config).unwrap();
    let service = rt.service();

    let todo = service
        .create_todo(&alice(), NewTodo::new("slow"))
        .await
        .unwrap();
    rt.wait_idle().await;
    let stored = rt.store().snapshot(&todo.id).unwrap();
    assert_eq!(stored.sync.status, SyncStatus::Failed);
    assert_eq!(stored.sync.retry_count, 1);
    assert!(stored.sync.last_error.unwrap().contains("not confirmed"));
    assert!(rt.contract().is_empty());

    // The primary write stands regardless.
    assert_eq!(service.get_todo(&todo.id, &alice()).await.unwrap().title, "slow");

    rt.contract().set_latency(Duration::ZERO);
    let report = rt.sweeper().run_once().await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(
        rt.store().snapshot(&todo.id).unwrap().sync.status,
        SyncStatus::Synced
    );
    assert!(service.verify_todo(&todo.id, &alice()).await.unwrap().is_valid);
}

#[tokio::test(start_paused = true)]
async fn verifying_before_sync_is_rejected() {
    let rt = runtime();
    rt.contract().set_latency(Duration::from_millis(100));
    let service = rt.service();
    let todo = service
        .create_todo(&alice(), NewTodo::new("not yet"))
        .await
        .unwrap();

    let err = service.verify_todo(&todo.id, &alice()).await.unwrap_err();
    assert!(matches!(err, SdkError::NotSynced { status: SyncStatus::Pending, .. }));
    assert_eq!(err.status_code(), 400);

    rt.wait_idle().await;
    assert!(service.verify_todo(&todo.id, &alice()).await.unwrap().is_valid);
}

#[tokio::test]
async fn missing_ledger_record_verifies_as_not_found() {
    let rt = runtime();
    let service = rt.service();
    rt.contract().inject(todochain_ledger::Fault::Fail(LedgerError::Transport(
        "rpc down".into(),
    )));
    let todo = service
        .create_todo(&alice(), NewTodo::new("never landed"))
        .await
        .unwrap();
    rt.wait_idle().await;
    assert!(rt.contract().is_empty());

    // A cache that claims a sync the chain never saw.
    let mut stored = rt.store().snapshot(&todo.id).unwrap();
    stored.sync.status = SyncStatus::Synced;
    stored.sync.ledger_hash = Some(compute_hash(&stored));
    rt.store().overwrite(stored).unwrap();

    let err = service.verify_todo(&todo.id, &alice()).await.unwrap_err();
    assert!(matches!(err, SdkError::Ledger(LedgerError::NotFound(_))));
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn out_of_band_edit_fails_verification() {
    let rt = runtime();
    let service = rt.service();
    let todo = service
        .create_todo(&alice(), NewTodo::new("original"))
        .await
        .unwrap();
    rt.wait_idle().await;

    let mut edited = rt.store().snapshot(&todo.id).unwrap();
    edited.title = "tampered".into();
    rt.store().overwrite(edited).unwrap();

    let result = service.verify_todo(&todo.id, &alice()).await.unwrap();
    assert!(!result.is_valid);
    assert!(!result.cache_matches);
    assert_ne!(result.primary_hash, result.ledger_hash);
}

#[tokio::test]
async fn exhausted_todo_is_surfaced_and_resynced() {
    let mut config = TodoChainConfig::default();
    config.sync.max_retries = 2;
    config.sync.backoff_secs = vec![0];
    let rt = TodoRuntime::new(config).unwrap();
    let service = rt.service();

    rt.contract().inject_n(
        todochain_ledger::Fault::Fail(LedgerError::Transport("rpc down".into())),
        2,
    );
    let todo = service
        .create_todo(&alice(), NewTodo::new("stuck"))
        .await
        .unwrap();
    rt.wait_idle().await;
    assert_eq!(rt.sweeper().run_once().await.unwrap().failed, 1);

    let stuck = service.permanent_failures(10).await.unwrap();
    assert_eq!(stuck.len(), 1);
    assert_eq!(stuck[0].sync.retry_count, 2);
    assert_eq!(rt.sweeper().run_once().await.unwrap().scanned, 0);

    let reset = service.resync_todo(&todo.id, &alice()).await.unwrap();
    assert_eq!(reset.sync.retry_count, 0);
    rt.wait_idle().await;
    assert_eq!(
        rt.store().snapshot(&todo.id).unwrap().sync.status,
        SyncStatus::Synced
    );
    assert!(service.permanent_failures(10).await.unwrap().is_empty());
    assert!(matches!(
        service.resync_todo(&todo.id, &alice()).await,
        Err(SdkError::Conflict(_))
    ));

    let history = service.sync_history(&todo.id, &alice()).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].outcome, AuditOutcome::Failed);
    assert_eq!(history[2].outcome, AuditOutcome::Confirmed);
}

#[tokio::test]
async fn invalid_input_and_foreign_todos_are_rejected() {
    let rt = runtime();
    let service = rt.service();
    assert!(matches!(
        service.create_todo(&alice(), NewTodo::new("   ")).await,
        Err(SdkError::Validation(_))
    ));

    let todo = service
        .create_todo(&alice(), NewTodo::new("mine"))
        .await
        .unwrap();
    assert!(matches!(
        service
            .update_todo(&todo.id, &alice(), TodoPatch::default())
            .await,
        Err(SdkError::Validation(_))
    ));

    let bob = OwnerId::new("bob").unwrap();
    let err = service.get_todo(&todo.id, &bob).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert!(matches!(
        service.sync_history(&todo.id, &bob).await,
        Err(SdkError::NotFound(_))
    ));
    assert!(matches!(
        service.restore_todo(&todo.id, &alice()).await,
        Err(SdkError::Conflict(_))
    ));
    rt.wait_idle().await;
}

#[tokio::test]
async fn list_hides_deleted_and_filters_completion() {
    let rt = runtime();
    let service = rt.service();
    let a = service.create_todo(&alice(), NewTodo::new("a")).await.unwrap();
    let b = service.create_todo(&alice(), NewTodo::new("b")).await.unwrap();
    let c = service.create_todo(&alice(), NewTodo::new("c")).await.unwrap();
    service.toggle_complete(&a.id, &alice()).await.unwrap();
    service.delete_todo(&c.id, &alice()).await.unwrap();
    rt.wait_idle().await;

    let all = service
        .list_todos(&alice(), &TodoFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    let open = service
        .list_todos(&alice(), &TodoFilter::completed(false))
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, b.id);
}

#[tokio::test]
async fn runtimes_sharing_a_contract_cannot_touch_each_others_records() {
    let first = runtime();
    let second =
        TodoRuntime::with_contract(TodoChainConfig::default(), Arc::clone(first.contract())).unwrap();
    assert_ne!(first.ledger_address(), second.ledger_address());

    let todo = first
        .service()
        .create_todo(&alice(), NewTodo::new("first's"))
        .await
        .unwrap();
    first.wait_idle().await;
    assert_eq!(first.contract().len(), 1);

    let stored = first.store().snapshot(&todo.id).unwrap();
    let err = second
        .ledger_client()
        .update(&todo.id, &Digest::from_bytes([7; 32]))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotOwner { .. }));
    assert!(first.service().verify_todo(&todo.id, &alice()).await.unwrap().is_valid);
    assert_eq!(stored.sync.ledger_hash, Some(compute_hash(&stored)));
}

#[tokio::test]
async fn shutdown_drains_dispatched_syncs() {
    let mut rt = runtime();
    assert!(rt.start_sweeper());
    let todo = rt
        .service()
        .create_todo(&alice(), NewTodo::new("late"))
        .await
        .unwrap();
    let store = Arc::clone(rt.store());
    rt.shutdown().await;
    assert_eq!(store.snapshot(&todo.id).unwrap().sync.status, SyncStatus::Synced);
}

/// Wraps a ledger client and records how many writes overlap.
struct RecordingLedger {
    inner: Arc<dyn LedgerClient>,
    active: AtomicUsize,
    peak: AtomicUsize,
    writes: AtomicUsize,
}

impl RecordingLedger {
    fn new(inner: Arc<dyn LedgerClient>) -> Self {
        Self {
            inner,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    async fn track<F>(&self, write: F) -> LedgerResult<TxRef>
    where
        F: std::future::Future<Output = LedgerResult<TxRef>>,
    {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        let result = write.await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl LedgerClient for RecordingLedger {
    fn address(&self) -> LedgerAddress {
        self.inner.address()
    }

    async fn create(&self, id: &TodoId, hash: &Digest) -> LedgerResult<TxRef> {
        self.track(self.inner.create(id, hash)).await
    }

    async fn update(&self, id: &TodoId, hash: &Digest) -> LedgerResult<TxRef> {
        self.track(self.inner.update(id, hash)).await
    }

    async fn delete(&self, id: &TodoId) -> LedgerResult<TxRef> {
        self.track(self.inner.delete(id)).await
    }

    async fn restore(&self, id: &TodoId) -> LedgerResult<TxRef> {
        self.track(self.inner.restore(id)).await
    }

    async fn verify(&self, id: &TodoId, expected: &Digest) -> LedgerResult<bool> {
        self.inner.verify(id, expected).await
    }

    async fn get(&self, id: &TodoId) -> LedgerResult<LedgerRecord> {
        self.inner.get(id).await
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_updates_never_overlap_on_the_ledger() {
    let base = runtime();
    base.contract().set_latency(Duration::from_millis(20));
    let ledger = Arc::new(RecordingLedger::new(base.ledger_client()));
    let store = Arc::new(InMemoryTodoStore::new());
    let audit = Arc::new(InMemoryAuditLog::new());
    let orchestrator = SyncOrchestrator::new(store.clone(), ledger.clone(), audit.clone());
    let service = TodoService::new(
        store.clone(),
        audit,
        orchestrator,
        VerificationService::new(store.clone(), ledger.clone()),
        10,
    );

    let todo = service
        .create_todo(&alice(), NewTodo::new("v0"))
        .await
        .unwrap();
    service.orchestrator().wait_idle().await;

    let owner = alice();
    let (first, second) = tokio::join!(
        service.update_todo(&todo.id, &owner, TodoPatch::title("v1")),
        service.update_todo(&todo.id, &owner, TodoPatch::title("v2")),
    );
    first.unwrap();
    second.unwrap();
    service.orchestrator().wait_idle().await;

    assert_eq!(ledger.peak.load(Ordering::SeqCst), 1);
    let stored = store.snapshot(&todo.id).unwrap();
    assert_eq!(stored.sync.status, SyncStatus::Synced);
    assert_eq!(stored.sync.ledger_hash, Some(compute_hash(&stored)));
    assert!(service.verify_todo(&todo.id, &alice()).await.unwrap().is_valid);
    // Create plus at most one update per mutation.
    assert!(ledger.writes.load(Ordering::SeqCst) <= 3);
}
