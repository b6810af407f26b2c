use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, info, info_span, warn, Instrument};

use todochain_crypto::compute_hash;
use todochain_ledger::{LedgerClient, LedgerError, LedgerRecord, LedgerResult};
use todochain_store::{AuditResolution, EnvelopeWrite, SyncAuditLog, TodoStore};
use todochain_types::{
    time, Digest, OwnerId, SyncAuditEntry, SyncEnvelopePatch, SyncOperation, SyncStatus, Todo,
    TodoId, TxRef,
};

use crate::error::SyncResult;
use crate::locks::{KeyedLocks, SyncPermit};

/// What a single sync attempt ended with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The ledger now holds `hash`. `tx_ref` is `None` when it already did.
    Synced { hash: Digest, tx_ref: Option<TxRef> },
    /// Nothing to do; the todo was synced when the attempt started.
    AlreadySynced,
    /// A ledger call failed and the failure was recorded on the todo.
    Failed { error: LedgerError, retry_count: u32 },
    /// The todo changed mid-attempt; the newer revision syncs on its own.
    Superseded { current_revision: u64 },
    /// The todo no longer exists.
    Missing,
    /// Another attempt holds the todo's lock.
    Busy,
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. } | Self::AlreadySynced)
    }
}

/// One ledger write planned by [`plan_steps`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerStep {
    Update,
    Delete,
    Restore,
}

impl LedgerStep {
    fn operation(self) -> SyncOperation {
        match self {
            Self::Update => SyncOperation::Update,
            Self::Delete => SyncOperation::Delete,
            Self::Restore => SyncOperation::Restore,
        }
    }
}

/// Ledger writes that bring an existing `record` in line with a todo.
///
/// A deleted record cannot take a new hash, so a hash change on one is
/// wrapped in restore/delete.
pub fn plan_steps(todo_deleted: bool, hash: &Digest, record: &LedgerRecord) -> Vec<LedgerStep> {
    let hash_differs = record.hash != *hash;
    let mut steps = Vec::new();
    if record.deleted && (!todo_deleted || hash_differs) {
        steps.push(LedgerStep::Restore);
    }
    if hash_differs {
        steps.push(LedgerStep::Update);
    }
    if todo_deleted && (!record.deleted || hash_differs) {
        steps.push(LedgerStep::Delete);
    }
    steps
}

/// The operation a sync of `todo` stands for, for logs and the audit trail.
pub fn intent_for(todo: &Todo) -> SyncOperation {
    if !todo.sync.has_ledger_record() {
        SyncOperation::Create
    } else if todo.is_deleted {
        SyncOperation::Delete
    } else {
        SyncOperation::Update
    }
}

/// Pushes todo digests to the ledger and records the result on the todo.
///
/// Both the write path ([`dispatch`](Self::dispatch)) and the retry sweeper
/// go through the same attempt logic. Attempts on one todo are serialized;
/// unrelated todos sync concurrently. Cloning is cheap and shares state.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn TodoStore>,
    ledger: Arc<dyn LedgerClient>,
    audit: Arc<dyn SyncAuditLog>,
    locks: KeyedLocks,
    outstanding: AtomicUsize,
    idle: Notify,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn TodoStore>,
        ledger: Arc<dyn LedgerClient>,
        audit: Arc<dyn SyncAuditLog>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                ledger,
                audit,
                locks: KeyedLocks::new(),
                outstanding: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Start a background sync of `id` and return immediately.
    ///
    /// Failures are recorded on the todo and never reach the caller.
    pub fn dispatch(&self, id: TodoId, owner: OwnerId, intent: SyncOperation) {
        self.inner.outstanding.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let span = info_span!("sync", todo_id = %id, op = %intent);
        tokio::spawn(
            async move {
                let _outstanding = Outstanding(&inner);
                let permit = inner.locks.acquire(id).await;
                if let Err(e) = inner.attempt(permit, &owner, intent).await {
                    warn!(error = %e, "sync attempt aborted");
                }
            }
            .instrument(span),
        );
    }

    /// Run a sync attempt now, waiting for any attempt already in flight.
    pub async fn sync_now(
        &self,
        id: TodoId,
        owner: &OwnerId,
        intent: SyncOperation,
    ) -> SyncResult<SyncOutcome> {
        let span = info_span!("sync", todo_id = %id, op = %intent);
        async {
            let permit = self.inner.locks.acquire(id).await;
            self.inner.attempt(permit, owner, intent).await
        }
        .instrument(span)
        .await
    }

    /// Run a sync attempt unless one is already in flight for this todo.
    pub async fn try_sync(&self, todo: &Todo) -> SyncResult<SyncOutcome> {
        let intent = intent_for(todo);
        let span = info_span!("sync", todo_id = %todo.id, op = %intent);
        async {
            let Some(permit) = self.inner.locks.try_acquire(todo.id) else {
                debug!("attempt already in flight, skipping");
                return Ok(SyncOutcome::Busy);
            };
            self.inner.attempt(permit, &todo.owner, intent).await
        }
        .instrument(span)
        .await
    }

    pub fn is_in_flight(&self, id: &TodoId) -> bool {
        self.inner.locks.is_in_flight(id)
    }

    /// Background attempts started by [`dispatch`](Self::dispatch) and not
    /// finished yet.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Wait until every dispatched attempt has finished.
    pub async fn wait_idle(&self) {
        loop {
            let idle = self.inner.idle.notified();
            if self.outstanding() == 0 {
                return;
            }
            idle.await;
        }
    }
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("outstanding", &self.outstanding())
            .field("locks", &self.inner.locks)
            .finish()
    }
}

struct Outstanding<'a>(&'a Inner);

impl Drop for Outstanding<'_> {
    fn drop(&mut self) {
        if self.0.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl Inner {
    async fn attempt(
        &self,
        permit: SyncPermit<'_>,
        owner: &OwnerId,
        intent: SyncOperation,
    ) -> SyncResult<SyncOutcome> {
        let id = permit.id();
        let Some(todo) = self.store.find_any(&id, owner).await? else {
            debug!("todo gone, nothing to sync");
            return Ok(SyncOutcome::Missing);
        };
        if todo.sync.status == SyncStatus::Synced {
            debug!("already synced");
            return Ok(SyncOutcome::AlreadySynced);
        }

        let revision = todo.revision;
        let hash = compute_hash(&todo);

        if todo.sync.status == SyncStatus::Failed {
            let attempt = SyncEnvelopePatch::attempt().at_revision(revision);
            if let EnvelopeWrite::Stale { current_revision } =
                self.store.update_sync_envelope(&id, &attempt).await?
            {
                return Ok(SyncOutcome::Superseded { current_revision });
            }
            debug!(retry_count = todo.sync.retry_count, "retrying failed sync");
        }

        let pushed = self.push(&todo, &hash).await;
        let patch = match &pushed {
            Ok(tx_ref) => SyncEnvelopePatch::synced(hash, tx_ref.clone()),
            Err(e) => SyncEnvelopePatch::failed(e.to_string()),
        }
        .at_revision(revision);

        let stored = match self.store.update_sync_envelope(&id, &patch).await? {
            EnvelopeWrite::Applied(stored) => stored,
            EnvelopeWrite::Stale { current_revision } => {
                debug!(revision, current_revision, "todo changed during sync, result dropped");
                return Ok(SyncOutcome::Superseded { current_revision });
            }
        };

        match pushed {
            Ok(tx_ref) => {
                info!(
                    hash = %hash.short_hex(),
                    tx_ref = tx_ref.as_ref().map(TxRef::as_str).unwrap_or("-"),
                    %intent,
                    "todo synced to ledger"
                );
                Ok(SyncOutcome::Synced { hash, tx_ref })
            }
            Err(error) => {
                warn!(
                    error = %error,
                    transient = error.is_transient(),
                    retry_count = stored.sync.retry_count,
                    "ledger sync failed"
                );
                Ok(SyncOutcome::Failed {
                    error,
                    retry_count: stored.sync.retry_count,
                })
            }
        }
    }

    /// Bring the ledger record in line with `todo`. Returns the reference of
    /// the last transaction sent, if any.
    async fn push(&self, todo: &Todo, hash: &Digest) -> LedgerResult<Option<TxRef>> {
        let id = todo.id;
        if !todo.sync.has_ledger_record() {
            match self.write(id, SyncOperation::Create, hash).await {
                Ok(tx_ref) => {
                    if todo.is_deleted {
                        return self.write(id, SyncOperation::Delete, hash).await.map(Some);
                    }
                    return Ok(Some(tx_ref));
                }
                Err(LedgerError::AlreadyExists(_)) => {
                    debug!("ledger record exists from an earlier attempt, reconciling");
                }
                Err(e) => return Err(e),
            }
        }

        let record = self.ledger.get(&id).await?;
        let mut last = None;
        for step in plan_steps(todo.is_deleted, hash, &record) {
            last = Some(self.write(id, step.operation(), hash).await?);
        }
        Ok(last)
    }

    /// One audited ledger write.
    async fn write(&self, id: TodoId, op: SyncOperation, hash: &Digest) -> LedgerResult<TxRef> {
        let carries_hash = matches!(op, SyncOperation::Create | SyncOperation::Update);
        let entry = SyncAuditEntry::pending(id, op, carries_hash.then_some(*hash), time::now_millis());
        let entry_id = entry.id;
        if let Err(e) = self.audit.append(entry).await {
            warn!(error = %e, "failed to append sync audit entry");
        }

        debug!(%op, "sending ledger transaction");
        let result = match op {
            SyncOperation::Create => self.ledger.create(&id, hash).await,
            SyncOperation::Update => self.ledger.update(&id, hash).await,
            SyncOperation::Delete => self.ledger.delete(&id).await,
            SyncOperation::Restore => self.ledger.restore(&id).await,
        };

        let resolution = match &result {
            Ok(tx_ref) => AuditResolution::Confirmed(tx_ref.clone()),
            Err(e) => AuditResolution::Failed(e.to_string()),
        };
        if let Err(e) = self.audit.resolve(&entry_id, resolution).await {
            warn!(error = %e, "failed to resolve sync audit entry");
        }
        result
    }
}
