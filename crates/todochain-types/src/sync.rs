use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::{Digest, TxRef};
use crate::ids::TodoId;

/// Persisted ledger-synchronization status of a todo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    /// Whether an envelope write may move a todo from `self` to `next`.
    ///
    /// `synced -> pending` is deliberately absent: only a semantic mutation
    /// (which goes through the field-update path) starts a new cycle.
    pub fn allows(&self, next: SyncStatus) -> bool {
        use SyncStatus::*;
        matches!(
            (self, next),
            (Pending, _) | (Failed, _) | (Synced, Synced)
        )
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Synced => write!(f, "synced"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The subset of a todo tracking its ledger-synchronization state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEnvelope {
    #[serde(rename = "syncStatus")]
    pub status: SyncStatus,
    #[serde(rename = "ledgerHash")]
    pub ledger_hash: Option<Digest>,
    #[serde(rename = "ledgerTxRef")]
    pub tx_ref: Option<TxRef>,
    #[serde(rename = "lastSyncedAt")]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(rename = "lastSyncAttemptAt")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(rename = "syncRetryCount")]
    pub retry_count: u32,
    #[serde(rename = "lastSyncError")]
    pub last_error: Option<String>,
}

impl SyncEnvelope {
    /// Envelope of a todo that has never been pushed.
    pub fn pending() -> Self {
        Self::default()
    }

    /// `true` once some content hash has been confirmed on the ledger.
    pub fn has_ledger_record(&self) -> bool {
        self.ledger_hash.is_some()
    }

    /// Start a fresh sync cycle after a mutation. The last confirmed hash and
    /// tx reference stay so the orchestrator knows a ledger record exists.
    pub fn reset_for_mutation(&mut self) {
        self.status = SyncStatus::Pending;
        self.retry_count = 0;
        self.last_error = None;
    }

    /// Apply an envelope patch. The caller has already checked the
    /// transition and revision.
    pub fn apply(&mut self, patch: &SyncEnvelopePatch, now: DateTime<Utc>) {
        self.status = patch.status;
        self.last_attempt_at = Some(now);
        match patch.status {
            SyncStatus::Pending => {}
            SyncStatus::Synced => {
                if let Some(hash) = patch.ledger_hash {
                    self.ledger_hash = Some(hash);
                }
                if let Some(tx_ref) = &patch.tx_ref {
                    self.tx_ref = Some(tx_ref.clone());
                }
                self.last_synced_at = Some(now);
                self.retry_count = 0;
                self.last_error = None;
            }
            SyncStatus::Failed => {
                if let Some(error) = &patch.error {
                    self.last_error = Some(error.clone());
                    self.retry_count += 1;
                }
            }
        }
    }
}

/// Atomic update of a todo's sync envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncEnvelopePatch {
    pub status: SyncStatus,
    pub ledger_hash: Option<Digest>,
    pub tx_ref: Option<TxRef>,
    pub error: Option<String>,
    /// Apply only if the todo is still at this revision.
    pub expected_revision: Option<u64>,
}

impl SyncEnvelopePatch {
    /// Mark a retry attempt as started.
    pub fn attempt() -> Self {
        Self {
            status: SyncStatus::Pending,
            ledger_hash: None,
            tx_ref: None,
            error: None,
            expected_revision: None,
        }
    }

    /// Mark the todo synced at `hash`. `tx_ref` is `None` when the ledger
    /// already matched and no transaction was sent.
    pub fn synced(hash: Digest, tx_ref: Option<TxRef>) -> Self {
        Self {
            status: SyncStatus::Synced,
            ledger_hash: Some(hash),
            tx_ref,
            error: None,
            expected_revision: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::Failed,
            ledger_hash: None,
            tx_ref: None,
            error: Some(error.into()),
            expected_revision: None,
        }
    }

    pub fn at_revision(mut self, revision: u64) -> Self {
        self.expected_revision = Some(revision);
        self
    }
}

/// Ledger operation a sync attempt performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
    Restore,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

/// Outcome of an audited ledger write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Pending,
    Confirmed,
    Failed,
}

/// Identifier of an audit entry (UUID v7).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditEntryId(uuid::Uuid);

impl AuditEntryId {
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One attempted ledger write. Appended `pending`, resolved exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAuditEntry {
    pub id: AuditEntryId,
    pub todo_id: TodoId,
    pub operation: SyncOperation,
    pub outcome: AuditOutcome,
    pub hash: Option<Digest>,
    pub tx_ref: Option<TxRef>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SyncAuditEntry {
    pub fn pending(
        todo_id: TodoId,
        operation: SyncOperation,
        hash: Option<Digest>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            todo_id,
            operation,
            outcome: AuditOutcome::Pending,
            hash,
            tx_ref: None,
            error: None,
            created_at: now,
            resolved_at: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome != AuditOutcome::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now_millis;

    #[test]
    fn allowed_transitions() {
        use SyncStatus::*;
        assert!(Pending.allows(Synced));
        assert!(Pending.allows(Failed));
        assert!(Failed.allows(Pending));
        assert!(Failed.allows(Synced));
        assert!(Failed.allows(Failed));
        assert!(Synced.allows(Synced));
        assert!(!Synced.allows(Pending));
        assert!(!Synced.allows(Failed));
    }

    #[test]
    fn failure_increments_retry_count_once_per_write() {
        let mut env = SyncEnvelope::pending();
        let patch = SyncEnvelopePatch::failed("timeout");
        env.apply(&patch, now_millis());
        assert_eq!(env.retry_count, 1);
        env.apply(&patch, now_millis());
        assert_eq!(env.retry_count, 2);
        assert_eq!(env.last_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn success_resets_retries_and_records_hash() {
        let mut env = SyncEnvelope::pending();
        env.apply(&SyncEnvelopePatch::failed("boom"), now_millis());
        let hash = Digest::from_bytes([7; 32]);
        env.apply(
            &SyncEnvelopePatch::synced(hash, Some(TxRef::new("0x01"))),
            now_millis(),
        );
        assert_eq!(env.status, SyncStatus::Synced);
        assert_eq!(env.ledger_hash, Some(hash));
        assert_eq!(env.retry_count, 0);
        assert!(env.last_error.is_none());
        assert!(env.last_synced_at.is_some());
    }

    #[test]
    fn synced_without_tx_keeps_previous_reference() {
        let mut env = SyncEnvelope::pending();
        let hash = Digest::from_bytes([7; 32]);
        env.apply(&SyncEnvelopePatch::synced(hash, Some(TxRef::new("0xaa"))), now_millis());
        env.apply(&SyncEnvelopePatch::synced(hash, None), now_millis());
        assert_eq!(env.tx_ref, Some(TxRef::new("0xaa")));
    }

    #[test]
    fn mutation_reset_keeps_ledger_hash() {
        let mut env = SyncEnvelope::pending();
        let hash = Digest::from_bytes([9; 32]);
        env.apply(&SyncEnvelopePatch::synced(hash, None), now_millis());
        env.reset_for_mutation();
        assert_eq!(env.status, SyncStatus::Pending);
        assert!(env.has_ledger_record());
    }

    #[test]
    fn envelope_field_names() {
        let json = serde_json::to_value(SyncEnvelope::pending()).unwrap();
        for key in [
            "syncStatus",
            "ledgerHash",
            "ledgerTxRef",
            "lastSyncedAt",
            "lastSyncAttemptAt",
            "syncRetryCount",
            "lastSyncError",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
