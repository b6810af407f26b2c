use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use todochain_crypto::compute_hash;
use todochain_ledger::{LedgerClient, LedgerRecord};
use todochain_store::TodoStore;
use todochain_types::{Digest, OwnerId, SyncStatus, TodoId};

use crate::error::{SyncError, SyncResult};

/// Result of checking a todo against its ledger record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// The contract agrees that `primary_hash` is the stored hash.
    pub is_valid: bool,
    /// Freshly computed from the todo's current fields.
    pub primary_hash: Digest,
    /// Hash stored on the ledger.
    pub ledger_hash: Digest,
    /// Hash cached on the todo at its last sync.
    pub cached_hash: Option<Digest>,
    /// Whether the cached hash still equals the fresh one.
    pub cache_matches: bool,
    pub ledger_meta: LedgerRecord,
}

/// Verifies primary-store content against the ledger.
///
/// The hash is always recomputed from the stored fields and compared on the
/// contract side, so a corrupted cached hash cannot mask a mismatch.
pub struct VerificationService {
    store: Arc<dyn TodoStore>,
    ledger: Arc<dyn LedgerClient>,
}

impl VerificationService {
    pub fn new(store: Arc<dyn TodoStore>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { store, ledger }
    }

    pub async fn verify(&self, id: &TodoId, owner: &OwnerId) -> SyncResult<VerificationResult> {
        let todo = self
            .store
            .find_any(id, owner)
            .await?
            .ok_or(SyncError::NotFound(*id))?;
        if todo.sync.status != SyncStatus::Synced {
            return Err(SyncError::NotSynced {
                id: *id,
                status: todo.sync.status,
            });
        }

        let primary_hash = compute_hash(&todo);
        let ledger_meta = self.ledger.get(id).await?;
        let is_valid = self.ledger.verify(id, &primary_hash).await?;
        let cached_hash = todo.sync.ledger_hash;
        let cache_matches = cached_hash == Some(primary_hash);

        if is_valid {
            debug!(todo_id = %id, hash = %primary_hash.short_hex(), "todo verified");
        } else {
            warn!(
                todo_id = %id,
                primary = %primary_hash.short_hex(),
                ledger = %ledger_meta.hash.short_hex(),
                "todo does not match its ledger record"
            );
        }

        Ok(VerificationResult {
            is_valid,
            primary_hash,
            ledger_hash: ledger_meta.hash,
            cached_hash,
            cache_matches,
            ledger_meta,
        })
    }
}

impl std::fmt::Debug for VerificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationService")
            .field("ledger", &self.ledger.address())
            .finish()
    }
}
