use async_trait::async_trait;
use todochain_types::{Digest, LedgerAddress, TodoId, TxRef};

use crate::error::LedgerResult;
use crate::records::LedgerRecord;

/// Gateway to the content-hash contract.
///
/// Each method maps to one contract entry point. Write methods return only
/// once the transaction is confirmed, which takes on the order of seconds:
/// never call them on a latency-sensitive request path.
///
/// Implementations hold no state beyond their connection and signing
/// context. The signing identity is the caller for ownership checks.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Address this client transacts as.
    fn address(&self) -> LedgerAddress;

    /// Record `hash` for a new `id`.
    ///
    /// Fails with `AlreadyExists` if a record is present and with
    /// `InvalidArgument` for a zero hash.
    async fn create(&self, id: &TodoId, hash: &Digest) -> LedgerResult<TxRef>;

    /// Replace the hash of an existing, non-deleted record owned by the caller.
    async fn update(&self, id: &TodoId, hash: &Digest) -> LedgerResult<TxRef>;

    /// Flag a record deleted. Fails with `AlreadyDeleted` if it already is.
    async fn delete(&self, id: &TodoId) -> LedgerResult<TxRef>;

    /// Clear the deletion flag. Fails with `NotDeleted` if it is not set.
    async fn restore(&self, id: &TodoId) -> LedgerResult<TxRef>;

    /// Compare `expected` with the stored hash on the contract side.
    async fn verify(&self, id: &TodoId, expected: &Digest) -> LedgerResult<bool>;

    /// Fetch the stored record.
    async fn get(&self, id: &TodoId) -> LedgerResult<LedgerRecord>;
}
