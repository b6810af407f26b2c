//! Foundation types for TodoChain.
//!
//! TodoChain keeps todos in a primary document store and mirrors a content
//! digest of each one to a ledger contract. This crate holds the shapes both
//! sides agree on. Every other TodoChain crate depends on `todochain-types`.
//!
//! # Key Types
//!
//! - [`Todo`]: the primary-store record, including its [`SyncEnvelope`]
//! - [`TodoId`] / [`OwnerId`]: record and owner identifiers
//! - [`Digest`]: 256-bit content hash, `0x`-prefixed hex on the wire
//! - [`LedgerAddress`] / [`TxRef`]: ledger-side identity and receipts
//! - [`SyncAuditEntry`]: append-only record of attempted ledger writes

pub mod digest;
pub mod error;
pub mod ids;
pub mod sync;
pub mod time;
pub mod todo;

pub use digest::{Digest, LedgerAddress, TxRef};
pub use error::TypeError;
pub use ids::{OwnerId, TodoId};
pub use sync::{
    AuditEntryId, AuditOutcome, SyncAuditEntry, SyncEnvelope, SyncEnvelopePatch, SyncOperation,
    SyncStatus,
};
pub use todo::{CompletionChange, NewTodo, Priority, Todo, TodoPatch};
