//! Primary store adapter for TodoChain.
//!
//! The primary store is the source of truth for todos; the ledger only ever
//! mirrors it. Besides owner-scoped CRUD, the store carries the sync
//! envelope of every todo and answers the queries the retry sweeper runs.
//!
//! # Backends
//!
//! - [`InMemoryTodoStore`] -- `HashMap`-based store for tests and embedding
//! - [`InMemoryAuditLog`] -- append-only [`SyncAuditLog`]
//!
//! # Design Rules
//!
//! 1. Owner-facing lookups are keyed by `(owner, id)`.
//! 2. Envelope writes touch only envelope fields and may be conditional on
//!    the todo's revision.
//! 3. Soft-deleted todos stay visible to the sync queries until their
//!    deletion has reached the ledger.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryAuditLog, InMemoryTodoStore};
pub use traits::{AuditResolution, EnvelopeWrite, SyncAuditLog, TodoFilter, TodoStore};
