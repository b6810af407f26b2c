//! High-level SDK for TodoChain.
//!
//! [`TodoRuntime`] wires the ledger context, stores, sync orchestrator,
//! verifier, and retry sweeper together; [`TodoService`] is the API that
//! request handlers call. This is the main entry point for applications
//! embedding TodoChain.

pub mod config;
pub mod error;
pub mod runtime;
pub mod service;

#[cfg(test)]
mod scenarios;

pub use config::TodoChainConfig;
pub use error::{ErrorKind, SdkError, SdkResult};
pub use runtime::TodoRuntime;
pub use service::TodoService;

// Re-export key types
pub use todochain_ledger::{LedgerRecord, NetworkConfig};
pub use todochain_store::TodoFilter;
pub use todochain_sync::{SweepReport, SweeperConfig, SyncConfig, VerificationResult};
pub use todochain_types::{
    Digest, NewTodo, OwnerId, Priority, SyncAuditEntry, SyncStatus, Todo, TodoId, TodoPatch,
};
