//! Ledger side of TodoChain.
//!
//! Each todo's content digest is mirrored to a contract keyed by the todo
//! ID. The contract records who created each entry and rejects writes from
//! anyone else, so a record can only move forward under its creator's key.
//!
//! # Components
//!
//! - [`LedgerClient`] -- the six contract operations, async and confirmed
//! - [`InMemoryContract`] -- shared chain state with latency and fault injection
//! - [`ContractClient`] -- a [`LedgerClient`] bound to one signing key
//! - [`LedgerContext`] -- process-scoped signer and client, built once at startup
//!
//! # Design Rules
//!
//! 1. Writes return only after confirmation or a typed error.
//! 2. `Timeout` and `Transport` are transient; every other error is final for
//!    the call that produced it.
//! 3. Conversions to chain-native types live in [`convert`] and nowhere else.

pub mod context;
pub mod convert;
pub mod error;
pub mod memory;
pub mod records;
pub mod traits;

pub use context::{LedgerContext, NetworkConfig};
pub use error::{LedgerError, LedgerResult};
pub use memory::{ContractClient, Fault, InMemoryContract};
pub use records::{ContractCall, LedgerRecord, RawRecord, SignedCall};
pub use traits::LedgerClient;
