//! Sync engine for TodoChain.
//!
//! Keeps the ledger eventually consistent with the primary store. Every
//! mutating todo operation commits to the store first and then hands the
//! todo to the [`SyncOrchestrator`], which pushes its digest in the
//! background. Failures land on the todo's sync envelope, where the
//! [`RetrySweeper`] finds them again.
//!
//! # Sync Attempt
//!
//! 1. Take the todo's lock; load it and note its revision.
//! 2. A `failed` todo is flipped back to `pending` for the retry.
//! 3. No ledger hash yet: `create` (then `delete` if already soft-deleted).
//!    An existing record falls through to step 4.
//! 4. Otherwise read the record and send whatever [`plan_steps`] returns.
//! 5. Write the outcome conditionally on the noted revision. A newer
//!    revision wins; its own attempt is already queued.

pub mod backoff;
pub mod config;
pub mod error;
pub mod locks;
pub mod orchestrator;
pub mod sweeper;
pub mod verifier;

pub use backoff::RetryPolicy;
pub use config::{SweeperConfig, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use locks::{KeyedLocks, SyncPermit};
pub use orchestrator::{intent_for, plan_steps, LedgerStep, SyncOrchestrator, SyncOutcome};
pub use sweeper::{RetrySweeper, SweepReport, SweeperHandle};
pub use verifier::{VerificationResult, VerificationService};
