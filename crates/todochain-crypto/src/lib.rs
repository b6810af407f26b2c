//! Cryptographic primitives for TodoChain.
//!
//! Provides the deterministic todo hasher whose digests are mirrored to the
//! ledger, and the Ed25519 signing identity the ledger client transacts as.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::{compute_hash, verify_hash, HashFields, TodoHasher};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
