//! Conversions between native TodoChain types and the contract's
//! chain-native representation (string keys, `bytes32`, unix seconds).

use chrono::{DateTime, Utc};
use todochain_types::{Digest, TodoId};

use crate::error::{LedgerError, LedgerResult};

/// Contract lookup key for a todo.
pub fn record_key(id: &TodoId) -> String {
    id.to_string()
}

/// Parse a contract key back into a todo ID.
pub fn parse_record_key(key: &str) -> LedgerResult<TodoId> {
    key.parse()
        .map_err(|e| LedgerError::InvalidArgument(format!("record key {key}: {e}")))
}

pub fn to_bytes32(digest: &Digest) -> [u8; 32] {
    *digest.as_bytes()
}

pub fn from_bytes32(bytes: [u8; 32]) -> Digest {
    Digest::from_bytes(bytes)
}

/// Block timestamp as stored by the contract.
pub fn to_unix_seconds(ts: &DateTime<Utc>) -> u64 {
    ts.timestamp().max(0) as u64
}

pub fn from_unix_seconds(secs: u64) -> LedgerResult<DateTime<Utc>> {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| LedgerError::InvalidArgument(format!("timestamp out of range: {secs}")))
}
