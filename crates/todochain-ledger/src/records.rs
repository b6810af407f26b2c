use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use todochain_crypto::{Signature, SigningKey, VerifyingKey};
use todochain_types::{Digest, LedgerAddress};

use crate::convert;
use crate::error::LedgerResult;

/// A ledger record as seen by TodoChain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub hash: Digest,
    pub owner: LedgerAddress,
    pub timestamp: DateTime<Utc>,
    pub deleted: bool,
}

/// The record exactly as the contract stores it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRecord {
    pub hash: [u8; 32],
    pub owner: LedgerAddress,
    /// Unix seconds of the creating block.
    pub timestamp: u64,
    pub deleted: bool,
}

impl RawRecord {
    pub fn to_record(&self) -> LedgerResult<LedgerRecord> {
        Ok(LedgerRecord {
            hash: convert::from_bytes32(self.hash),
            owner: self.owner,
            timestamp: convert::from_unix_seconds(self.timestamp)?,
            deleted: self.deleted,
        })
    }
}

/// A state-changing contract call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum ContractCall {
    Create { key: String, hash: [u8; 32] },
    Update { key: String, hash: [u8; 32] },
    Delete { key: String },
    Restore { key: String },
}

impl ContractCall {
    pub fn key(&self) -> &str {
        match self {
            Self::Create { key, .. }
            | Self::Update { key, .. }
            | Self::Delete { key }
            | Self::Restore { key } => key,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Create { .. } => "createTodo",
            Self::Update { .. } => "updateTodo",
            Self::Delete { .. } => "deleteTodo",
            Self::Restore { .. } => "restoreTodo",
        }
    }

    /// Bytes covered by the transaction signature.
    pub fn signing_payload(&self, chain_id: u64, nonce: u64) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"todochain-tx-v1:");
        payload.extend_from_slice(&chain_id.to_be_bytes());
        payload.extend_from_slice(&nonce.to_be_bytes());
        payload.extend_from_slice(self.method().as_bytes());
        payload.push(b':');
        payload.extend_from_slice(self.key().as_bytes());
        if let Self::Create { hash, .. } | Self::Update { hash, .. } = self {
            payload.extend_from_slice(hash);
        }
        payload
    }
}

/// A contract call signed by its sender.
#[derive(Clone, Debug)]
pub struct SignedCall {
    pub call: ContractCall,
    pub chain_id: u64,
    pub nonce: u64,
    pub sender: VerifyingKey,
    pub signature: Signature,
}

impl SignedCall {
    pub fn sign(call: ContractCall, chain_id: u64, nonce: u64, key: &SigningKey) -> Self {
        let signature = key.sign(&call.signing_payload(chain_id, nonce));
        Self {
            call,
            chain_id,
            nonce,
            sender: key.verifying_key(),
            signature,
        }
    }

    /// Check the signature and return the sender's address.
    pub fn recover_sender(&self) -> Option<LedgerAddress> {
        let payload = self.call.signing_payload(self.chain_id, self.nonce);
        self.sender
            .verify(&payload, &self.signature)
            .ok()
            .map(|_| self.sender.to_address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_call_recovers_sender() {
        let key = SigningKey::from_bytes([8; 32]);
        let call = ContractCall::Delete { key: "abc".into() };
        let signed = SignedCall::sign(call, 1, 0, &key);
        assert_eq!(signed.recover_sender(), Some(key.address()));
    }

    #[test]
    fn tampered_call_has_no_sender() {
        let key = SigningKey::from_bytes([8; 32]);
        let mut signed = SignedCall::sign(
            ContractCall::Update {
                key: "abc".into(),
                hash: [1; 32],
            },
            1,
            0,
            &key,
        );
        signed.call = ContractCall::Update {
            key: "abc".into(),
            hash: [2; 32],
        };
        assert_eq!(signed.recover_sender(), None);
    }

    #[test]
    fn payload_binds_chain_and_nonce() {
        let call = ContractCall::Restore { key: "k".into() };
        assert_ne!(call.signing_payload(1, 0), call.signing_payload(2, 0));
        assert_ne!(call.signing_payload(1, 0), call.signing_payload(1, 1));
    }

    #[test]
    fn raw_record_converts() {
        let raw = RawRecord {
            hash: [5; 32],
            owner: LedgerAddress::from_bytes([1; 20]),
            timestamp: 1_700_000_000,
            deleted: true,
        };
        let record = raw.to_record().unwrap();
        assert_eq!(record.hash, Digest::from_bytes([5; 32]));
        assert!(record.deleted);
        assert_eq!(record.timestamp.timestamp(), 1_700_000_000);
    }
}
