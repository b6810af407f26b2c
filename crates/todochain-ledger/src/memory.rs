use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use todochain_crypto::SigningKey;
use todochain_types::{time, Digest, LedgerAddress, TodoId, TxRef};
use tracing::debug;

use crate::convert;
use crate::error::{LedgerError, LedgerResult};
use crate::records::{ContractCall, LedgerRecord, RawRecord, SignedCall};
use crate::traits::LedgerClient;

/// A scripted failure for the next write submitted to an [`InMemoryContract`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Reject the transaction with this error; state is untouched.
    Fail(LedgerError),
    /// Apply the transaction, then lose the receipt: the caller sees a
    /// transport error although the write landed.
    LostReceipt,
}

/// In-memory content-hash contract for tests, local demos, and embedding.
///
/// Holds the shared chain state. Any number of [`ContractClient`]s, each
/// with its own signing key, can transact against one contract; ownership
/// checks use the address recovered from each call's signature.
pub struct InMemoryContract {
    address: LedgerAddress,
    chain_id: u64,
    inner: RwLock<ContractState>,
    faults: Mutex<VecDeque<Fault>>,
    latency_ms: AtomicU64,
}

#[derive(Default)]
struct ContractState {
    records: HashMap<String, RawRecord>,
    tx_count: u64,
}

impl InMemoryContract {
    pub fn new(address: LedgerAddress, chain_id: u64) -> Self {
        Self {
            address,
            chain_id,
            inner: RwLock::new(ContractState::default()),
            faults: Mutex::new(VecDeque::new()),
            latency_ms: AtomicU64::new(0),
        }
    }

    pub fn address(&self) -> LedgerAddress {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Simulated time between submission and confirmation.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms.load(Ordering::SeqCst))
    }

    /// Queue a fault for the next write.
    pub fn inject(&self, fault: Fault) {
        self.inject_n(fault, 1);
    }

    /// Queue the same fault for the next `count` writes.
    pub fn inject_n(&self, fault: Fault, count: usize) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.extend(std::iter::repeat(fault).take(count));
        }
    }

    /// Drop all queued faults.
    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.clear();
        }
    }

    /// Number of confirmed transactions.
    pub fn tx_count(&self) -> u64 {
        self.inner.read().map(|s| s.tx_count).unwrap_or(0)
    }

    /// Number of records, deleted or not.
    pub fn len(&self) -> usize {
        self.inner.read().map(|s| s.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite a stored hash without any checks, the way an out-of-band
    /// edit to chain state would look. Returns `false` if absent.
    pub fn overwrite_hash(&self, key: &str, hash: [u8; 32]) -> bool {
        let Ok(mut state) = self.inner.write() else {
            return false;
        };
        match state.records.get_mut(key) {
            Some(record) => {
                record.hash = hash;
                true
            }
            None => false,
        }
    }

    /// Read a record by key.
    pub fn record(&self, key: &str) -> LedgerResult<Option<RawRecord>> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.records.get(key).cloned())
    }

    /// Execute a signed write and return its transaction reference.
    pub fn execute(&self, signed: &SignedCall) -> LedgerResult<TxRef> {
        if signed.chain_id != self.chain_id {
            return Err(LedgerError::InvalidArgument(format!(
                "wrong chain id {} (expected {})",
                signed.chain_id, self.chain_id
            )));
        }
        let sender = signed
            .recover_sender()
            .ok_or_else(|| LedgerError::InvalidArgument("invalid transaction signature".into()))?;

        let fault = self.faults.lock().map_err(|_| poisoned())?.pop_front();
        if let Some(Fault::Fail(err)) = &fault {
            return Err(err.clone());
        }
        let lost_receipt = fault == Some(Fault::LostReceipt);

        let mut state = self.inner.write().map_err(|_| poisoned())?;
        Self::apply(&mut state, &signed.call, sender)?;
        state.tx_count += 1;
        let tx_ref = self.tx_ref(state.tx_count, signed);
        drop(state);

        debug!(method = signed.call.method(), key = signed.call.key(), %tx_ref, "contract call confirmed");

        if lost_receipt {
            return Err(LedgerError::Transport(format!(
                "receipt for {} lost",
                signed.call.method()
            )));
        }
        Ok(tx_ref)
    }

    fn apply(state: &mut ContractState, call: &ContractCall, sender: LedgerAddress) -> LedgerResult<()> {
        let key = call.key();
        if key.is_empty() {
            return Err(LedgerError::InvalidArgument("record key must not be empty".into()));
        }

        if let ContractCall::Create { hash, .. } = call {
            if *hash == [0u8; 32] {
                return Err(LedgerError::InvalidArgument("hash must not be zero".into()));
            }
            if state.records.contains_key(key) {
                return Err(LedgerError::AlreadyExists(key.to_string()));
            }
            state.records.insert(
                key.to_string(),
                RawRecord {
                    hash: *hash,
                    owner: sender,
                    timestamp: convert::to_unix_seconds(&time::now_millis()),
                    deleted: false,
                },
            );
            return Ok(());
        }

        let record = state
            .records
            .get_mut(key)
            .ok_or_else(|| LedgerError::NotFound(key.to_string()))?;
        if record.owner != sender {
            return Err(LedgerError::NotOwner {
                id: key.to_string(),
                caller: sender,
            });
        }

        match call {
            ContractCall::Create { .. } => return Err(LedgerError::AlreadyExists(key.to_string())),
            ContractCall::Update { hash, .. } => {
                if *hash == [0u8; 32] {
                    return Err(LedgerError::InvalidArgument("hash must not be zero".into()));
                }
                if record.deleted {
                    return Err(LedgerError::AlreadyDeleted(key.to_string()));
                }
                record.hash = *hash;
            }
            ContractCall::Delete { .. } => {
                if record.deleted {
                    return Err(LedgerError::AlreadyDeleted(key.to_string()));
                }
                record.deleted = true;
            }
            ContractCall::Restore { .. } => {
                if !record.deleted {
                    return Err(LedgerError::NotDeleted(key.to_string()));
                }
                record.deleted = false;
            }
        }
        Ok(())
    }

    fn tx_ref(&self, seq: u64, signed: &SignedCall) -> TxRef {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"todochain-receipt-v1:");
        hasher.update(self.address.as_bytes());
        hasher.update(&seq.to_be_bytes());
        hasher.update(&signed.call.signing_payload(signed.chain_id, signed.nonce));
        TxRef::new(format!("0x{}", hex::encode(hasher.finalize().as_bytes())))
    }
}

impl std::fmt::Debug for InMemoryContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContract")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("records", &self.len())
            .finish()
    }
}

fn poisoned() -> LedgerError {
    LedgerError::Transport("contract state lock poisoned".into())
}

/// [`LedgerClient`] bound to one signing key and one [`InMemoryContract`].
pub struct ContractClient {
    contract: Arc<InMemoryContract>,
    signer: Arc<SigningKey>,
    address: LedgerAddress,
    confirmation_timeout: Duration,
    nonce: AtomicU64,
}

impl ContractClient {
    pub fn new(
        contract: Arc<InMemoryContract>,
        signer: Arc<SigningKey>,
        confirmation_timeout: Duration,
    ) -> Self {
        let address = signer.address();
        Self {
            contract,
            signer,
            address,
            confirmation_timeout,
            nonce: AtomicU64::new(0),
        }
    }

    pub fn contract(&self) -> &Arc<InMemoryContract> {
        &self.contract
    }

    /// Sign, submit, and wait for confirmation. A confirmation that does not
    /// arrive within the timeout is abandoned before it is applied.
    async fn submit(&self, call: ContractCall) -> LedgerResult<TxRef> {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let signed = SignedCall::sign(call, self.contract.chain_id(), nonce, &self.signer);
        let latency = self.contract.latency();
        let confirm = async {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            self.contract.execute(&signed)
        };
        tokio::time::timeout(self.confirmation_timeout, confirm)
            .await
            .map_err(|_| LedgerError::Timeout(self.confirmation_timeout))?
    }

    fn read(&self, id: &TodoId) -> LedgerResult<RawRecord> {
        let key = convert::record_key(id);
        self.contract
            .record(&key)?
            .ok_or(LedgerError::NotFound(key))
    }
}

#[async_trait]
impl LedgerClient for ContractClient {
    fn address(&self) -> LedgerAddress {
        self.address
    }

    async fn create(&self, id: &TodoId, hash: &Digest) -> LedgerResult<TxRef> {
        self.submit(ContractCall::Create {
            key: convert::record_key(id),
            hash: convert::to_bytes32(hash),
        })
        .await
    }

    async fn update(&self, id: &TodoId, hash: &Digest) -> LedgerResult<TxRef> {
        self.submit(ContractCall::Update {
            key: convert::record_key(id),
            hash: convert::to_bytes32(hash),
        })
        .await
    }

    async fn delete(&self, id: &TodoId) -> LedgerResult<TxRef> {
        self.submit(ContractCall::Delete {
            key: convert::record_key(id),
        })
        .await
    }

    async fn restore(&self, id: &TodoId) -> LedgerResult<TxRef> {
        self.submit(ContractCall::Restore {
            key: convert::record_key(id),
        })
        .await
    }

    async fn verify(&self, id: &TodoId, expected: &Digest) -> LedgerResult<bool> {
        let record = self.read(id)?;
        Ok(record.hash == convert::to_bytes32(expected))
    }

    async fn get(&self, id: &TodoId) -> LedgerResult<LedgerRecord> {
        self.read(id)?.to_record()
    }
}

impl std::fmt::Debug for ContractClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractClient")
            .field("address", &self.address)
            .field("contract", &self.contract.address())
            .finish()
    }
}
