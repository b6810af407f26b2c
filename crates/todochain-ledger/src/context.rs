use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use todochain_crypto::SigningKey;
use todochain_types::LedgerAddress;
use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::memory::{ContractClient, InMemoryContract};
use crate::traits::LedgerClient;

/// Network and signing configuration for the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Chain the contract lives on (default: 31337, a local dev chain).
    pub chain_id: u64,
    /// JSON-RPC endpoint. Unused by the in-memory contract.
    pub rpc_url: String,
    /// Contract address, `0x`-prefixed hex.
    pub contract_address: String,
    /// Hex-encoded Ed25519 secret. A fresh key is generated when unset.
    pub signer_key: Option<String>,
    /// How long a write may wait for confirmation (default: 30 s).
    pub confirmation_timeout_ms: u64,
    /// Simulated confirmation latency of the in-memory contract.
    pub simulated_latency_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: 31337,
            rpc_url: "http://127.0.0.1:8545".into(),
            contract_address: format!("0x{}", "00".repeat(19) + "01"),
            signer_key: None,
            confirmation_timeout_ms: 30_000,
            simulated_latency_ms: 0,
        }
    }
}

impl NetworkConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.confirmation_timeout_ms == 0 {
            return Err(LedgerError::Config(
                "confirmation_timeout_ms must be greater than zero".into(),
            ));
        }
        LedgerAddress::from_hex(&self.contract_address)
            .map_err(|e| LedgerError::Config(format!("contract_address: {e}")))?;
        Ok(())
    }
}

/// Process-scoped ledger context.
///
/// Built once at startup: configuration, then signer, then the signer's
/// address, then the bound contract client. Components receive the client
/// from here and never construct their own.
pub struct LedgerContext {
    config: NetworkConfig,
    signer: Arc<SigningKey>,
    contract: Arc<InMemoryContract>,
    client: Arc<ContractClient>,
}

impl LedgerContext {
    /// Connect to a fresh in-memory contract described by `config`.
    pub fn connect(config: NetworkConfig) -> LedgerResult<Self> {
        config.validate()?;
        let address = LedgerAddress::from_hex(&config.contract_address)
            .map_err(|e| LedgerError::Config(format!("contract_address: {e}")))?;
        let contract = Arc::new(InMemoryContract::new(address, config.chain_id));
        contract.set_latency(config.simulated_latency());
        Self::with_contract(config, contract)
    }

    /// Bind to an existing contract, e.g. one shared by several signers.
    pub fn with_contract(config: NetworkConfig, contract: Arc<InMemoryContract>) -> LedgerResult<Self> {
        config.validate()?;
        let signer = match &config.signer_key {
            Some(hex) => SigningKey::from_hex(hex)
                .map_err(|e| LedgerError::Config(format!("signer_key: {e}")))?,
            None => {
                warn!("no signer key configured, generating an ephemeral one");
                SigningKey::generate()
            }
        };
        let signer = Arc::new(signer);
        let client = Arc::new(ContractClient::new(
            Arc::clone(&contract),
            Arc::clone(&signer),
            config.confirmation_timeout(),
        ));
        info!(
            chain_id = config.chain_id,
            contract = %contract.address(),
            signer = %signer.address(),
            "ledger context ready"
        );
        Ok(Self {
            config,
            signer,
            contract,
            client,
        })
    }

    /// The ledger client bound to this context's signer.
    pub fn client(&self) -> Arc<dyn LedgerClient> {
        self.client.clone()
    }

    /// Address the context transacts as.
    pub fn address(&self) -> LedgerAddress {
        self.signer.address()
    }

    pub fn contract(&self) -> &Arc<InMemoryContract> {
        &self.contract
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

impl std::fmt::Debug for LedgerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerContext")
            .field("chain_id", &self.config.chain_id)
            .field("address", &self.address())
            .field("contract", &self.contract.address())
            .finish()
    }
}
