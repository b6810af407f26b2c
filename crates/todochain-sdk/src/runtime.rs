use std::sync::Arc;

use tracing::info;

use todochain_ledger::{InMemoryContract, LedgerClient, LedgerContext};
use todochain_store::{InMemoryAuditLog, InMemoryTodoStore};
use todochain_sync::{RetryPolicy, RetrySweeper, SweeperHandle, SyncOrchestrator, VerificationService};
use todochain_types::LedgerAddress;

use crate::config::TodoChainConfig;
use crate::error::SdkResult;
use crate::service::TodoService;

/// A fully wired TodoChain instance over the in-memory backends.
///
/// Construction order: configuration, ledger context, stores, orchestrator,
/// then the service and sweeper that share it. Nothing is rebuilt per call.
pub struct TodoRuntime {
    config: TodoChainConfig,
    ledger: LedgerContext,
    store: Arc<InMemoryTodoStore>,
    audit: Arc<InMemoryAuditLog>,
    orchestrator: SyncOrchestrator,
    service: Arc<TodoService>,
    sweeper: Arc<RetrySweeper>,
    sweeper_handle: Option<SweeperHandle>,
}

impl TodoRuntime {
    /// Build a runtime with its own in-memory contract.
    pub fn new(config: TodoChainConfig) -> SdkResult<Self> {
        config.validate()?;
        let ledger = LedgerContext::connect(config.ledger.clone())?;
        Ok(Self::assemble(config, ledger))
    }

    /// Build a runtime that transacts against an existing contract.
    pub fn with_contract(config: TodoChainConfig, contract: Arc<InMemoryContract>) -> SdkResult<Self> {
        config.validate()?;
        let ledger = LedgerContext::with_contract(config.ledger.clone(), contract)?;
        Ok(Self::assemble(config, ledger))
    }

    fn assemble(config: TodoChainConfig, ledger: LedgerContext) -> Self {
        let store = Arc::new(InMemoryTodoStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let client = ledger.client();

        let orchestrator = SyncOrchestrator::new(store.clone(), client.clone(), audit.clone());
        let verifier = VerificationService::new(store.clone(), client);
        let service = Arc::new(TodoService::new(
            store.clone(),
            audit.clone(),
            orchestrator.clone(),
            verifier,
            config.sync.max_retries,
        ));
        let sweeper = Arc::new(RetrySweeper::new(
            orchestrator.clone(),
            store.clone(),
            RetryPolicy::from_config(&config.sync),
            config.sweeper.clone(),
        ));

        Self {
            config,
            ledger,
            store,
            audit,
            orchestrator,
            service,
            sweeper,
            sweeper_handle: None,
        }
    }

    pub fn service(&self) -> &Arc<TodoService> {
        &self.service
    }

    pub fn sweeper(&self) -> &Arc<RetrySweeper> {
        &self.sweeper
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    pub fn store(&self) -> &Arc<InMemoryTodoStore> {
        &self.store
    }

    pub fn audit(&self) -> &Arc<InMemoryAuditLog> {
        &self.audit
    }

    pub fn contract(&self) -> &Arc<InMemoryContract> {
        self.ledger.contract()
    }

    /// Ledger client bound to this runtime's signer.
    pub fn ledger_client(&self) -> Arc<dyn LedgerClient> {
        self.ledger.client()
    }

    pub fn ledger_address(&self) -> LedgerAddress {
        self.ledger.address()
    }

    pub fn config(&self) -> &TodoChainConfig {
        &self.config
    }

    /// Start the background sweeper if it is enabled and not running.
    /// Returns whether it is running afterwards.
    pub fn start_sweeper(&mut self) -> bool {
        if self.sweeper_handle.is_none() && self.config.sweeper.enabled {
            self.sweeper_handle = Some(Arc::clone(&self.sweeper).start());
        }
        self.sweeper_handle.is_some()
    }

    /// Wait for every dispatched sync to finish.
    pub async fn wait_idle(&self) {
        self.orchestrator.wait_idle().await;
    }

    /// Stop the sweeper and drain in-flight syncs.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.sweeper_handle.take() {
            handle.stop().await;
        }
        self.orchestrator.wait_idle().await;
        info!("todochain runtime stopped");
    }
}

impl std::fmt::Debug for TodoRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoRuntime")
            .field("ledger", &self.ledger)
            .field("store", &self.store)
            .field("sweeper_running", &self.sweeper_handle.is_some())
            .finish()
    }
}
