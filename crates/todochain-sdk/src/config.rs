use std::path::Path;

use serde::{Deserialize, Serialize};
use todochain_ledger::NetworkConfig;
use todochain_sync::{SweeperConfig, SyncConfig};

use crate::error::{SdkError, SdkResult};

/// Top-level TodoChain configuration. Every section is optional in TOML.
///
/// ```toml
/// [ledger]
/// chain_id = 31337
/// confirmation_timeout_ms = 30000
///
/// [sync]
/// max_retries = 10
/// backoff_secs = [0, 60, 300, 900, 3600, 21600]
///
/// [sweeper]
/// interval_secs = 30
/// batch_size = 50
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoChainConfig {
    pub ledger: NetworkConfig,
    pub sync: SyncConfig,
    pub sweeper: SweeperConfig,
}

impl TodoChainConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn validate(&self) -> SdkResult<()> {
        self.ledger.validate()?;
        self.sync.validate()?;
        self.sweeper.validate()?;
        Ok(())
    }
}
