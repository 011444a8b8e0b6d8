use crate::foundation::{Address, ChainId, Result, SyncError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The (chain, wallet address, account) triple one `SyncSession` is scoped
/// to. Caches built for one pair are never reused for another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionPair {
    pub chain: ChainId,
    pub wallet: Address,
    pub account: Address,
}

/// Raw session settings as they appear in the config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub chain_id: u64,
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub account_address: String,
    /// When non-empty, the configured chain must be listed here.
    #[serde(default)]
    pub supported_chain_ids: Vec<u64>,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<SessionPair> {
        if self.chain_id == 0 {
            return Err(SyncError::ConfigError("chain_id must be set".to_string()));
        }
        if !self.supported_chain_ids.is_empty() && !self.supported_chain_ids.contains(&self.chain_id) {
            return Err(SyncError::ConfigError(format!("chain {} is not a supported chain", self.chain_id)));
        }
        let wallet = Address::from_str(&self.wallet_address)
            .map_err(|err| SyncError::ConfigError(format!("wallet_address: {}", err)))?;
        let account = Address::from_str(&self.account_address)
            .map_err(|err| SyncError::ConfigError(format!("account_address: {}", err)))?;
        Ok(SessionPair { chain: ChainId::new(self.chain_id), wallet, account })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Upper bound on any single gateway call.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Delay between resubscription attempts while degraded.
    #[serde(default = "default_resubscribe_interval_ms")]
    pub resubscribe_interval_ms: u64,
    /// Log filter expression, e.g. `"info"` or `"quorum_sync=debug"`.
    #[serde(default = "default_log_filters")]
    pub log_filters: String,
    /// Optional directory for rolling log files.
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

fn default_resubscribe_interval_ms() -> u64 {
    5_000
}

fn default_log_filters() -> String {
    "info".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            resubscribe_interval_ms: default_resubscribe_interval_ms(),
            log_filters: default_log_filters(),
            log_dir: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<SessionPair> {
        if self.runtime.call_timeout_ms == 0 {
            return Err(SyncError::ConfigError("call_timeout_ms must be positive".to_string()));
        }
        if self.runtime.resubscribe_interval_ms == 0 {
            return Err(SyncError::ConfigError("resubscribe_interval_ms must be positive".to_string()));
        }
        self.session.validate()
    }
}
