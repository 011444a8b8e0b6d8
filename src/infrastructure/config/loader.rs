//! Configuration loader using Figment for layered config management.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Environment variables (MSIG_* prefix)

use crate::foundation::{Result, SyncError};
use crate::infrastructure::config::types::AppConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::{debug, info};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "quorum-config.toml";

/// Environment variable prefix for config overrides.
///
/// Example: `MSIG_SESSION__CHAIN_ID` -> `session.chain_id`
const ENV_PREFIX: &str = "MSIG_";

/// Load configuration from the default file in `data_dir`.
pub fn load_config(data_dir: &Path) -> Result<AppConfig> {
    let config_path = data_dir.join(DEFAULT_CONFIG_FILE);
    load_config_from_file(&config_path)
}

/// Load configuration from a specific file path.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    info!("loading configuration path={}", path.display());
    let figment = figment_base(path).merge(Env::prefixed(ENV_PREFIX).split("__"));
    let config: AppConfig =
        figment.extract().map_err(|e| SyncError::ConfigError(format!("config extraction failed: {e}")))?;
    config.validate()?;
    debug!(
        "configuration loaded chain_id={} wallet={} call_timeout_ms={}",
        config.session.chain_id, config.session.wallet_address, config.runtime.call_timeout_ms
    );
    Ok(config)
}

fn figment_base(path: &Path) -> Figment {
    Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::file(path))
}
