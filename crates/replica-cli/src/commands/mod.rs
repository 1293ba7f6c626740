//! CLI command implementations

pub mod config_cmd;
pub mod ingest;
pub mod reconcile;

use crate::error::CliError;
use replica_foundation::{ProviderConfig, providers_from_config};
use replica_kernel::ResilienceConfig;
use std::path::Path;

/// Load and validate configuration from defaults, the optional file and
/// `REPLICA__*` environment variables.
pub fn load_config(path: Option<&Path>) -> Result<ResilienceConfig, CliError> {
    ResilienceConfig::load(path).map_err(|report| CliError::ConfigError(format!("{report:?}")))
}

pub fn providers(config: &ResilienceConfig) -> Result<ProviderConfig, CliError> {
    providers_from_config(config)
        .map_err(|e| CliError::ProviderError(e.to_string()))?
        .ok_or(CliError::NoProviders)
}
