//! Resilience configuration.
//!
//! The typed configuration lives in [`resilience`] and is always available.
//! The loader (format detection, `${VAR}` substitution, environment
//! layering) needs the `config` feature.

mod resilience;
pub use resilience::{
    BreakerConfig, HealthConfig, ProviderEndpoint, ProvidersConfig, ResilienceConfig, RetryConfig,
    WorkflowConfig,
};

#[cfg(feature = "config")]
mod loader;
#[cfg(feature = "config")]
pub use loader::{
    ConfigError, ConfigResult, ENV_PREFIX, ENV_SEPARATOR, detect_format, from_str,
    substitute_env_vars,
};
