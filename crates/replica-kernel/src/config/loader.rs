//! Configuration loading.
//!
//! Layers, later winning: struct defaults, then an optional file (YAML,
//! TOML or JSON, detected from the extension, with `${VAR}` / `$VAR`
//! substitution), then environment variables such as
//! `REPLICA__RETRY__MAX_ATTEMPTS=5`.

use super::ResilienceConfig;
use crate::error::{KernelError, KernelResult};
use config::{Config as Cfg, Environment, File, FileFormat};
use error_stack::Report;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Environment variable prefix, e.g. `REPLICA__BREAKER__FAILURE_THRESHOLD`.
pub const ENV_PREFIX: &str = "REPLICA";
/// Separator between prefix, section and key.
pub const ENV_SEPARATOR: &str = "__";

static BRACED_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid pattern"));
static BARE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("valid pattern"));

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Detect configuration format from file extension (`yaml`/`yml`, `toml`, `json`).
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Replace `${VAR}` and `$VAR` with the variable's value. Unset variables
/// are left as written.
pub fn substitute_env_vars(content: &str) -> String {
    let braced = BRACED_VAR.replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    BARE_VAR
        .replace_all(&braced, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Parse a configuration string of a known format.
pub fn from_str<T>(content: &str, format: FileFormat) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let substituted = substitute_env_vars(content);

    Cfg::builder()
        .add_source(File::from_str(&substituted, format))
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

impl ResilienceConfig {
    /// Load defaults, then `path` if given, then the process environment,
    /// and validate the result.
    pub fn load(path: Option<&Path>) -> KernelResult<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`ResilienceConfig::load`], reading environment overrides from
    /// `env` instead of the process environment when it is `Some`.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> KernelResult<Self> {
        let mut builder = Cfg::builder();

        if let Some(path) = path {
            let shown = path.display().to_string();
            let format = detect_format(&shown).map_err(|e| {
                Report::new(KernelError::from(e)).attach(format!("config file {shown}"))
            })?;
            let content = std::fs::read_to_string(path).map_err(|e| {
                Report::new(KernelError::from(ConfigError::Io(e)))
                    .attach(format!("reading config file {shown}"))
            })?;
            builder = builder.add_source(File::from_str(&substitute_env_vars(&content), format));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        let config: ResilienceConfig = builder
            .build()
            .map_err(|e| Report::new(KernelError::from(ConfigError::Parse(e.to_string()))))?
            .try_deserialize()
            .map_err(|e| {
                Report::new(KernelError::from(ConfigError::Serialization(e.to_string())))
            })?;

        config.validate()?;
        Ok(config)
    }
}
