#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No provider configured; set providers.primary in the config file")]
    NoProviders,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("{ready} of {total} items ingested")]
    Incomplete { ready: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl From<replica_kernel::NormalizedError> for CliError {
    fn from(err: replica_kernel::NormalizedError) -> Self {
        CliError::ProviderError(format!("{} ({})", err, err.message()))
    }
}
