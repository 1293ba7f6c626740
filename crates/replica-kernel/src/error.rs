//! Crate-level error types for `replica-kernel`.
//!
//! Provides a unified [`KernelError`] for the fallible kernel surfaces
//! (configuration loading and validation, IO, serialization) together with
//! [`error_stack::Report`] for context-carrying propagation.
//!
//! Remote call failures are not kernel errors: they travel as
//! [`RawError`](crate::fault::RawError) until the normalizer turns them into
//! a [`NormalizedError`](crate::fault::NormalizedError).
//!
//! # Usage
//!
//! ```rust,ignore
//! use replica_kernel::error::{KernelError, KernelResult};
//! use error_stack::ResultExt;
//!
//! fn load() -> KernelResult<ResilienceConfig> {
//!     ResilienceConfig::load(Some(Path::new("replica.yaml")))
//!         .attach("loading replica.yaml")
//! }
//! ```

use thiserror::Error;

/// Crate-level error type for `replica-kernel`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    /// A configuration-related error (requires the `config` feature).
    #[cfg(feature = "config")]
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A configuration value that parsed but makes no sense.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A low-level I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal / untyped error described by a message string.
    #[error("{0}")]
    Internal(String),
}

/// Convenience result alias using [`error_stack::Report`].
///
/// Equivalent to `Result<T, error_stack::Report<KernelError>>`.
pub type KernelResult<T> = Result<T, error_stack::Report<KernelError>>;
