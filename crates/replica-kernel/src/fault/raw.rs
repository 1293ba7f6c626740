//! Provider failures as they come off the wire.

use super::NormalizedError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport-level failure codes, independent of any HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportCode {
    ConnectionRefused,
    HostNotFound,
    TimedOut,
    Aborted,
    ConnectionReset,
    Other,
}

impl fmt::Display for TransportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            TransportCode::ConnectionRefused => "connection refused",
            TransportCode::HostNotFound => "host not found",
            TransportCode::TimedOut => "timed out",
            TransportCode::Aborted => "aborted",
            TransportCode::ConnectionReset => "connection reset",
            TransportCode::Other => "transport failure",
        };
        f.write_str(code)
    }
}

/// An unnormalized failure returned by a provider operation.
///
/// Adapters produce these; only the normalizer turns them into a
/// [`NormalizedError`]. An already normalized error may be passed back in
/// through [`RawError::Normalized`] and survives normalization untouched.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RawError {
    #[error("{code}: {message}")]
    Transport { code: TransportCode, message: String },

    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: Option<String>,
    },

    #[error(transparent)]
    Normalized(NormalizedError),

    #[error("{0}")]
    Other(String),
}

impl RawError {
    pub fn transport(code: TransportCode, message: impl Into<String>) -> Self {
        RawError::Transport {
            code,
            message: message.into(),
        }
    }

    /// HTTP failure whose message is taken from the body when one is present.
    pub fn http(status: u16, body: Option<String>) -> Self {
        let message = body
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(|b| b.chars().take(512).collect::<String>())
            .unwrap_or_else(|| format!("request failed with status {status}"));
        RawError::Http {
            status,
            message,
            body,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        RawError::Other(message.into())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RawError::Http { status, .. } => Some(*status),
            RawError::Normalized(e) => e.http_status(),
            _ => None,
        }
    }
}

impl From<NormalizedError> for RawError {
    fn from(err: NormalizedError) -> Self {
        RawError::Normalized(err)
    }
}
