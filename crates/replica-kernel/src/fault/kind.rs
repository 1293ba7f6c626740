//! The closed error vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every failure above the transport boundary is one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    AlreadyExists,
    RateLimited,
    QuotaExceeded,
    InvalidInput,
    MissingField,
    InvalidFormat,
    ServiceError,
    ServiceUnavailable,
    Timeout,
    NetworkError,
    ConnectionFailed,
    ApiError,
    ExternalApiError,
    MigrationError,
    FallbackFailed,
    NotConfigured,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 20] = [
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::NotFound,
        ErrorKind::AlreadyExists,
        ErrorKind::RateLimited,
        ErrorKind::QuotaExceeded,
        ErrorKind::InvalidInput,
        ErrorKind::MissingField,
        ErrorKind::InvalidFormat,
        ErrorKind::ServiceError,
        ErrorKind::ServiceUnavailable,
        ErrorKind::Timeout,
        ErrorKind::NetworkError,
        ErrorKind::ConnectionFailed,
        ErrorKind::ApiError,
        ErrorKind::ExternalApiError,
        ErrorKind::MigrationError,
        ErrorKind::FallbackFailed,
        ErrorKind::NotConfigured,
        ErrorKind::Unknown,
    ];

    /// Default kind for an HTTP status before any body refinement.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::InvalidInput,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::AlreadyExists,
            422 => ErrorKind::InvalidFormat,
            429 => ErrorKind::RateLimited,
            500 => ErrorKind::ServiceError,
            502 | 503 => ErrorKind::ServiceUnavailable,
            504 => ErrorKind::Timeout,
            _ => ErrorKind::Unknown,
        }
    }

    /// Fixed user-facing text. Never built from provider output.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "Authentication required. Please log in and try again.",
            ErrorKind::Forbidden => "You do not have permission to perform this action.",
            ErrorKind::NotFound => "The requested resource was not found.",
            ErrorKind::AlreadyExists => "This resource already exists.",
            ErrorKind::RateLimited => "Too many requests. Please wait a moment and try again.",
            ErrorKind::QuotaExceeded => {
                "You have exceeded your usage quota. Please contact support."
            }
            ErrorKind::InvalidInput => {
                "The provided input is invalid. Please check your data and try again."
            }
            ErrorKind::MissingField => {
                "Required information is missing. Please provide all required fields."
            }
            ErrorKind::InvalidFormat => "The data format is incorrect. Please check and try again.",
            ErrorKind::ServiceError => "An internal error occurred. Please try again later.",
            ErrorKind::ServiceUnavailable => {
                "The service is temporarily unavailable. Please try again later."
            }
            ErrorKind::Timeout => "The request timed out. Please try again.",
            ErrorKind::NetworkError => {
                "A network error occurred. Please check your connection and try again."
            }
            ErrorKind::ConnectionFailed => {
                "Failed to connect to the service. Please try again later."
            }
            ErrorKind::ApiError => "An API error occurred. Please try again.",
            ErrorKind::ExternalApiError => {
                "An external service error occurred. Please try again later."
            }
            ErrorKind::MigrationError => "A migration error occurred. Please contact support.",
            ErrorKind::FallbackFailed => {
                "Primary and fallback services failed. Please try again later."
            }
            ErrorKind::NotConfigured => {
                "The service is not properly configured. Please contact support."
            }
            ErrorKind::Unknown => "An unexpected error occurred. Please try again.",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::MissingField => "MISSING_FIELD",
            ErrorKind::InvalidFormat => "INVALID_FORMAT",
            ErrorKind::ServiceError => "SERVICE_ERROR",
            ErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::ConnectionFailed => "CONNECTION_FAILED",
            ErrorKind::ApiError => "API_ERROR",
            ErrorKind::ExternalApiError => "EXTERNAL_API_ERROR",
            ErrorKind::MigrationError => "MIGRATION_ERROR",
            ErrorKind::FallbackFailed => "FALLBACK_FAILED",
            ErrorKind::NotConfigured => "NOT_CONFIGURED",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Transient kinds worth another attempt against the same provider.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout
                | ErrorKind::ServiceUnavailable
                | ErrorKind::NetworkError
                | ErrorKind::ConnectionFailed
                | ErrorKind::RateLimited
        )
    }

    /// Kinds the caller has to fix; a second provider would reject them too.
    pub fn is_client_correctable(self) -> bool {
        matches!(
            self,
            ErrorKind::Unauthorized
                | ErrorKind::Forbidden
                | ErrorKind::NotFound
                | ErrorKind::InvalidInput
                | ErrorKind::InvalidFormat
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
