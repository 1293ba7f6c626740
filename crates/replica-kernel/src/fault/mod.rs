//! Error taxonomy and the normalizer.
//!
//! [`normalize`] is the single place where provider failures acquire an
//! [`ErrorKind`]. It is pure: the result depends only on the transport code,
//! the HTTP status and substrings of the error body. Rules apply in order:
//!
//! 1. Transport codes win over everything else.
//! 2. The HTTP status picks a default kind ([`ErrorKind::from_http_status`]).
//! 3. Body substrings may refine a 4xx kind. 5xx kinds, transport kinds and
//!    unmapped statuses are never refined.
//!
//! The user-facing message is always looked up from the kind.

mod kind;
mod normalized;
mod raw;

pub use kind::ErrorKind;
pub use normalized::{FallbackCauses, NormalizedError};
pub use raw::{RawError, TransportCode};

use crate::provider::ProviderId;

/// Map a raw provider failure onto the fixed vocabulary.
///
/// An error that is already normalized is returned unchanged, so feeding a
/// [`NormalizedError`] back through is idempotent.
pub fn normalize(raw: &RawError, provider: &ProviderId) -> NormalizedError {
    match raw {
        RawError::Normalized(err) => err.clone(),
        RawError::Transport { code, message } => {
            NormalizedError::new(transport_kind(*code), message.clone(), provider.clone())
        }
        RawError::Http {
            status,
            message,
            body,
        } => {
            let default = ErrorKind::from_http_status(*status);
            let kind = match body.as_deref() {
                Some(body) => refine(*status, default, &body_text(body)),
                None => default,
            };
            NormalizedError::new(kind, message.clone(), provider.clone()).with_http_status(*status)
        }
        RawError::Other(message) => {
            NormalizedError::new(ErrorKind::Unknown, message.clone(), provider.clone())
        }
    }
}

/// Whether another attempt against the same provider may succeed.
pub fn is_retryable(err: &NormalizedError) -> bool {
    err.kind().is_retryable()
}

/// Whether a failure of `from` should be retried against the secondary.
///
/// Only primary failures fall back, and client-correctable kinds never do:
/// a secondary success must not hide an authorization or validation error.
pub fn should_fallback(err: &NormalizedError, from: &ProviderId) -> bool {
    from.is_primary() && !err.kind().is_client_correctable()
}

fn transport_kind(code: TransportCode) -> ErrorKind {
    match code {
        TransportCode::ConnectionRefused | TransportCode::HostNotFound => {
            ErrorKind::ConnectionFailed
        }
        TransportCode::TimedOut | TransportCode::Aborted => ErrorKind::Timeout,
        TransportCode::ConnectionReset | TransportCode::Other => ErrorKind::NetworkError,
    }
}

fn refine(status: u16, default: ErrorKind, body: &str) -> ErrorKind {
    let has = |needle: &str| body.contains(needle);
    match status {
        400 => {
            if has("rate limit") {
                ErrorKind::RateLimited
            } else if has("quota") || has("limit") {
                ErrorKind::QuotaExceeded
            } else if has("required") || has("missing") {
                ErrorKind::MissingField
            } else if has("format") {
                ErrorKind::InvalidFormat
            } else {
                default
            }
        }
        422 if has("required") || has("missing") => ErrorKind::MissingField,
        429 if has("quota") => ErrorKind::QuotaExceeded,
        _ => default,
    }
}

/// Lowercased text to match refinement substrings against.
///
/// JSON bodies contribute their `error`, `message` and `detail` strings
/// (including `error.message`); anything else is matched verbatim.
fn body_text(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_lowercase();
    };

    let mut parts = Vec::new();
    for key in ["error", "message", "detail"] {
        match value.get(key) {
            Some(serde_json::Value::String(s)) => parts.push(s.as_str()),
            Some(serde_json::Value::Object(inner)) => {
                if let Some(serde_json::Value::String(s)) = inner.get("message") {
                    parts.push(s.as_str());
                }
            }
            _ => {}
        }
    }

    if parts.is_empty() {
        body.to_lowercase()
    } else {
        parts.join(" ").to_lowercase()
    }
}
