use super::ErrorKind;
use crate::provider::ProviderId;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// The fixed-vocabulary error every caller above the adapters sees.
///
/// Fields are private; a value is complete once constructed. The builder
/// methods consume `self` and are meant for construction only.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("[{provider}] {kind}: {cause}")]
pub struct NormalizedError {
    kind: ErrorKind,
    message: &'static str,
    cause: String,
    provider: ProviderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_status: Option<u16>,
    occurred_at: DateTime<Utc>,
    #[serde(
        rename = "retry_after_ms",
        serialize_with = "serialize_duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    retry_after: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback_causes: Option<Box<FallbackCauses>>,
}

/// Both sides of a failed primary/secondary pair.
#[derive(Debug, Clone, Serialize)]
pub struct FallbackCauses {
    pub primary: NormalizedError,
    pub secondary: NormalizedError,
}

impl NormalizedError {
    pub fn new(kind: ErrorKind, cause: impl Into<String>, provider: ProviderId) -> Self {
        Self {
            kind,
            message: kind.user_message(),
            cause: cause.into(),
            provider,
            http_status: None,
            occurred_at: Utc::now(),
            retry_after: None,
            fallback_causes: None,
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Rejection by an open breaker. Retryable, and never counted as a new
    /// failure by whoever produced it.
    pub fn circuit_open(provider: ProviderId, retry_after: Option<Duration>) -> Self {
        let cause = match retry_after {
            Some(wait) => format!(
                "circuit breaker for {provider} is open, retry after {}ms",
                wait.as_millis()
            ),
            None => format!("circuit breaker for {provider} is open"),
        };
        let mut err = Self::new(ErrorKind::ServiceUnavailable, cause, provider);
        err.retry_after = retry_after;
        err
    }

    /// Double failure of a primary/secondary pair. Attributed to the secondary.
    pub fn fallback_failed(primary: NormalizedError, secondary: NormalizedError) -> Self {
        let cause = format!(
            "primary {} failed ({}: {}); secondary {} failed ({}: {})",
            primary.provider,
            primary.kind,
            primary.cause,
            secondary.provider,
            secondary.kind,
            secondary.cause
        );
        let mut err = Self::new(ErrorKind::FallbackFailed, cause, secondary.provider.clone());
        err.fallback_causes = Some(Box::new(FallbackCauses { primary, secondary }));
        err
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn cause(&self) -> &str {
        &self.cause
    }

    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn fallback_causes(&self) -> Option<&FallbackCauses> {
        self.fallback_causes.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

fn serialize_duration_ms<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(d) => serializer.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        None => serializer.serialize_none(),
    }
}
