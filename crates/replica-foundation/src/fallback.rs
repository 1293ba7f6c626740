//! Primary/secondary fallback.
//!
//! A primary failure moves to the secondary only when
//! [`should_fallback`] allows it, so authorization and validation errors
//! are never masked by a secondary success.

use replica_kernel::{NormalizedError, ProviderId, RawError, normalize, should_fallback};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::metrics::ResilienceMetrics;
use crate::retry::{RetryExecutor, RetryPolicy};

/// A value together with the provider that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackOutcome<T> {
    pub value: T,
    pub provider_used: ProviderId,
    pub fallback_used: bool,
}

#[derive(Debug, Clone)]
pub struct FallbackExecutor {
    retry: RetryExecutor,
    metrics: Arc<ResilienceMetrics>,
}

impl FallbackExecutor {
    pub fn new(retry: RetryExecutor) -> Self {
        let metrics = Arc::clone(retry.metrics());
        Self { retry, metrics }
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    /// Run `primary`; on an eligible failure run `secondary`.
    ///
    /// When both fail the error is `FallbackFailed` and carries both causes.
    pub async fn execute<T, E, P, PF, S, SF>(
        &self,
        operation: &str,
        primary_id: &ProviderId,
        secondary_id: &ProviderId,
        primary: P,
        secondary: S,
    ) -> Result<FallbackOutcome<T>, NormalizedError>
    where
        E: Into<RawError>,
        P: FnOnce() -> PF,
        PF: Future<Output = Result<T, E>>,
        S: FnOnce() -> SF,
        SF: Future<Output = Result<T, E>>,
    {
        let primary_err = match primary().await {
            Ok(value) => {
                return Ok(FallbackOutcome {
                    value,
                    provider_used: primary_id.clone(),
                    fallback_used: false,
                });
            }
            Err(err) => normalize(&err.into(), primary_id),
        };

        if !should_fallback(&primary_err, primary_id) {
            debug!(
                primary = %primary_id,
                operation,
                kind = %primary_err.kind(),
                "Primary failure not eligible for fallback"
            );
            return Err(primary_err);
        }

        self.metrics.record_fallback(primary_id, secondary_id, operation);
        warn!(
            primary = %primary_id,
            secondary = %secondary_id,
            operation,
            reason = %primary_err.kind(),
            error = %primary_err.cause(),
            "Primary provider failed, falling back to secondary"
        );

        match secondary().await {
            Ok(value) => Ok(FallbackOutcome {
                value,
                provider_used: secondary_id.clone(),
                fallback_used: true,
            }),
            Err(err) => {
                let secondary_err = normalize(&err.into(), secondary_id);
                self.metrics
                    .record_fallback_failure(primary_id, secondary_id, operation);
                error!(
                    primary = %primary_id,
                    secondary = %secondary_id,
                    operation,
                    primary_error = %primary_err,
                    secondary_error = %secondary_err,
                    "Primary and secondary providers both failed"
                );
                Err(NormalizedError::fallback_failed(primary_err, secondary_err))
            }
        }
    }

    /// Retry each provider independently under `policy`, then apply
    /// fallback between them.
    pub async fn execute_with_retry<T, P, PF, S, SF>(
        &self,
        operation: &str,
        policy: &RetryPolicy,
        primary_id: &ProviderId,
        primary: P,
        secondary_id: &ProviderId,
        secondary: S,
    ) -> Result<FallbackOutcome<T>, NormalizedError>
    where
        P: FnMut() -> PF,
        PF: Future<Output = Result<T, RawError>>,
        S: FnMut() -> SF,
        SF: Future<Output = Result<T, RawError>>,
    {
        self.execute(
            operation,
            primary_id,
            secondary_id,
            || self.retry.execute(primary_id, operation, policy, primary),
            || self.retry.execute(secondary_id, operation, policy, secondary),
        )
        .await
    }
}
