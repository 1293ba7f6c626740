//! Retry policy and the breaker-aware retry executor.

use rand::Rng;
use replica_kernel::{NormalizedError, ProviderId, RawError, RetryConfig, TransportCode, normalize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::circuit_breaker::CircuitBreakerRegistry;
use crate::metrics::ResilienceMetrics;

/// Exponential backoff with symmetric jitter.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Total attempts (1 = no retry).
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Fraction of the delay added or removed at random, in `[0, 1]`.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            initial_delay: cfg.initial_delay(),
            max_delay: cfg.max_delay(),
            backoff_multiplier: cfg.backoff_multiplier,
            jitter_factor: cfg.jitter_factor.clamp(0.0, 1.0),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no backoff.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Un-jittered delay after the given failed attempt (0-indexed):
    /// `min(max_delay, initial_delay * multiplier^attempt)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else if capped > 0.0 {
            self.max_delay
        } else {
            Duration::ZERO
        }
    }

    /// [`RetryPolicy::delay_for`] plus uniform jitter of
    /// `±delay * jitter_factor`, clamped to `[0, max_delay]`.
    pub fn jittered_delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.delay_for(attempt).as_secs_f64();
        let spread = base * self.jitter_factor;
        let offset = if spread > 0.0 {
            rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        let secs = (base + offset).clamp(0.0, self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        self.jittered_delay_with(attempt, &mut rand::thread_rng())
    }
}

/// Runs provider operations under a [`RetryPolicy`], consulting the
/// provider's circuit breaker before every attempt.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    breakers: Arc<CircuitBreakerRegistry>,
    metrics: Arc<ResilienceMetrics>,
    request_timeout: Option<Duration>,
}

impl RetryExecutor {
    pub fn new(breakers: Arc<CircuitBreakerRegistry>, metrics: Arc<ResilienceMetrics>) -> Self {
        Self {
            breakers,
            metrics,
            request_timeout: None,
        }
    }

    /// Bound every individual attempt. Expiry counts as a `Timeout` failure.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    pub fn metrics(&self) -> &Arc<ResilienceMetrics> {
        &self.metrics
    }

    /// Call `operation` until it succeeds, fails with a non-retryable kind,
    /// or the attempt budget is spent.
    ///
    /// A rejection by an open breaker ends the loop at once with a
    /// `ServiceUnavailable` error carrying the remaining open time. It is not
    /// recorded as another breaker failure. If the returned future is dropped
    /// mid-attempt, that attempt is recorded as neither success nor failure.
    pub async fn execute<T, F, Fut>(
        &self,
        provider: &ProviderId,
        operation: &str,
        policy: &RetryPolicy,
        mut op: F,
    ) -> Result<T, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RawError>>,
    {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            let check = self.breakers.check(provider);
            if !check.allowed {
                self.metrics.record_rejection(provider, operation);
                warn!(
                    provider = %provider,
                    operation,
                    retry_after_ms = check.retry_after.map(|d| d.as_millis() as u64),
                    "Circuit breaker open, call rejected"
                );
                return Err(NormalizedError::circuit_open(
                    provider.clone(),
                    check.retry_after,
                ));
            }

            self.metrics.record_call(provider, operation);
            debug!(
                provider = %provider,
                operation,
                attempt = attempt + 1,
                max_attempts,
                "Calling provider"
            );

            let result = match self.request_timeout {
                Some(limit) => match tokio::time::timeout(limit, op()).await {
                    Ok(result) => result,
                    Err(_) => Err(RawError::transport(
                        TransportCode::TimedOut,
                        format!("{operation} exceeded {}ms", limit.as_millis()),
                    )),
                },
                None => op().await,
            };

            match result {
                Ok(value) => {
                    self.breakers.record_success(provider);
                    if attempt > 0 {
                        info!(
                            provider = %provider,
                            operation,
                            attempts = attempt + 1,
                            "Provider call succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(raw) => {
                    let error = normalize(&raw, provider);
                    self.breakers.record_failure(provider);
                    self.metrics.record_error(provider, operation);

                    if attempt + 1 >= max_attempts || !error.is_retryable() {
                        debug!(
                            provider = %provider,
                            operation,
                            attempt = attempt + 1,
                            kind = %error.kind(),
                            "Giving up on provider call"
                        );
                        return Err(error);
                    }

                    let delay = policy.jittered_delay(attempt);
                    self.metrics.record_retry(provider, operation);
                    warn!(
                        provider = %provider,
                        operation,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        kind = %error.kind(),
                        error = %error.cause(),
                        "Provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
