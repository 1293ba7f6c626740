use crate::error::{KernelError, KernelResult};
use error_stack::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Top-level configuration.
///
/// Every field has a default, so an empty file (or no file at all) yields
/// the stock behaviour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
    pub workflow: WorkflowConfig,
    pub health: HealthConfig,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
    /// Per remote call, independent of the retry budget.
    pub request_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            request_timeout_ms: 30_000,
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub open_timeout_ms: u64,
    pub monitoring_window_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout_ms: 60_000,
            monitoring_window_ms: 10_000,
        }
    }
}

impl BreakerConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn monitoring_window(&self) -> Duration {
        Duration::from_millis(self.monitoring_window_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub max_poll_attempts: u32,
    pub poll_interval_ms: u64,
    pub poll_wall_clock_ceiling_ms: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_poll_attempts: 60,
            poll_interval_ms: 5_000,
            poll_wall_clock_ceiling_ms: 360_000,
        }
    }
}

impl WorkflowConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_wall_clock_ceiling(&self) -> Duration {
        Duration::from_millis(self.poll_wall_clock_ceiling_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub recent_jobs_capacity: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            recent_jobs_capacity: 50,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub primary: Option<ProviderEndpoint>,
    pub secondary: Option<ProviderEndpoint>,
}

/// Connection details of one remote knowledge base.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    pub name: String,
    pub base_url: String,
    pub organization_secret: String,
    #[serde(default = "ProviderEndpoint::default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl ProviderEndpoint {
    fn default_api_version() -> String {
        "2025-03-25".to_string()
    }
}

impl fmt::Debug for ProviderEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEndpoint")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("organization_secret", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl ResilienceConfig {
    /// Reject values the executors cannot work with.
    pub fn validate(&self) -> KernelResult<()> {
        let invalid = |msg: &str| Err(Report::new(KernelError::InvalidConfig(msg.to_string())));

        if self.retry.max_attempts < 1 {
            return invalid("retry.max_attempts must be at least 1");
        }
        if !(self.retry.backoff_multiplier > 1.0) || !self.retry.backoff_multiplier.is_finite() {
            return invalid("retry.backoff_multiplier must be greater than 1");
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            return invalid("retry.jitter_factor must be within [0, 1]");
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return invalid("retry.max_delay_ms must not be below retry.initial_delay_ms");
        }
        if self.breaker.failure_threshold < 1 {
            return invalid("breaker.failure_threshold must be at least 1");
        }
        if self.breaker.success_threshold < 1 {
            return invalid("breaker.success_threshold must be at least 1");
        }
        if self.workflow.max_poll_attempts < 1 {
            return invalid("workflow.max_poll_attempts must be at least 1");
        }
        if self.health.recent_jobs_capacity < 1 {
            return invalid("health.recent_jobs_capacity must be at least 1");
        }
        for (slot, endpoint) in [
            ("primary", &self.providers.primary),
            ("secondary", &self.providers.secondary),
        ] {
            if let Some(endpoint) = endpoint {
                if endpoint.base_url.trim().is_empty() {
                    return Err(Report::new(KernelError::InvalidConfig(format!(
                        "providers.{slot}.base_url must not be empty"
                    ))));
                }
            }
        }
        if self.providers.secondary.is_some() && self.providers.primary.is_none() {
            return invalid("providers.secondary requires providers.primary");
        }
        Ok(())
    }
}
