//! Circuit Breaker Configuration

use replica_kernel::BreakerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds shared by every breaker in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failures inside `monitoring_window` that open a closed circuit
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close the circuit
    pub success_threshold: u32,
    /// How long an open circuit rejects calls before probing
    pub open_timeout: Duration,
    /// Rolling window for counting failures while closed
    pub monitoring_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(60),
            monitoring_window: Duration::from_secs(10),
        }
    }
}

impl CircuitBreakerConfig {
    /// Set the failure threshold
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set the success threshold
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold.max(1);
        self
    }

    /// Set the open timeout
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Set the rolling failure window
    pub fn with_monitoring_window(mut self, window: Duration) -> Self {
        self.monitoring_window = window;
        self
    }
}

impl From<&BreakerConfig> for CircuitBreakerConfig {
    fn from(cfg: &BreakerConfig) -> Self {
        Self::default()
            .with_failure_threshold(cfg.failure_threshold)
            .with_success_threshold(cfg.success_threshold)
            .with_open_timeout(cfg.open_timeout())
            .with_monitoring_window(cfg.monitoring_window())
    }
}
