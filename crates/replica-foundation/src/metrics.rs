//! Resilience Metrics
//!
//! Process-local counters for remote calls. Call, error, retry and
//! rejection counters are keyed `provider:operation`; fallback counters are
//! keyed `primary->secondary:operation`.

use dashmap::DashMap;
use replica_kernel::ProviderId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ResilienceMetrics {
    calls: DashMap<String, AtomicU64>,
    errors: DashMap<String, AtomicU64>,
    retries: DashMap<String, AtomicU64>,
    rejections: DashMap<String, AtomicU64>,
    fallbacks: DashMap<String, AtomicU64>,
    fallback_failures: DashMap<String, AtomicU64>,
}

/// Copy of every counter at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub calls: BTreeMap<String, u64>,
    pub errors: BTreeMap<String, u64>,
    pub retries: BTreeMap<String, u64>,
    pub rejections: BTreeMap<String, u64>,
    pub fallbacks: BTreeMap<String, u64>,
    pub fallback_failures: BTreeMap<String, u64>,
}

impl ResilienceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// An attempt that actually reached the provider.
    pub fn record_call(&self, provider: &ProviderId, operation: &str) {
        bump(&self.calls, call_key(provider, operation));
    }

    pub fn record_error(&self, provider: &ProviderId, operation: &str) {
        bump(&self.errors, call_key(provider, operation));
    }

    pub fn record_retry(&self, provider: &ProviderId, operation: &str) {
        bump(&self.retries, call_key(provider, operation));
    }

    /// A call refused by an open breaker.
    pub fn record_rejection(&self, provider: &ProviderId, operation: &str) {
        bump(&self.rejections, call_key(provider, operation));
    }

    pub fn record_fallback(&self, primary: &ProviderId, secondary: &ProviderId, operation: &str) {
        bump(&self.fallbacks, fallback_key(primary, secondary, operation));
    }

    pub fn record_fallback_failure(
        &self,
        primary: &ProviderId,
        secondary: &ProviderId,
        operation: &str,
    ) {
        bump(
            &self.fallback_failures,
            fallback_key(primary, secondary, operation),
        );
    }

    pub fn calls(&self, provider: &ProviderId, operation: &str) -> u64 {
        read(&self.calls, &call_key(provider, operation))
    }

    pub fn retries(&self, provider: &ProviderId, operation: &str) -> u64 {
        read(&self.retries, &call_key(provider, operation))
    }

    pub fn rejections(&self, provider: &ProviderId, operation: &str) -> u64 {
        read(&self.rejections, &call_key(provider, operation))
    }

    pub fn fallbacks(&self, primary: &ProviderId, secondary: &ProviderId, operation: &str) -> u64 {
        read(&self.fallbacks, &fallback_key(primary, secondary, operation))
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: collect(&self.calls),
            errors: collect(&self.errors),
            retries: collect(&self.retries),
            rejections: collect(&self.rejections),
            fallbacks: collect(&self.fallbacks),
            fallback_failures: collect(&self.fallback_failures),
        }
    }
}

fn call_key(provider: &ProviderId, operation: &str) -> String {
    format!("{provider}:{operation}")
}

fn fallback_key(primary: &ProviderId, secondary: &ProviderId, operation: &str) -> String {
    format!("{primary}->{secondary}:{operation}")
}

fn bump(map: &DashMap<String, AtomicU64>, key: String) {
    map.entry(key)
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

fn read(map: &DashMap<String, AtomicU64>, key: &str) -> u64 {
    map.get(key).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
}

fn collect(map: &DashMap<String, AtomicU64>) -> BTreeMap<String, u64> {
    map.iter()
        .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
        .collect()
}
