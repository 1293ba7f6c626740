//! Per-provider breaker registry.

use dashmap::DashMap;
use parking_lot::Mutex;
use replica_kernel::ProviderId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

use super::config::CircuitBreakerConfig;
use super::state::{BreakerCheck, BreakerState, BreakerStatus, State, StateTransition};

/// Breakers keyed by provider, created on first reference.
///
/// Each breaker sits behind its own mutex so that a check or a recorded
/// result for one provider never races another update of the same
/// provider. Breakers are never removed.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: DashMap<ProviderId, Arc<Mutex<BreakerState>>>,
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// May a new call to `provider` start now?
    pub fn check(&self, provider: &ProviderId) -> BreakerCheck {
        let breaker = self.breaker(provider);
        let (check, transition) = breaker.lock().check(Instant::now());
        if let Some(transition) = transition {
            log_transition(provider, transition);
        }
        check
    }

    pub fn record_success(&self, provider: &ProviderId) {
        let breaker = self.breaker(provider);
        let transition = breaker.lock().record_success(&self.config, Instant::now());
        if let Some(transition) = transition {
            log_transition(provider, transition);
        }
    }

    pub fn record_failure(&self, provider: &ProviderId) {
        let breaker = self.breaker(provider);
        let transition = breaker.lock().record_failure(&self.config, Instant::now());
        if let Some(transition) = transition {
            log_transition(provider, transition);
        }
    }

    /// Current state without triggering the lazy OPEN to HALF_OPEN move.
    pub fn state(&self, provider: &ProviderId) -> State {
        self.breakers
            .get(provider)
            .map(|b| b.lock().state())
            .unwrap_or(State::Closed)
    }

    pub fn status(&self, provider: &ProviderId) -> Option<BreakerStatus> {
        let now = Instant::now();
        self.breakers
            .get(provider)
            .map(|b| b.lock().status(&self.config, now))
    }

    /// Every known breaker, ordered by provider id.
    pub fn status_snapshot(&self) -> BTreeMap<ProviderId, BreakerStatus> {
        let now = Instant::now();
        self.breakers
            .iter()
            .map(|entry| {
                let status = entry.value().lock().status(&self.config, now);
                (entry.key().clone(), status)
            })
            .collect()
    }

    /// Force one breaker back to CLOSED. Returns false for unknown providers.
    pub fn reset(&self, provider: &ProviderId) -> bool {
        let Some(breaker) = self.breakers.get(provider).map(|b| Arc::clone(b.value())) else {
            return false;
        };
        breaker.lock().reset();
        info!(provider = %provider, "Circuit breaker reset");
        true
    }

    pub fn reset_all(&self) {
        let breakers: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for breaker in &breakers {
            breaker.lock().reset();
        }
        info!(count = breakers.len(), "All circuit breakers reset");
    }

    fn breaker(&self, provider: &ProviderId) -> Arc<Mutex<BreakerState>> {
        if let Some(existing) = self.breakers.get(provider) {
            return Arc::clone(existing.value());
        }
        Arc::clone(
            self.breakers
                .entry(provider.clone())
                .or_insert_with(|| Arc::new(Mutex::new(BreakerState::new())))
                .value(),
        )
    }
}

fn log_transition(provider: &ProviderId, transition: StateTransition) {
    match transition.to {
        State::Open => warn!(
            provider = %provider,
            from = %transition.from,
            to = %transition.to,
            "Circuit breaker opened"
        ),
        State::HalfOpen => info!(
            provider = %provider,
            from = %transition.from,
            to = %transition.to,
            "Circuit breaker half-open, probing provider"
        ),
        State::Closed => info!(
            provider = %provider,
            from = %transition.from,
            to = %transition.to,
            "Circuit breaker closed"
        ),
    }
}
