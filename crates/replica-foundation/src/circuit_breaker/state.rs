//! Circuit Breaker State Machine
//!
//! One [`BreakerState`] per provider. Every method takes the current
//! instant explicitly; the registry supplies it and serializes access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use super::config::CircuitBreakerConfig;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    /// Normal operation - requests are allowed
    Closed,
    /// Circuit is open - requests are blocked
    Open,
    /// Probing recovery - requests are allowed, one failure reopens
    HalfOpen,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Closed => write!(f, "CLOSED"),
            State::Open => write!(f, "OPEN"),
            State::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// A state change caused by `check` or a recorded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: State,
    pub to: State,
}

/// Answer to "may I call this provider now?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerCheck {
    pub allowed: bool,
    pub state: State,
    /// Remaining open time, set only when the call is rejected.
    pub retry_after: Option<Duration>,
}

/// Point-in-time view of one breaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerStatus {
    pub state: State,
    pub failure_count: usize,
    pub success_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub next_attempt_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct BreakerState {
    state: State,
    failures: VecDeque<Instant>,
    half_open_successes: u32,
    opened_until: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    next_attempt_at: Option<DateTime<Utc>>,
}

impl Default for BreakerState {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakerState {
    pub fn new() -> Self {
        Self {
            state: State::Closed,
            failures: VecDeque::new(),
            half_open_successes: 0,
            opened_until: None,
            last_failure_at: None,
            next_attempt_at: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Admission check. Moves OPEN to HALF_OPEN once the open timeout has
    /// elapsed.
    pub fn check(&mut self, now: Instant) -> (BreakerCheck, Option<StateTransition>) {
        match (self.state, self.opened_until) {
            (State::Open, Some(until)) if now < until => (
                BreakerCheck {
                    allowed: false,
                    state: State::Open,
                    retry_after: Some(until - now),
                },
                None,
            ),
            (State::Open, _) => {
                let transition = self.enter(State::HalfOpen);
                (self.admitted(), Some(transition))
            }
            _ => (self.admitted(), None),
        }
    }

    pub fn record_success(
        &mut self,
        config: &CircuitBreakerConfig,
        now: Instant,
    ) -> Option<StateTransition> {
        match self.state {
            State::Closed => {
                self.prune(config.monitoring_window, now);
                None
            }
            State::HalfOpen => {
                self.half_open_successes += 1;
                if self.half_open_successes >= config.success_threshold {
                    Some(self.enter(State::Closed))
                } else {
                    None
                }
            }
            // A call admitted before the circuit opened finished late.
            State::Open => None,
        }
    }

    pub fn record_failure(
        &mut self,
        config: &CircuitBreakerConfig,
        now: Instant,
    ) -> Option<StateTransition> {
        self.failures.push_back(now);
        self.last_failure_at = Some(Utc::now());
        self.prune(config.monitoring_window, now);

        match self.state {
            State::Closed if self.failures.len() >= config.failure_threshold as usize => {
                Some(self.open(config, now))
            }
            State::HalfOpen => Some(self.open(config, now)),
            _ => None,
        }
    }

    pub fn status(&self, config: &CircuitBreakerConfig, now: Instant) -> BreakerStatus {
        let failure_count = self
            .failures
            .iter()
            .filter(|at| now.saturating_duration_since(**at) <= config.monitoring_window)
            .count();
        BreakerStatus {
            state: self.state,
            failure_count,
            success_count: self.half_open_successes,
            last_failure_at: self.last_failure_at,
            next_attempt_at: match self.state {
                State::Open => self.next_attempt_at,
                _ => None,
            },
        }
    }

    /// Back to CLOSED with no history.
    pub fn reset(&mut self) -> Option<StateTransition> {
        let from = self.state;
        *self = Self::new();
        (from != State::Closed).then_some(StateTransition {
            from,
            to: State::Closed,
        })
    }

    fn admitted(&self) -> BreakerCheck {
        BreakerCheck {
            allowed: true,
            state: self.state,
            retry_after: None,
        }
    }

    fn open(&mut self, config: &CircuitBreakerConfig, now: Instant) -> StateTransition {
        let transition = self.enter(State::Open);
        self.opened_until = Some(now + config.open_timeout);
        self.next_attempt_at = chrono::Duration::from_std(config.open_timeout)
            .ok()
            .map(|timeout| Utc::now() + timeout);
        transition
    }

    fn enter(&mut self, to: State) -> StateTransition {
        let from = self.state;
        self.state = to;
        self.half_open_successes = 0;
        if to == State::Closed {
            self.failures.clear();
            self.opened_until = None;
            self.next_attempt_at = None;
        }
        StateTransition { from, to }
    }

    fn prune(&mut self, window: Duration, now: Instant) {
        while let Some(oldest) = self.failures.front() {
            if now.saturating_duration_since(*oldest) > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }
}
