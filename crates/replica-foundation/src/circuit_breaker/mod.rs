//! Circuit breakers, one per provider.
//!
//! ```text
//!    +---------+  failures in window >= threshold  +--------+
//!    | CLOSED  | --------------------------------> |  OPEN  |
//!    +---------+                                   +--------+
//!         ^                                          |    ^
//!         | successes >= threshold   timeout elapsed |    | any failure
//!         |                                          v    |
//!         +----------------------------------- +-------------+
//!                                              |  HALF_OPEN  |
//!                                              +-------------+
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use replica_foundation::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerRegistry};
//!
//! let registry = CircuitBreakerRegistry::new(CircuitBreakerConfig::default());
//! let provider = ProviderId::primary();
//!
//! if registry.check(&provider).allowed {
//!     match call().await {
//!         Ok(_) => registry.record_success(&provider),
//!         Err(_) => registry.record_failure(&provider),
//!     }
//! }
//! ```

pub mod config;
pub mod registry;
pub mod state;

pub use config::CircuitBreakerConfig;
pub use registry::CircuitBreakerRegistry;
pub use state::{BreakerCheck, BreakerStatus, State, StateTransition};
