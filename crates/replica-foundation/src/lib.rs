//! Resilient knowledge ingestion on top of `replica-kernel`.

// circuit breaker module - per-provider breakers
pub mod circuit_breaker;
pub use circuit_breaker::{
    BreakerCheck, BreakerStatus, CircuitBreakerConfig, CircuitBreakerRegistry, State,
    StateTransition,
};

// resilience counters
pub mod metrics;
pub use metrics::{MetricsSnapshot, ResilienceMetrics};

// retry and fallback executors
pub mod fallback;
pub mod retry;
pub use fallback::{FallbackExecutor, FallbackOutcome};
pub use retry::{RetryExecutor, RetryPolicy};

pub mod providers;
pub use providers::{ProviderConfig, ProviderHandle};

// knowledge entry workflow
pub mod knowledge;
pub use knowledge::{
    BatchItemReport, BatchReport, BatchStep, IngestionOutcome, JobStatus, KnowledgeEntryJob,
    KnowledgeEntryWorkflow, PollSettings, WorkflowError,
};

pub mod health;
pub use health::{HealthReporter, HealthSnapshot, JobRecord};

pub mod supervisor;
pub use supervisor::TaskSupervisor;

// Sensay HTTP adapter
pub mod sensay;
pub use sensay::{SensayClient, providers_from_config};

pub mod service;
pub use service::KnowledgeIngestionService;
