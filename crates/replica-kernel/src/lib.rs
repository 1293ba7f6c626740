//! Core types for resilient knowledge ingestion.
//!
//! The kernel owns the pieces every other crate agrees on: the closed
//! [`ErrorKind`] taxonomy, the [`NormalizedError`] produced by the
//! normalizer, provider identities, the [`KnowledgeBaseProvider`] seam and
//! the resilience configuration. It performs no I/O of its own apart from
//! reading configuration files.

// error module
pub mod error;

// fault taxonomy and normalization
pub mod fault;
pub use fault::{
    ErrorKind, FallbackCauses, NormalizedError, RawError, TransportCode, is_retryable, normalize,
    should_fallback,
};

// provider identities
pub mod provider;
pub use provider::ProviderId;

// knowledge base seam
pub mod knowledge;
pub use knowledge::{
    CreateEntryRequest, CreatedEntry, EntryContent, EntryStatusReport, KnowledgeBaseProvider,
    RemoteEntrySummary,
};

// configuration
pub mod config;
pub use config::{
    BreakerConfig, HealthConfig, ProviderEndpoint, ProvidersConfig, ResilienceConfig, RetryConfig,
    WorkflowConfig,
};
