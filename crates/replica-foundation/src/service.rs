//! The knowledge ingestion facade.
//!
//! [`KnowledgeIngestionService`] owns the breaker registry, the counters,
//! the health reporter and the background task supervisor. It is built once
//! per process and shared by reference. Tests build their own instances.

use replica_kernel::{EntryContent, NormalizedError, ResilienceConfig};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerRegistry};
use crate::fallback::FallbackExecutor;
use crate::health::{HealthReporter, HealthSnapshot};
use crate::knowledge::{self, BatchReport, IngestionOutcome, KnowledgeEntryWorkflow, PollSettings};
use crate::metrics::ResilienceMetrics;
use crate::providers::{ProviderConfig, ProviderHandle};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::supervisor::TaskSupervisor;

#[derive(Debug)]
pub struct KnowledgeIngestionService {
    workflow: Arc<KnowledgeEntryWorkflow>,
    health: Arc<HealthReporter>,
    supervisor: TaskSupervisor<IngestionOutcome>,
}

impl KnowledgeIngestionService {
    /// Build a service with a fresh breaker registry.
    pub fn new(config: &ResilienceConfig) -> Self {
        let breakers = Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig::from(
            &config.breaker,
        )));
        Self::with_registry(config, breakers)
    }

    /// Build a service around an existing registry.
    pub fn with_registry(config: &ResilienceConfig, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        let metrics = Arc::new(ResilienceMetrics::new());
        let retry = RetryExecutor::new(Arc::clone(&breakers), Arc::clone(&metrics))
            .with_request_timeout(config.retry.request_timeout());
        let workflow = KnowledgeEntryWorkflow::new(
            FallbackExecutor::new(retry),
            RetryPolicy::from(&config.retry),
            PollSettings::from(&config.workflow),
        );
        let health = HealthReporter::new(breakers, metrics, config.health.recent_jobs_capacity);

        Self {
            workflow: Arc::new(workflow),
            health: Arc::new(health),
            supervisor: TaskSupervisor::new(),
        }
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        self.workflow.retry().breakers()
    }

    pub fn metrics(&self) -> &Arc<ResilienceMetrics> {
        self.workflow.retry().metrics()
    }

    /// Ingest one content item and wait for a terminal state.
    pub async fn run_knowledge_ingestion(
        &self,
        resource_id: &str,
        content: EntryContent,
        providers: &ProviderConfig,
    ) -> IngestionOutcome {
        self.run_knowledge_ingestion_with_cancel(
            resource_id,
            content,
            providers,
            &CancellationToken::new(),
        )
        .await
    }

    pub async fn run_knowledge_ingestion_with_cancel(
        &self,
        resource_id: &str,
        content: EntryContent,
        providers: &ProviderConfig,
        cancel: &CancellationToken,
    ) -> IngestionOutcome {
        let outcome = self
            .workflow
            .run(resource_id, content, providers, cancel)
            .await;
        self.health.record(&outcome);
        outcome
    }

    /// Ingest several items for one resource in order.
    pub async fn ingest_batch(
        &self,
        resource_id: &str,
        items: Vec<EntryContent>,
        providers: &ProviderConfig,
        cancel: &CancellationToken,
    ) -> BatchReport {
        knowledge::ingest_batch(items, cancel, |content| {
            self.run_knowledge_ingestion_with_cancel(resource_id, content, providers, cancel)
        })
        .await
    }

    /// Run an ingestion in the background.
    ///
    /// The outcome is recorded in the health snapshot and delivered on the
    /// stream returned by [`Self::take_outcomes`].
    pub fn spawn_ingestion(
        &self,
        resource_id: impl Into<String>,
        content: EntryContent,
        providers: ProviderConfig,
    ) {
        let resource_id = resource_id.into();
        let workflow = Arc::clone(&self.workflow);
        let health = Arc::clone(&self.health);
        self.supervisor.spawn(move |cancel| async move {
            let outcome = workflow
                .run(&resource_id, content, &providers, &cancel)
                .await;
            health.record(&outcome);
            outcome
        });
    }

    pub fn take_outcomes(&self) -> Option<mpsc::UnboundedReceiver<IngestionOutcome>> {
        self.supervisor.take_outcomes()
    }

    /// Resolve the real id of an entry that finished with a placeholder.
    pub async fn reconcile_pending(
        &self,
        handle: &ProviderHandle,
        resource_id: &str,
        correlation: &str,
    ) -> Result<Option<String>, NormalizedError> {
        self.workflow
            .reconcile_pending(handle, resource_id, correlation)
            .await
    }

    pub fn health_snapshot(&self) -> HealthSnapshot {
        self.health.snapshot()
    }

    /// Cancel background ingestions and wait for them to finish.
    pub async fn shutdown(&self) {
        info!("Shutting down knowledge ingestion service");
        self.supervisor.shutdown().await;
    }
}
