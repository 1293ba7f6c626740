//! The knowledge entry state machine.
//!
//! `PENDING -> CREATING -> CREATED -> (UPDATING) -> POLLING -> READY | FAILED | TIMED_OUT`,
//! with `CANCELLED` reachable from every non-terminal state. Steps run
//! strictly in order; every remote call goes through the retry executor.

use replica_kernel::{
    CreateEntryRequest, CreatedEntry, EntryContent, ErrorKind, NormalizedError,
    RemoteEntrySummary, WorkflowConfig,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use super::job::{IngestionOutcome, JobStatus, KnowledgeEntryJob, WorkflowError};
use super::recovery::{IdSource, id_from_location, match_unique_title, placeholder_id};
use crate::fallback::{FallbackExecutor, FallbackOutcome};
use crate::providers::{ProviderConfig, ProviderHandle};
use crate::retry::{RetryExecutor, RetryPolicy};

/// Bounds of the polling phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub max_poll_attempts: u32,
    pub poll_interval: Duration,
    pub wall_clock_ceiling: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&WorkflowConfig::default())
    }
}

impl From<&WorkflowConfig> for PollSettings {
    fn from(cfg: &WorkflowConfig) -> Self {
        Self {
            max_poll_attempts: cfg.max_poll_attempts.max(1),
            poll_interval: cfg.poll_interval(),
            wall_clock_ceiling: cfg.poll_wall_clock_ceiling(),
        }
    }
}

/// How a provider status string is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    Ready,
    Failed,
    InProgress,
}

pub fn classify_status(status: &str) -> RemoteState {
    match status.trim().to_ascii_uppercase().as_str() {
        "READY" | "VECTOR_CREATED" | "PROCESSED_TEXT" => RemoteState::Ready,
        "FAILED" | "ERROR" | "UNPROCESSABLE" => RemoteState::Failed,
        _ => RemoteState::InProgress,
    }
}

#[derive(Debug, Clone)]
pub struct KnowledgeEntryWorkflow {
    fallback: FallbackExecutor,
    policy: RetryPolicy,
    poll: PollSettings,
}

impl KnowledgeEntryWorkflow {
    pub fn new(fallback: FallbackExecutor, policy: RetryPolicy, poll: PollSettings) -> Self {
        Self {
            fallback,
            policy,
            poll,
        }
    }

    pub fn retry(&self) -> &RetryExecutor {
        self.fallback.retry()
    }

    /// Drive one content item to a terminal state.
    ///
    /// Never fails: every failure ends up in the outcome. `cancel` is checked
    /// before each step and raced against every remote call and poll sleep.
    pub async fn run(
        &self,
        resource_id: &str,
        content: EntryContent,
        providers: &ProviderConfig,
        cancel: &CancellationToken,
    ) -> IngestionOutcome {
        let mut job = KnowledgeEntryJob::new(resource_id, content);
        let span = info_span!(
            "knowledge_ingestion",
            job_id = %job.id(),
            resource_id,
            content = job.content().kind_name(),
        );

        async {
            info!(provider = %providers.primary().name, "Knowledge ingestion started");

            if let Err(err) = self.drive(&mut job, providers, cancel).await {
                job.abandon(NormalizedError::new(
                    ErrorKind::Unknown,
                    err.to_string(),
                    providers.primary().id.clone(),
                ));
            }

            let outcome = job.outcome();
            match outcome.final_status {
                JobStatus::Ready => info!(
                    entry_id = outcome.entry_id.as_deref(),
                    attempts = outcome.attempts_made,
                    fallback_used = outcome.fallback_used,
                    "Knowledge entry ready"
                ),
                JobStatus::Created if outcome.pending => warn!(
                    entry_id = outcome.entry_id.as_deref(),
                    "Knowledge entry created without a confirmed id, reconciliation pending"
                ),
                status => warn!(
                    status = %status,
                    entry_id = outcome.entry_id.as_deref(),
                    attempts = outcome.attempts_made,
                    kind = outcome.error_kind().map(|k| k.as_str()),
                    "Knowledge ingestion did not complete"
                ),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    /// Look for the real id of an entry that finished with a placeholder.
    pub async fn reconcile_pending(
        &self,
        handle: &ProviderHandle,
        resource_id: &str,
        correlation: &str,
    ) -> Result<Option<String>, NormalizedError> {
        let entries = self.list(handle, resource_id).await?;
        let found = match_unique_title(&entries, correlation);
        match &found {
            Some(entry_id) => {
                info!(provider = %handle.id, resource_id, entry_id, "Pending entry reconciled")
            }
            None => {
                debug!(provider = %handle.id, resource_id, "Pending entry still not listed")
            }
        }
        Ok(found)
    }

    async fn drive(
        &self,
        job: &mut KnowledgeEntryJob,
        providers: &ProviderConfig,
        cancel: &CancellationToken,
    ) -> Result<(), WorkflowError> {
        if cancel.is_cancelled() {
            return job.transition(JobStatus::Cancelled);
        }
        job.transition(JobStatus::Creating)?;

        let resource_id = job.resource_id().to_string();
        let request = CreateEntryRequest::from_content(job.content());

        let created = match race(cancel, self.create(providers, &resource_id, &request)).await {
            None => return job.transition(JobStatus::Cancelled),
            Some(Err(error)) => return job.fail(error),
            Some(Ok(created)) => created,
        };
        let handle = providers
            .handle(&created.provider_used)
            .ok_or_else(|| WorkflowError::UnknownProvider(created.provider_used.clone()))?;
        job.set_provider(created.provider_used.clone(), created.fallback_used);

        let title = job.content().title().to_string();
        let Some((entry_id, source)) = race(
            cancel,
            self.resolve_entry_id(handle, &resource_id, &created.value, &title),
        )
        .await
        else {
            return job.transition(JobStatus::Cancelled);
        };
        job.assign_entry(entry_id.clone(), source == IdSource::Placeholder);
        job.transition(JobStatus::Created)?;
        if source == IdSource::Placeholder {
            return Ok(());
        }

        if !job.content().sent_at_creation() {
            if cancel.is_cancelled() {
                return job.transition(JobStatus::Cancelled);
            }
            job.transition(JobStatus::Updating)?;
            let content = job.content().clone();
            let upload_url = created.value.upload_url.clone();
            let attached = race(
                cancel,
                self.retry()
                    .execute(&handle.id, "attach_content", &self.policy, || {
                        let client = Arc::clone(&handle.client);
                        let (resource_id, entry_id) = (resource_id.clone(), entry_id.clone());
                        let (upload_url, content) = (upload_url.clone(), content.clone());
                        async move {
                            let upload_url = upload_url.as_deref();
                            client
                                .attach_content(&resource_id, &entry_id, upload_url, &content)
                                .await
                        }
                    }),
            )
            .await;
            match attached {
                None => return job.transition(JobStatus::Cancelled),
                Some(Err(error)) => return job.fail(error),
                Some(Ok(_)) => debug!(entry_id, "Content attached"),
            }
        }

        if cancel.is_cancelled() {
            return job.transition(JobStatus::Cancelled);
        }
        job.transition(JobStatus::Polling)?;
        self.poll(job, handle, &resource_id, &entry_id, cancel).await
    }

    async fn create(
        &self,
        providers: &ProviderConfig,
        resource_id: &str,
        request: &CreateEntryRequest,
    ) -> Result<FallbackOutcome<CreatedEntry>, NormalizedError> {
        match providers {
            ProviderConfig::Single(handle) => {
                let value = self
                    .retry()
                    .execute(&handle.id, "create_entry", &self.policy, || {
                        let client = Arc::clone(&handle.client);
                        let (resource_id, request) = (resource_id.to_string(), request.clone());
                        async move { client.create_entry(&resource_id, &request).await }
                    })
                    .await?;
                Ok(FallbackOutcome {
                    value,
                    provider_used: handle.id.clone(),
                    fallback_used: false,
                })
            }
            ProviderConfig::Dual { primary, secondary } => {
                self.fallback
                    .execute_with_retry(
                        "create_entry",
                        &self.policy,
                        &primary.id,
                        || {
                            let client = Arc::clone(&primary.client);
                            let (resource_id, request) =
                                (resource_id.to_string(), request.clone());
                            async move { client.create_entry(&resource_id, &request).await }
                        },
                        &secondary.id,
                        || {
                            let client = Arc::clone(&secondary.client);
                            let (resource_id, request) =
                                (resource_id.to_string(), request.clone());
                            async move { client.create_entry(&resource_id, &request).await }
                        },
                    )
                    .await
            }
        }
    }

    async fn resolve_entry_id(
        &self,
        handle: &ProviderHandle,
        resource_id: &str,
        created: &CreatedEntry,
        title: &str,
    ) -> (String, IdSource) {
        if let Some(id) = created.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            return (id.to_string(), IdSource::Response);
        }
        if let Some(id) = created.location.as_deref().and_then(id_from_location) {
            info!(entry_id = %id, "Entry id recovered from Location header");
            return (id, IdSource::LocationHeader);
        }

        match self.list(handle, resource_id).await {
            Ok(entries) => {
                if let Some(id) = match_unique_title(&entries, title) {
                    info!(entry_id = %id, "Entry id recovered from listing");
                    return (id, IdSource::Listing);
                }
                debug!(listed = entries.len(), title, "No unique listing match");
            }
            Err(error) => warn!(
                kind = %error.kind(),
                error = %error.cause(),
                "Listing entries for id recovery failed"
            ),
        }

        (placeholder_id(), IdSource::Placeholder)
    }

    async fn list(
        &self,
        handle: &ProviderHandle,
        resource_id: &str,
    ) -> Result<Vec<RemoteEntrySummary>, NormalizedError> {
        self.retry()
            .execute(&handle.id, "list_entries", &self.policy, || {
                let client = Arc::clone(&handle.client);
                let resource_id = resource_id.to_string();
                async move { client.list_entries(&resource_id).await }
            })
            .await
    }

    async fn poll(
        &self,
        job: &mut KnowledgeEntryJob,
        handle: &ProviderHandle,
        resource_id: &str,
        entry_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WorkflowError> {
        let started = Instant::now();

        loop {
            if cancel.is_cancelled() {
                return job.transition(JobStatus::Cancelled);
            }
            let elapsed = started.elapsed();
            if job.attempts_made() >= self.poll.max_poll_attempts
                || elapsed >= self.poll.wall_clock_ceiling
            {
                warn!(
                    attempts = job.attempts_made(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Polling budget exhausted"
                );
                return job.transition(JobStatus::TimedOut);
            }

            job.record_poll();
            let attempt = job.attempts_made();
            let report = race(
                cancel,
                self.retry()
                    .execute(&handle.id, "entry_status", &self.policy, || {
                        let client = Arc::clone(&handle.client);
                        let resource_id = resource_id.to_string();
                        let entry_id = entry_id.to_string();
                        async move { client.entry_status(&resource_id, &entry_id).await }
                    }),
            )
            .await;

            match report {
                None => return job.transition(JobStatus::Cancelled),
                Some(Ok(report)) => {
                    job.set_remote_status(report.status.clone());
                    match classify_status(&report.status) {
                        RemoteState::Ready => return job.transition(JobStatus::Ready),
                        RemoteState::Failed => {
                            let cause = remote_failure_cause(&report.status, &report.raw);
                            return job.fail(NormalizedError::new(
                                ErrorKind::ExternalApiError,
                                cause,
                                handle.id.clone(),
                            ));
                        }
                        RemoteState::InProgress => {
                            debug!(attempt, status = %report.status, "Entry still processing")
                        }
                    }
                }
                Some(Err(error)) if !error.is_retryable() => return job.fail(error),
                Some(Err(error)) => warn!(
                    attempt,
                    kind = %error.kind(),
                    error = %error.cause(),
                    "Status check failed, polling again"
                ),
            }

            if job.attempts_made() < self.poll.max_poll_attempts {
                let remaining = self
                    .poll
                    .wall_clock_ceiling
                    .saturating_sub(started.elapsed());
                let pause = self.poll.poll_interval.min(remaining);
                if race(cancel, tokio::time::sleep(pause)).await.is_none() {
                    return job.transition(JobStatus::Cancelled);
                }
            }
        }
    }
}

/// Cause text for an entry the provider marked as failed.
fn remote_failure_cause(status: &str, raw: &serde_json::Value) -> String {
    let detail = ["error", "message", "statusReason", "reason"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(serde_json::Value::as_str));
    match detail {
        Some(detail) => format!("remote status {status}: {detail}"),
        None => format!("remote status {status}"),
    }
}

/// `None` when `cancel` fires first. The losing future is dropped.
async fn race<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerRegistry};
    use crate::metrics::ResilienceMetrics;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use replica_kernel::{EntryStatusReport, KnowledgeBaseProvider, RawError};
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubProvider {
        created: Mutex<Option<CreatedEntry>>,
        statuses: Mutex<VecDeque<Result<&'static str, u16>>>,
        listing: Mutex<Vec<RemoteEntrySummary>>,
        attached: Mutex<Vec<(String, Option<String>)>>,
        attach_calls: AtomicUsize,
        status_calls: AtomicUsize,
        list_calls: AtomicUsize,
    }

    impl StubProvider {
        fn creating(entry: CreatedEntry) -> Self {
            let stub = Self::default();
            *stub.created.lock() = Some(entry);
            stub
        }

        fn with_statuses(self, statuses: Vec<Result<&'static str, u16>>) -> Self {
            *self.statuses.lock() = statuses.into();
            self
        }
    }

    #[async_trait]
    impl KnowledgeBaseProvider for StubProvider {
        async fn create_entry(
            &self,
            _resource_id: &str,
            _request: &CreateEntryRequest,
        ) -> Result<CreatedEntry, RawError> {
            self.created
                .lock()
                .clone()
                .ok_or_else(|| RawError::http(503, None))
        }

        async fn attach_content(
            &self,
            _resource_id: &str,
            entry_id: &str,
            upload_url: Option<&str>,
            _content: &EntryContent,
        ) -> Result<Value, RawError> {
            self.attach_calls.fetch_add(1, Ordering::SeqCst);
            self.attached
                .lock()
                .push((entry_id.to_string(), upload_url.map(str::to_string)));
            Ok(Value::Null)
        }

        async fn entry_status(
            &self,
            _resource_id: &str,
            _entry_id: &str,
        ) -> Result<EntryStatusReport, RawError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            match self.statuses.lock().pop_front() {
                Some(Ok(status)) => Ok(EntryStatusReport {
                    status: status.to_string(),
                    raw: json!({ "status": status, "error": "bad pdf" }),
                }),
                Some(Err(code)) => Err(RawError::http(code, None)),
                None => Ok(EntryStatusReport::new("PROCESSING")),
            }
        }

        async fn list_entries(
            &self,
            _resource_id: &str,
        ) -> Result<Vec<RemoteEntrySummary>, RawError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.listing.lock().clone())
        }
    }

    fn workflow(max_poll_attempts: u32) -> KnowledgeEntryWorkflow {
        let breakers = Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig::default()));
        let retry = RetryExecutor::new(breakers, Arc::new(ResilienceMetrics::new()));
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        };
        let poll = PollSettings {
            max_poll_attempts,
            poll_interval: Duration::from_secs(5),
            wall_clock_ceiling: Duration::from_secs(360),
        };
        KnowledgeEntryWorkflow::new(FallbackExecutor::new(retry), policy, poll)
    }

    fn with_id(id: &str) -> CreatedEntry {
        CreatedEntry {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    async fn run(
        stub: Arc<StubProvider>,
        content: EntryContent,
        max_poll_attempts: u32,
    ) -> IngestionOutcome {
        let providers = ProviderConfig::single("stub", stub);
        workflow(max_poll_attempts)
            .run("replica-1", content, &providers, &CancellationToken::new())
            .await
    }

    #[test]
    fn status_classification() {
        for ready in ["READY", "vector_created", " PROCESSED_TEXT "] {
            assert_eq!(classify_status(ready), RemoteState::Ready);
        }
        for failed in ["FAILED", "error", "UNPROCESSABLE"] {
            assert_eq!(classify_status(failed), RemoteState::Failed);
        }
        for other in ["PROCESSING", "NEW", ""] {
            assert_eq!(classify_status(other), RemoteState::InProgress);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn text_entry_skips_updating_and_becomes_ready() {
        let stub = Arc::new(
            StubProvider::creating(with_id("42"))
                .with_statuses(vec![Ok("PROCESSING"), Ok("READY")]),
        );
        let outcome = run(stub.clone(), EntryContent::text("Bio", "hello"), 60).await;

        assert_eq!(outcome.final_status, JobStatus::Ready);
        assert_eq!(outcome.entry_id.as_deref(), Some("42"));
        assert_eq!(outcome.attempts_made, 2);
        assert_eq!(outcome.remote_status.as_deref(), Some("READY"));
        assert!(!outcome.fallback_used);
        assert_eq!(stub.attach_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn file_entry_attaches_before_polling() {
        let stub = Arc::new(
            StubProvider::creating(with_id("7")).with_statuses(vec![Ok("VECTOR_CREATED")]),
        );
        let content = EntryContent::file("Notes", "n.pdf", "application/pdf", vec![1, 2, 3]);
        let outcome = run(stub.clone(), content, 60).await;

        assert_eq!(outcome.final_status, JobStatus::Ready);
        assert_eq!(stub.attach_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.attempts_made, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_url_follows_a_recovered_id() {
        let stub = Arc::new(
            StubProvider::creating(CreatedEntry {
                location: Some("/v1/replicas/replica-1/knowledge-base/55".into()),
                upload_url: Some("https://uploads.example/55".into()),
                ..Default::default()
            })
            .with_statuses(vec![Ok("READY")]),
        );
        let content = EntryContent::file("Notes", "n.pdf", "application/pdf", vec![1, 2, 3]);
        let outcome = run(stub.clone(), content, 60).await;

        assert_eq!(outcome.final_status, JobStatus::Ready);
        assert_eq!(
            *stub.attached.lock(),
            vec![("55".to_string(), Some("https://uploads.example/55".to_string()))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failure_keeps_cause() {
        let stub = Arc::new(
            StubProvider::creating(with_id("9")).with_statuses(vec![Ok("UNPROCESSABLE")]),
        );
        let outcome = run(stub, EntryContent::text("Bio", "x"), 60).await;

        assert_eq!(outcome.final_status, JobStatus::Failed);
        let error = outcome.error.unwrap();
        assert_eq!(error.kind(), ErrorKind::ExternalApiError);
        assert_eq!(error.cause(), "remote status UNPROCESSABLE: bad pdf");
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_status_error_fails_the_job() {
        let stub = Arc::new(StubProvider::creating(with_id("9")).with_statuses(vec![Err(404)]));
        let outcome = run(stub.clone(), EntryContent::text("Bio", "x"), 60).await;

        assert_eq!(outcome.final_status, JobStatus::Failed);
        assert_eq!(outcome.error_kind(), Some(ErrorKind::NotFound));
        assert_eq!(stub.status_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_status_errors_keep_polling() {
        let stub = Arc::new(
            StubProvider::creating(with_id("9"))
                .with_statuses(vec![Err(503), Err(503), Ok("PROCESSING"), Ok("READY")]),
        );
        let outcome = run(stub.clone(), EntryContent::text("Bio", "x"), 60).await;

        assert_eq!(outcome.final_status, JobStatus::Ready);
        // first poll burns both retry attempts on the two 503s
        assert_eq!(outcome.attempts_made, 3);
        assert_eq!(stub.status_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_cap_yields_timed_out() {
        let stub = Arc::new(StubProvider::creating(with_id("1")));
        let outcome = run(stub.clone(), EntryContent::text("Bio", "x"), 4).await;

        assert_eq!(outcome.final_status, JobStatus::TimedOut);
        assert_eq!(outcome.attempts_made, 4);
        assert_eq!(stub.status_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn wall_clock_ceiling_yields_timed_out() {
        let stub = Arc::new(StubProvider::creating(with_id("1")));
        let providers = ProviderConfig::single("stub", stub.clone());
        let mut wf = workflow(1_000);
        wf.poll.wall_clock_ceiling = Duration::from_secs(12);

        let outcome = wf
            .run(
                "replica-1",
                EntryContent::text("Bio", "x"),
                &providers,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(outcome.final_status, JobStatus::TimedOut);
        // polls at 0s, 5s, 10s; the ceiling is hit at 12s
        assert_eq!(outcome.attempts_made, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn location_header_recovers_id() {
        let stub = Arc::new(
            StubProvider::creating(CreatedEntry {
                location: Some("/v1/replicas/replica-1/knowledge-base/55".into()),
                ..Default::default()
            })
            .with_statuses(vec![Ok("READY")]),
        );
        let outcome = run(stub.clone(), EntryContent::text("Bio", "x"), 60).await;

        assert_eq!(outcome.entry_id.as_deref(), Some("55"));
        assert!(!outcome.pending);
        assert_eq!(stub.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn listing_recovers_id() {
        let stub = StubProvider::creating(CreatedEntry::default()).with_statuses(vec![Ok("READY")]);
        *stub.listing.lock() = vec![
            RemoteEntrySummary { id: "1".into(), title: Some("Other".into()) },
            RemoteEntrySummary { id: "2".into(), title: Some("Bio".into()) },
        ];
        let outcome = run(Arc::new(stub), EntryContent::text("Bio", "x"), 60).await;

        assert_eq!(outcome.final_status, JobStatus::Ready);
        assert_eq!(outcome.entry_id.as_deref(), Some("2"));
    }

    #[tokio::test(start_paused = true)]
    async fn unrecoverable_id_ends_created_and_pending() {
        let stub = Arc::new(StubProvider::creating(CreatedEntry::default()));
        let outcome = run(stub.clone(), EntryContent::text("Bio", "x"), 60).await;

        assert_eq!(outcome.final_status, JobStatus::Created);
        assert!(outcome.pending);
        assert!(outcome.entry_id.unwrap().starts_with("pending-"));
        assert!(outcome.error.is_none());
        assert_eq!(stub.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_makes_no_calls() {
        let stub = Arc::new(StubProvider::creating(with_id("1")));
        let providers = ProviderConfig::single("stub", stub.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = workflow(60)
            .run("replica-1", EntryContent::text("Bio", "x"), &providers, &cancel)
            .await;

        assert_eq!(outcome.final_status, JobStatus::Cancelled);
        assert_eq!(stub.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_finds_listed_entry() {
        let stub = StubProvider::default();
        *stub.listing.lock() = vec![RemoteEntrySummary {
            id: "77".into(),
            title: Some("Bio".into()),
        }];
        let providers = ProviderConfig::single("stub", Arc::new(stub));

        let found = workflow(60)
            .reconcile_pending(providers.primary(), "replica-1", "Bio")
            .await
            .unwrap();
        assert_eq!(found.as_deref(), Some("77"));
    }
}
