use replica_foundation::{JobStatus, KnowledgeIngestionService, ProviderConfig, State};
use replica_kernel::{
    CreatedEntry, EntryContent, ErrorKind, ProviderId, RawError, ResilienceConfig,
};
use replica_testing::{ProviderCall, ScriptedProvider, assert_calls};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn config(max_attempts: u32) -> ResilienceConfig {
    let mut config = ResilienceConfig::default();
    config.retry.max_attempts = max_attempts;
    config.retry.initial_delay_ms = 100;
    config.retry.max_delay_ms = 1_000;
    config.retry.jitter_factor = 0.0;
    config
}

fn bio() -> EntryContent {
    EntryContent::text("Bio", "I grew up by the sea.")
}

#[tokio::test(start_paused = true)]
async fn transient_create_failures_are_absorbed() {
    let provider = Arc::new(ScriptedProvider::new().fail_creates(503, 4));
    let service = KnowledgeIngestionService::new(&config(5));
    let providers = ProviderConfig::single("sensay", provider.clone());

    let outcome = service
        .run_knowledge_ingestion("rep-1", bio(), &providers)
        .await;

    assert_eq!(outcome.final_status, JobStatus::Ready);
    assert_eq!(outcome.entry_id.as_deref(), Some("entry-1"));
    assert_calls!(provider, "create", 5);

    let breaker = service.breakers().status(&providers.primary().id).unwrap();
    assert_eq!(breaker.state, State::Closed);
    assert_eq!(breaker.failure_count, 4);
}

#[tokio::test(start_paused = true)]
async fn open_breaker_rejects_without_recording() {
    let provider = Arc::new(ScriptedProvider::new().fail_creates(503, 5));
    let service = KnowledgeIngestionService::new(&config(5));
    let providers = ProviderConfig::single("sensay", provider.clone());
    let id = providers.primary().id.clone();

    let first = service
        .run_knowledge_ingestion("rep-1", bio(), &providers)
        .await;
    assert_eq!(first.final_status, JobStatus::Failed);
    assert_eq!(first.error_kind(), Some(ErrorKind::ServiceUnavailable));
    assert_eq!(service.breakers().state(&id), State::Open);

    let second = service
        .run_knowledge_ingestion("rep-1", bio(), &providers)
        .await;
    assert_eq!(second.final_status, JobStatus::Failed);
    let error = second.error.as_ref().unwrap();
    assert_eq!(error.kind(), ErrorKind::ServiceUnavailable);
    assert!(error.retry_after().is_some());

    assert_calls!(provider, "create", 5);
    let breaker = service.breakers().status(&id).unwrap();
    assert_eq!(breaker.failure_count, 5);
    assert!(breaker.next_attempt_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn server_error_falls_back_to_secondary() {
    let primary = Arc::new(ScriptedProvider::new().fail_creates(500, 1));
    let secondary = Arc::new(ScriptedProvider::new());
    let service = KnowledgeIngestionService::new(&config(3));
    let providers =
        ProviderConfig::dual("sensay", primary.clone(), "sensay-backup", secondary.clone());

    let outcome = service
        .run_knowledge_ingestion("rep-1", bio(), &providers)
        .await;

    assert_eq!(outcome.final_status, JobStatus::Ready);
    assert!(outcome.fallback_used);
    assert_eq!(outcome.provider_used, Some(ProviderId::secondary()));
    assert_calls!(primary, "create", 1);
    assert_calls!(primary, "status", 0);
    assert_calls!(secondary, "status", 1);
    assert_eq!(
        service
            .metrics()
            .fallbacks(&ProviderId::primary(), &ProviderId::secondary(), "create_entry"),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn not_found_never_reaches_secondary() {
    let primary = Arc::new(ScriptedProvider::new().fail_creates(404, 1));
    let secondary = Arc::new(ScriptedProvider::new());
    let service = KnowledgeIngestionService::new(&config(3));
    let providers =
        ProviderConfig::dual("sensay", primary.clone(), "sensay-backup", secondary.clone());

    let outcome = service
        .run_knowledge_ingestion("rep-1", bio(), &providers)
        .await;

    assert_eq!(outcome.final_status, JobStatus::Failed);
    assert_eq!(outcome.error_kind(), Some(ErrorKind::NotFound));
    assert!(!outcome.fallback_used);
    assert_calls!(primary, "create", 1);
    assert_calls!(secondary, "create", 0);
}

#[tokio::test(start_paused = true)]
async fn both_providers_failing_keeps_both_causes() {
    let primary = Arc::new(ScriptedProvider::new().fail_creates(500, 1));
    let secondary = Arc::new(ScriptedProvider::new().fail_creates(500, 1));
    let service = KnowledgeIngestionService::new(&config(3));
    let providers = ProviderConfig::dual("sensay", primary, "sensay-backup", secondary);

    let outcome = service
        .run_knowledge_ingestion("rep-1", bio(), &providers)
        .await;

    let error = outcome.error.as_ref().unwrap();
    assert_eq!(error.kind(), ErrorKind::FallbackFailed);
    let causes = error.fallback_causes().unwrap();
    assert_eq!(causes.primary.provider(), &ProviderId::primary());
    assert_eq!(causes.secondary.provider(), &ProviderId::secondary());
}

#[tokio::test(start_paused = true)]
async fn ready_on_the_last_allowed_poll() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .statuses("PROCESSING", 59)
            .statuses("READY", 1),
    );
    let service = KnowledgeIngestionService::new(&config(3));
    let providers = ProviderConfig::single("sensay", provider.clone());

    let outcome = service
        .run_knowledge_ingestion("rep-1", bio(), &providers)
        .await;

    assert_eq!(outcome.final_status, JobStatus::Ready);
    assert_eq!(outcome.attempts_made, 60);
    assert_eq!(outcome.remote_status.as_deref(), Some("READY"));
    assert_calls!(provider, "status", 60);
}

#[tokio::test(start_paused = true)]
async fn exhausted_polling_is_timed_out_not_failed() {
    let provider = Arc::new(ScriptedProvider::new().with_default_status("PROCESSING"));
    let service = KnowledgeIngestionService::new(&config(3));
    let providers = ProviderConfig::single("sensay", provider.clone());

    let outcome = service
        .run_knowledge_ingestion("rep-1", bio(), &providers)
        .await;
    assert_eq!(outcome.final_status, JobStatus::TimedOut);
    assert_eq!(outcome.attempts_made, 60);
    assert!(outcome.error.is_none());
    assert_calls!(provider, "status", 60);

    let rejected = Arc::new(
        ScriptedProvider::new()
            .statuses("PROCESSING", 59)
            .statuses("UNPROCESSABLE", 1),
    );
    let providers = ProviderConfig::single("sensay", rejected);
    let outcome = service
        .run_knowledge_ingestion("rep-1", bio(), &providers)
        .await;
    assert_eq!(outcome.final_status, JobStatus::Failed);
    assert_eq!(outcome.attempts_made, 60);
    assert_eq!(outcome.error_kind(), Some(ErrorKind::ExternalApiError));
}

#[tokio::test(start_paused = true)]
async fn file_content_is_attached_before_polling() {
    let provider = Arc::new(ScriptedProvider::new());
    let service = KnowledgeIngestionService::new(&config(3));
    let providers = ProviderConfig::single("sensay", provider.clone());

    let content = EntryContent::file("Notes", "notes.txt", "text/plain", b"hello".to_vec());
    let outcome = service
        .run_knowledge_ingestion("rep-1", content, &providers)
        .await;

    assert_eq!(outcome.final_status, JobStatus::Ready);
    let kinds: Vec<_> = provider.history().await.iter().map(|c| c.kind()).collect();
    assert_eq!(kinds, vec!["create", "attach", "status"]);
}

#[tokio::test(start_paused = true)]
async fn upload_url_reaches_attach_when_id_comes_from_location() {
    let provider = Arc::new(ScriptedProvider::new().then_create(Ok(CreatedEntry {
        location: Some("/v1/replicas/rep-1/knowledge-base/55".to_string()),
        upload_url: Some("https://uploads.example/55".to_string()),
        ..Default::default()
    })));
    let service = KnowledgeIngestionService::new(&config(3));
    let providers = ProviderConfig::single("sensay", provider.clone());

    let content = EntryContent::file("Notes", "notes.txt", "text/plain", b"hello".to_vec());
    let outcome = service
        .run_knowledge_ingestion("rep-1", content, &providers)
        .await;

    assert_eq!(outcome.final_status, JobStatus::Ready);
    assert_eq!(outcome.entry_id.as_deref(), Some("55"));
    let history = provider.history().await;
    assert!(history.contains(&ProviderCall::Attach {
        entry_id: "55".to_string(),
        upload_url: Some("https://uploads.example/55".to_string()),
    }));
}

#[tokio::test(start_paused = true)]
async fn batch_retries_rejected_url_as_text() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .then_create(Err(RawError::http(
                400,
                Some(r#"{"error":"url format not supported"}"#.to_string()),
            ))),
    );
    let service = KnowledgeIngestionService::new(&config(3));
    let providers = ProviderConfig::single("sensay", provider.clone());

    let report = service
        .ingest_batch(
            "rep-1",
            vec![
                EntryContent::url("Site", "https://example.com"),
                EntryContent::text("Bio", "hello"),
            ],
            &providers,
            &CancellationToken::new(),
        )
        .await;

    assert!(!report.aborted);
    assert_eq!(report.ready_count(), 2);
    assert!(report.items[0].simplified);
    assert_calls!(provider, "create", 3);
    assert_eq!(service.health_snapshot().recent_jobs.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn cancel_between_polls_stops_polling() {
    let provider = Arc::new(ScriptedProvider::new().with_default_status("PROCESSING"));
    let service = KnowledgeIngestionService::new(&config(3));
    let providers = ProviderConfig::single("sensay", provider.clone());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        trigger.cancel();
    });
    let outcome = service
        .run_knowledge_ingestion_with_cancel("rep-1", bio(), &providers, &cancel)
        .await;

    assert_eq!(outcome.final_status, JobStatus::Cancelled);
    assert_eq!(outcome.attempts_made, 3);
    let breaker = service.breakers().status(&providers.primary().id).unwrap();
    assert_eq!(breaker.failure_count, 0);
}

#[tokio::test(start_paused = true)]
async fn call_cancelled_in_flight_records_no_failure() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_create_latency(Duration::from_secs(10))
            .fail_creates(503, 1),
    );
    let service = KnowledgeIngestionService::new(&config(3));
    let providers = ProviderConfig::single("sensay", provider.clone());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });
    let outcome = service
        .run_knowledge_ingestion_with_cancel("rep-1", bio(), &providers, &cancel)
        .await;

    assert_eq!(outcome.final_status, JobStatus::Cancelled);
    assert!(outcome.error.is_none());
    assert_calls!(provider, "create", 1);
    let breaker = service.breakers().status(&providers.primary().id).unwrap();
    assert_eq!(breaker.state, State::Closed);
    assert_eq!(breaker.failure_count, 0);
    assert!(breaker.last_failure_at.is_none());
    assert!(service.metrics().snapshot().errors.is_empty());
}

#[tokio::test(start_paused = true)]
async fn call_cancelled_in_flight_records_no_success() {
    let provider = Arc::new(ScriptedProvider::new().with_create_latency(Duration::from_secs(10)));
    let service = KnowledgeIngestionService::new(&config(3));
    let providers = ProviderConfig::single("sensay", provider.clone());
    let id = providers.primary().id.clone();

    for _ in 0..5 {
        service.breakers().record_failure(&id);
    }
    assert_eq!(service.breakers().state(&id), State::Open);
    tokio::time::sleep(Duration::from_secs(61)).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });
    let outcome = service
        .run_knowledge_ingestion_with_cancel("rep-1", bio(), &providers, &cancel)
        .await;

    assert_eq!(outcome.final_status, JobStatus::Cancelled);
    assert_calls!(provider, "create", 1);
    // the trial call was admitted but never finished
    let breaker = service.breakers().status(&id).unwrap();
    assert_eq!(breaker.state, State::HalfOpen);
    assert_eq!(breaker.success_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_are_all_counted() {
    let mut config = config(5);
    config.retry.initial_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config.breaker.failure_threshold = 100;

    let provider = Arc::new(ScriptedProvider::new().fail_creates(503, 10));
    let service = Arc::new(KnowledgeIngestionService::new(&config));
    let providers = ProviderConfig::single("sensay", provider.clone());

    let mut handles = Vec::new();
    for n in 0..10 {
        let service = Arc::clone(&service);
        let providers = providers.clone();
        handles.push(tokio::spawn(async move {
            service
                .run_knowledge_ingestion(&format!("rep-{n}"), bio(), &providers)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let breaker = service.breakers().status(&providers.primary().id).unwrap();
    assert_eq!(breaker.failure_count, 10);
    assert_eq!(breaker.state, State::Closed);
    assert_eq!(service.health_snapshot().recent_jobs.len(), 10);
}

#[tokio::test(start_paused = true)]
async fn unrecoverable_id_leaves_entry_pending() {
    let provider = Arc::new(ScriptedProvider::new().then_create(Ok(Default::default())));
    let service = KnowledgeIngestionService::new(&config(3));
    let providers = ProviderConfig::single("sensay", provider.clone());

    let outcome = service
        .run_knowledge_ingestion("rep-1", bio(), &providers)
        .await;
    assert_eq!(outcome.final_status, JobStatus::Created);
    assert!(outcome.pending);
    assert!(outcome.entry_id.as_deref().unwrap().starts_with("pending-"));
    assert_calls!(provider, "status", 0);
}
