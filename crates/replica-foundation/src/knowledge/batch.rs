//! Sequential ingestion of several items for one resource.
//!
//! A failed item never fails the batch. After each item a [`BatchStep`]
//! decides what happens next.

use replica_kernel::{EntryContent, ErrorKind};
use serde::Serialize;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::job::{IngestionOutcome, JobStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStep {
    Continue,
    /// Retry the item once as plain text.
    FallbackToSimplified(EntryContent),
    /// Stop; the remaining items would fail the same way.
    Abort,
}

impl BatchStep {
    pub fn after(content: &EntryContent, outcome: &IngestionOutcome) -> Self {
        if outcome.final_status != JobStatus::Failed {
            return BatchStep::Continue;
        }
        match outcome.error_kind() {
            Some(ErrorKind::Unauthorized | ErrorKind::Forbidden) => BatchStep::Abort,
            Some(ErrorKind::InvalidInput | ErrorKind::InvalidFormat | ErrorKind::MissingField) => {
                content
                    .simplified()
                    .map_or(BatchStep::Continue, BatchStep::FallbackToSimplified)
            }
            _ => BatchStep::Continue,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItemReport {
    pub index: usize,
    pub content_kind: &'static str,
    pub title: String,
    /// `None` when the item was skipped.
    pub outcome: Option<IngestionOutcome>,
    /// The outcome belongs to the plain-text retry.
    pub simplified: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItemReport>,
    pub aborted: bool,
}

impl BatchReport {
    pub fn ready_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome.as_ref().is_some_and(IngestionOutcome::is_ready))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.items.iter().filter(|item| item.outcome.is_none()).count()
    }
}

/// Feed `items` to `ingest` one by one.
///
/// Items left after an abort or a cancellation are reported as skipped.
pub async fn ingest_batch<F, Fut>(
    items: Vec<EntryContent>,
    cancel: &CancellationToken,
    mut ingest: F,
) -> BatchReport
where
    F: FnMut(EntryContent) -> Fut,
    Fut: Future<Output = IngestionOutcome>,
{
    let mut report = BatchReport::default();
    let total = items.len();

    for (index, content) in items.into_iter().enumerate() {
        let kind = content.kind_name();
        let title = content.title().to_string();

        if report.aborted || cancel.is_cancelled() {
            report.items.push(BatchItemReport {
                index,
                content_kind: kind,
                title,
                outcome: None,
                simplified: false,
            });
            continue;
        }

        let mut outcome = ingest(content.clone()).await;
        let mut step = BatchStep::after(&content, &outcome);
        let simplified = matches!(step, BatchStep::FallbackToSimplified(_));
        if let BatchStep::FallbackToSimplified(plain) = &step {
            let plain = plain.clone();
            warn!(
                index,
                kind,
                reason = outcome.error_kind().map(|k| k.as_str()),
                "Rich content rejected, retrying as plain text"
            );
            outcome = ingest(plain.clone()).await;
            // plain text has no simpler form; only Continue or Abort remain
            step = BatchStep::after(&plain, &outcome);
        }
        if step == BatchStep::Abort {
            warn!(
                index,
                remaining = total - index - 1,
                reason = outcome.error_kind().map(|k| k.as_str()),
                "Aborting batch"
            );
            report.aborted = true;
        }

        report.items.push(BatchItemReport {
            index,
            content_kind: kind,
            title,
            outcome: Some(outcome),
            simplified,
        });
    }

    info!(
        total,
        ready = report.ready_count(),
        skipped = report.skipped_count(),
        aborted = report.aborted,
        "Batch ingestion finished"
    );
    report
}
