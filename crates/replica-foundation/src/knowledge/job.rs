//! Ingestion jobs and their outcomes.

use chrono::{DateTime, Utc};
use replica_kernel::{EntryContent, NormalizedError, ProviderId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle of one ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Creating,
    Created,
    Updating,
    Polling,
    Ready,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Ready | JobStatus::Failed | JobStatus::TimedOut | JobStatus::Cancelled
        )
    }

    /// Edges of the job graph. Cancellation is reachable from every
    /// non-terminal state.
    pub fn can_transition_to(self, to: JobStatus) -> bool {
        use JobStatus::*;
        match (self, to) {
            (from, Cancelled) => !from.is_terminal(),
            (Pending, Creating) => true,
            (Creating, Created | Failed) => true,
            (Created, Updating | Polling) => true,
            (Updating, Polling | Failed) => true,
            (Polling, Ready | Failed | TimedOut) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Creating => "CREATING",
            JobStatus::Created => "CREATED",
            JobStatus::Updating => "UPDATING",
            JobStatus::Polling => "POLLING",
            JobStatus::Ready => "READY",
            JobStatus::Failed => "FAILED",
            JobStatus::TimedOut => "TIMED_OUT",
            JobStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum WorkflowError {
    #[error("invalid job transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("provider {0} is not part of this job's configuration")]
    UnknownProvider(ProviderId),
}

/// One in-flight ingestion of one content item.
///
/// Owned by the workflow run that created it and never reused.
#[derive(Debug)]
pub struct KnowledgeEntryJob {
    id: Uuid,
    resource_id: String,
    entry_id: Option<String>,
    content: EntryContent,
    status: JobStatus,
    attempts_made: u32,
    pending: bool,
    provider_used: Option<ProviderId>,
    fallback_used: bool,
    error: Option<NormalizedError>,
    remote_status: Option<String>,
    created_at: DateTime<Utc>,
    last_polled_at: Option<DateTime<Utc>>,
}

impl KnowledgeEntryJob {
    pub fn new(resource_id: impl Into<String>, content: EntryContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource_id: resource_id.into(),
            entry_id: None,
            content,
            status: JobStatus::Pending,
            attempts_made: 0,
            pending: false,
            provider_used: None,
            fallback_used: false,
            error: None,
            remote_status: None,
            created_at: Utc::now(),
            last_polled_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn content(&self) -> &EntryContent {
        &self.content
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn entry_id(&self) -> Option<&str> {
        self.entry_id.as_deref()
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn transition(&mut self, to: JobStatus) -> Result<(), WorkflowError> {
        if !self.status.can_transition_to(to) {
            return Err(WorkflowError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        tracing::debug!(job_id = %self.id, from = %self.status, to = %to, "Job transition");
        self.status = to;
        Ok(())
    }

    pub(crate) fn assign_entry(&mut self, entry_id: String, pending: bool) {
        self.entry_id = Some(entry_id);
        self.pending = pending;
    }

    pub(crate) fn set_provider(&mut self, provider: ProviderId, fallback_used: bool) {
        self.provider_used = Some(provider);
        self.fallback_used = fallback_used;
    }

    pub(crate) fn record_poll(&mut self) {
        self.attempts_made += 1;
        self.last_polled_at = Some(Utc::now());
    }

    pub(crate) fn set_remote_status(&mut self, status: impl Into<String>) {
        self.remote_status = Some(status.into());
    }

    /// Move to FAILED keeping the cause.
    pub(crate) fn fail(&mut self, error: NormalizedError) -> Result<(), WorkflowError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error);
        Ok(())
    }

    /// Close the job after the state machine itself went wrong.
    pub(crate) fn abandon(&mut self, error: NormalizedError) {
        tracing::error!(job_id = %self.id, status = %self.status, error = %error, "Abandoning job");
        self.status = JobStatus::Failed;
        self.error = Some(error);
    }

    pub fn outcome(&self) -> IngestionOutcome {
        IngestionOutcome {
            job_id: self.id,
            resource_id: self.resource_id.clone(),
            content_kind: self.content.kind_name(),
            title: self.content.title().to_string(),
            entry_id: self.entry_id.clone(),
            final_status: self.status,
            attempts_made: self.attempts_made,
            fallback_used: self.fallback_used,
            provider_used: self.provider_used.clone(),
            pending: self.pending,
            remote_status: self.remote_status.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            last_polled_at: self.last_polled_at,
            finished_at: Utc::now(),
        }
    }
}

/// What a caller gets back from one ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionOutcome {
    pub job_id: Uuid,
    pub resource_id: String,
    pub content_kind: &'static str,
    pub title: String,
    pub entry_id: Option<String>,
    pub final_status: JobStatus,
    /// Status calls made while polling.
    pub attempts_made: u32,
    pub fallback_used: bool,
    pub provider_used: Option<ProviderId>,
    /// The entry id is a placeholder awaiting reconciliation.
    pub pending: bool,
    /// Last status string reported by the provider.
    pub remote_status: Option<String>,
    pub error: Option<NormalizedError>,
    pub created_at: DateTime<Utc>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
}

impl IngestionOutcome {
    pub fn is_ready(&self) -> bool {
        self.final_status == JobStatus::Ready
    }

    pub fn error_kind(&self) -> Option<replica_kernel::ErrorKind> {
        self.error.as_ref().map(NormalizedError::kind)
    }
}
