//! Health snapshot: breaker states, recent job outcomes and counters.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use replica_kernel::{ErrorKind, ProviderId};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

use crate::circuit_breaker::{BreakerStatus, CircuitBreakerRegistry};
use crate::knowledge::{IngestionOutcome, JobStatus};
use crate::metrics::{MetricsSnapshot, ResilienceMetrics};

/// Terminal outcome of one job as kept in the ring buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub resource_id: String,
    pub entry_id: Option<String>,
    pub status: JobStatus,
    pub attempts_made: u32,
    pub fallback_used: bool,
    pub pending: bool,
    pub provider: Option<ProviderId>,
    pub error_kind: Option<ErrorKind>,
    pub finished_at: DateTime<Utc>,
}

impl From<&IngestionOutcome> for JobRecord {
    fn from(outcome: &IngestionOutcome) -> Self {
        Self {
            job_id: outcome.job_id,
            resource_id: outcome.resource_id.clone(),
            entry_id: outcome.entry_id.clone(),
            status: outcome.final_status,
            attempts_made: outcome.attempts_made,
            fallback_used: outcome.fallback_used,
            pending: outcome.pending,
            provider: outcome.provider_used.clone(),
            error_kind: outcome.error_kind(),
            finished_at: outcome.finished_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub breakers: BTreeMap<ProviderId, BreakerStatus>,
    /// Newest first.
    pub recent_jobs: Vec<JobRecord>,
    pub jobs_by_status: BTreeMap<String, u64>,
    pub counters: MetricsSnapshot,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct JobLog {
    recent: VecDeque<JobRecord>,
    by_status: BTreeMap<String, u64>,
}

#[derive(Debug)]
pub struct HealthReporter {
    breakers: Arc<CircuitBreakerRegistry>,
    metrics: Arc<ResilienceMetrics>,
    capacity: usize,
    jobs: Mutex<JobLog>,
}

impl HealthReporter {
    pub fn new(
        breakers: Arc<CircuitBreakerRegistry>,
        metrics: Arc<ResilienceMetrics>,
        capacity: usize,
    ) -> Self {
        Self {
            breakers,
            metrics,
            capacity: capacity.max(1),
            jobs: Mutex::new(JobLog::default()),
        }
    }

    /// Keep a finished job, evicting the oldest beyond capacity.
    pub fn record(&self, outcome: &IngestionOutcome) {
        let mut jobs = self.jobs.lock();
        if jobs.recent.len() == self.capacity {
            jobs.recent.pop_front();
        }
        jobs.recent.push_back(JobRecord::from(outcome));
        *jobs
            .by_status
            .entry(outcome.final_status.to_string())
            .or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let (recent_jobs, jobs_by_status) = {
            let jobs = self.jobs.lock();
            (
                jobs.recent.iter().rev().cloned().collect(),
                jobs.by_status.clone(),
            )
        };
        HealthSnapshot {
            breakers: self.breakers.status_snapshot(),
            recent_jobs,
            jobs_by_status,
            counters: self.metrics.snapshot(),
            generated_at: Utc::now(),
        }
    }
}
