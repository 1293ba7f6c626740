//! Knowledge entry ingestion.

pub mod batch;
pub mod job;
pub mod recovery;
pub mod workflow;

pub use batch::{BatchItemReport, BatchReport, BatchStep, ingest_batch};
pub use job::{IngestionOutcome, JobStatus, KnowledgeEntryJob, WorkflowError};
pub use recovery::{IdSource, is_placeholder};
pub use workflow::{KnowledgeEntryWorkflow, PollSettings, RemoteState, classify_status};
