use async_trait::async_trait;
use replica_kernel::{
    CreateEntryRequest, CreatedEntry, EntryContent, EntryStatusReport, KnowledgeBaseProvider,
    RawError, RemoteEntrySummary,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

/// One call received by a [`ScriptedProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Create { resource_id: String, title: String },
    Attach {
        entry_id: String,
        upload_url: Option<String>,
    },
    Status { entry_id: String },
    List { resource_id: String },
}

impl ProviderCall {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderCall::Create { .. } => "create",
            ProviderCall::Attach { .. } => "attach",
            ProviderCall::Status { .. } => "status",
            ProviderCall::List { .. } => "list",
        }
    }
}

/// A knowledge base that answers from scripts.
///
/// Each operation pops its next scripted result; an exhausted script falls
/// back to the default answer: entries are created as `entry-1` and report
/// `READY`. Every call is recorded.
#[derive(Debug)]
pub struct ScriptedProvider {
    creates: RwLock<VecDeque<Result<CreatedEntry, RawError>>>,
    attaches: RwLock<VecDeque<Result<Value, RawError>>>,
    statuses: RwLock<VecDeque<Result<EntryStatusReport, RawError>>>,
    listing: RwLock<Vec<RemoteEntrySummary>>,
    default_status: String,
    /// How long each create call takes before it answers.
    create_latency: Duration,
    /// Track all calls made to this provider
    pub call_history: RwLock<Vec<ProviderCall>>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            creates: RwLock::new(VecDeque::new()),
            attaches: RwLock::new(VecDeque::new()),
            statuses: RwLock::new(VecDeque::new()),
            listing: RwLock::new(Vec::new()),
            default_status: "READY".to_string(),
            create_latency: Duration::ZERO,
            call_history: RwLock::new(Vec::new()),
        }
    }

    /// Status reported once the status script runs out.
    pub fn with_default_status(mut self, status: impl Into<String>) -> Self {
        self.default_status = status.into();
        self
    }

    /// Keep every create call in flight for `latency` before answering.
    pub fn with_create_latency(mut self, latency: Duration) -> Self {
        self.create_latency = latency;
        self
    }

    pub fn then_create(mut self, result: Result<CreatedEntry, RawError>) -> Self {
        self.creates.get_mut().push_back(result);
        self
    }

    /// Fail the next `times` create calls with HTTP `status`.
    pub fn fail_creates(mut self, status: u16, times: usize) -> Self {
        for _ in 0..times {
            self.creates
                .get_mut()
                .push_back(Err(RawError::http(status, None)));
        }
        self
    }

    pub fn then_attach(mut self, result: Result<Value, RawError>) -> Self {
        self.attaches.get_mut().push_back(result);
        self
    }

    /// Report `status` for the next `times` status calls.
    pub fn statuses(mut self, status: &str, times: usize) -> Self {
        for _ in 0..times {
            self.statuses
                .get_mut()
                .push_back(Ok(EntryStatusReport::new(status)));
        }
        self
    }

    pub fn then_status(mut self, result: Result<EntryStatusReport, RawError>) -> Self {
        self.statuses.get_mut().push_back(result);
        self
    }

    pub fn with_listing(mut self, entries: Vec<RemoteEntrySummary>) -> Self {
        *self.listing.get_mut() = entries;
        self
    }

    pub async fn history(&self) -> Vec<ProviderCall> {
        self.call_history.read().await.clone()
    }

    /// Number of calls of one kind: `create`, `attach`, `status` or `list`.
    pub async fn call_count(&self, kind: &str) -> usize {
        self.call_history
            .read()
            .await
            .iter()
            .filter(|call| call.kind() == kind)
            .count()
    }

    async fn record(&self, call: ProviderCall) {
        self.call_history.write().await.push(call);
    }
}

#[async_trait]
impl KnowledgeBaseProvider for ScriptedProvider {
    async fn create_entry(
        &self,
        resource_id: &str,
        request: &CreateEntryRequest,
    ) -> Result<CreatedEntry, RawError> {
        self.record(ProviderCall::Create {
            resource_id: resource_id.to_string(),
            title: request.title.clone(),
        })
        .await;
        if !self.create_latency.is_zero() {
            tokio::time::sleep(self.create_latency).await;
        }
        self.creates.write().await.pop_front().unwrap_or_else(|| {
            Ok(CreatedEntry {
                id: Some("entry-1".to_string()),
                ..Default::default()
            })
        })
    }

    async fn attach_content(
        &self,
        _resource_id: &str,
        entry_id: &str,
        upload_url: Option<&str>,
        _content: &EntryContent,
    ) -> Result<Value, RawError> {
        self.record(ProviderCall::Attach {
            entry_id: entry_id.to_string(),
            upload_url: upload_url.map(str::to_string),
        })
        .await;
        self.attaches
            .write()
            .await
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }

    async fn entry_status(
        &self,
        _resource_id: &str,
        entry_id: &str,
    ) -> Result<EntryStatusReport, RawError> {
        self.record(ProviderCall::Status {
            entry_id: entry_id.to_string(),
        })
        .await;
        self.statuses
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(EntryStatusReport::new(self.default_status.clone())))
    }

    async fn list_entries(&self, resource_id: &str) -> Result<Vec<RemoteEntrySummary>, RawError> {
        self.record(ProviderCall::List {
            resource_id: resource_id.to_string(),
        })
        .await;
        Ok(self.listing.read().await.clone())
    }
}

/// Assert how often a [`ScriptedProvider`] saw one kind of call.
#[macro_export]
macro_rules! assert_calls {
    ($provider:expr, $kind:expr, $expected_count:expr) => {
        let count = $provider.call_count($kind).await;
        assert_eq!(
            count, $expected_count,
            "Expected {} {} calls, but saw {}",
            $expected_count, $kind, count
        );
    };
}
