//! The knowledge base seam.
//!
//! [`KnowledgeBaseProvider`] is everything the ingestion workflow needs from
//! a remote knowledge base. Implementations return [`RawError`]; the
//! orchestration layer normalizes.

use crate::fault::RawError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One piece of training content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryContent {
    Text {
        title: String,
        text: String,
    },
    File {
        title: String,
        filename: String,
        content_type: String,
        #[serde(skip)]
        bytes: Vec<u8>,
    },
    Url {
        title: String,
        url: String,
        auto_refresh: bool,
    },
}

impl EntryContent {
    pub fn text(title: impl Into<String>, text: impl Into<String>) -> Self {
        EntryContent::Text {
            title: title.into(),
            text: text.into(),
        }
    }

    pub fn url(title: impl Into<String>, url: impl Into<String>) -> Self {
        EntryContent::Url {
            title: title.into(),
            url: url.into(),
            auto_refresh: false,
        }
    }

    pub fn file(
        title: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        EntryContent::File {
            title: title.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            EntryContent::Text { title, .. }
            | EntryContent::File { title, .. }
            | EntryContent::Url { title, .. } => title,
        }
    }

    /// Text and URL content travel with the create call; files are attached
    /// afterwards.
    pub fn sent_at_creation(&self) -> bool {
        !matches!(self, EntryContent::File { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            EntryContent::Text { .. } => "text",
            EntryContent::File { .. } => "file",
            EntryContent::Url { .. } => "url",
        }
    }

    /// A plain-text rendition of rich content, used when a provider rejects
    /// the rich form. Text content and binary files have none.
    pub fn simplified(&self) -> Option<EntryContent> {
        match self {
            EntryContent::Text { .. } => None,
            EntryContent::File { title, bytes, .. } => {
                let text = std::str::from_utf8(bytes).ok()?.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(EntryContent::text(title.clone(), text))
                }
            }
            EntryContent::Url { title, url, .. } => {
                Some(EntryContent::text(title.clone(), format!("Reference: {url}")))
            }
        }
    }
}

/// Body of a create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_refresh: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl CreateEntryRequest {
    pub fn from_content(content: &EntryContent) -> Self {
        let mut request = CreateEntryRequest {
            title: content.title().to_string(),
            text: None,
            url: None,
            auto_refresh: None,
            filename: None,
        };
        match content {
            EntryContent::Text { text, .. } => request.text = Some(text.clone()),
            EntryContent::Url {
                url, auto_refresh, ..
            } => {
                request.url = Some(url.clone());
                request.auto_refresh = Some(*auto_refresh);
            }
            EntryContent::File { filename, .. } => request.filename = Some(filename.clone()),
        }
        request
    }
}

/// What a create call returned. The id may be missing; see the id recovery
/// steps of the workflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatedEntry {
    pub id: Option<String>,
    /// `Location` response header, when the provider sent one.
    pub location: Option<String>,
    /// Where file bytes go, when the provider issued an upload URL.
    pub upload_url: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryStatusReport {
    pub status: String,
    pub raw: Value,
}

impl EntryStatusReport {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            raw: Value::Null,
        }
    }
}

/// Row of a remote entry listing, used to recover ids by title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntrySummary {
    pub id: String,
    pub title: Option<String>,
}

/// A remote knowledge base that accepts training entries.
#[async_trait]
pub trait KnowledgeBaseProvider: Send + Sync {
    /// Create an entry under `resource_id`.
    async fn create_entry(
        &self,
        resource_id: &str,
        request: &CreateEntryRequest,
    ) -> Result<CreatedEntry, RawError>;

    /// Attach content that was not sent at creation time.
    ///
    /// `upload_url` is the one [`CreatedEntry`] carried for this entry.
    async fn attach_content(
        &self,
        resource_id: &str,
        entry_id: &str,
        upload_url: Option<&str>,
        content: &EntryContent,
    ) -> Result<Value, RawError>;

    /// Current processing status of an entry.
    async fn entry_status(
        &self,
        resource_id: &str,
        entry_id: &str,
    ) -> Result<EntryStatusReport, RawError>;

    /// All entries under `resource_id`.
    async fn list_entries(&self, resource_id: &str) -> Result<Vec<RemoteEntrySummary>, RawError>;
}
