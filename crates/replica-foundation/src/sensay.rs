//! Sensay knowledge base adapter.
//!
//! Implements [`KnowledgeBaseProvider`] over the Sensay REST API. All
//! response-shape probing happens in [`canonical_entry_id`] and
//! [`entry_summaries`]; nothing past this module sees raw Sensay JSON
//! shapes. The client holds no per-entry state: signed upload URLs travel
//! on [`CreatedEntry`].

use async_trait::async_trait;
use replica_kernel::{
    CreateEntryRequest, CreatedEntry, EntryContent, EntryStatusReport, KnowledgeBaseProvider,
    ProviderEndpoint, RawError, RemoteEntrySummary, ResilienceConfig, TransportCode,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::providers::ProviderConfig;

const ORGANIZATION_SECRET_HEADER: &str = "X-ORGANIZATION-SECRET";
const API_VERSION_HEADER: &str = "X-API-Version";
const USER_ID_HEADER: &str = "X-USER-ID";

/// HTTP client for one Sensay organization.
#[derive(Debug)]
pub struct SensayClient {
    http: reqwest::Client,
    endpoint: ProviderEndpoint,
}

impl SensayClient {
    pub fn new(endpoint: ProviderEndpoint) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("replica/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http, endpoint))
    }

    pub fn with_client(http: reqwest::Client, endpoint: ProviderEndpoint) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &ProviderEndpoint {
        &self.endpoint
    }

    fn entries_url(&self, resource_id: &str) -> String {
        format!(
            "{}/v1/replicas/{}/knowledge-base",
            self.endpoint.base_url.trim_end_matches('/'),
            resource_id
        )
    }

    fn entry_url(&self, resource_id: &str, entry_id: &str) -> String {
        format!("{}/{}", self.entries_url(resource_id), entry_id)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(ORGANIZATION_SECRET_HEADER, &self.endpoint.organization_secret)
            .header(API_VERSION_HEADER, &self.endpoint.api_version)
            .header(ACCEPT, "application/json");
        match &self.endpoint.user_id {
            Some(user_id) => builder.header(USER_ID_HEADER, user_id),
            None => builder,
        }
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<(reqwest::header::HeaderMap, Value), RawError> {
        let response = builder.send().await.map_err(map_transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(map_transport)?;

        if !status.is_success() {
            return Err(RawError::http(status.as_u16(), Some(body)));
        }
        let value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body)
                .map_err(|e| RawError::other(format!("invalid JSON from provider: {e}")))?
        };
        Ok((headers, value))
    }

    async fn upload(&self, url: &str, content_type: &str, bytes: &[u8]) -> Result<(), RawError> {
        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(map_transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.ok();
        Err(RawError::http(status.as_u16(), body))
    }
}

#[async_trait]
impl KnowledgeBaseProvider for SensayClient {
    async fn create_entry(
        &self,
        resource_id: &str,
        request: &CreateEntryRequest,
    ) -> Result<CreatedEntry, RawError> {
        let url = self.entries_url(resource_id);
        let (headers, raw) = self
            .send(self.request(reqwest::Method::POST, &url).json(request))
            .await?;

        let id = canonical_entry_id(&raw);
        let location = headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(
            provider = %self.endpoint.name,
            resource_id,
            entry_id = id.as_deref(),
            "Entry created"
        );

        Ok(CreatedEntry {
            id,
            location,
            upload_url: signed_upload_url(&raw),
            raw,
        })
    }

    async fn attach_content(
        &self,
        resource_id: &str,
        entry_id: &str,
        upload_url: Option<&str>,
        content: &EntryContent,
    ) -> Result<Value, RawError> {
        match content {
            EntryContent::File {
                content_type,
                bytes,
                ..
            } => {
                let signed = upload_url.ok_or_else(|| {
                    RawError::other(format!("no upload URL issued for entry {entry_id}"))
                })?;
                self.upload(signed, content_type, bytes).await?;
                Ok(Value::Null)
            }
            EntryContent::Text { .. } | EntryContent::Url { .. } => {
                let url = self.entry_url(resource_id, entry_id);
                let body = CreateEntryRequest::from_content(content);
                let (_, raw) = self
                    .send(self.request(reqwest::Method::PATCH, &url).json(&body))
                    .await?;
                Ok(raw)
            }
        }
    }

    async fn entry_status(
        &self,
        resource_id: &str,
        entry_id: &str,
    ) -> Result<EntryStatusReport, RawError> {
        let url = self.entry_url(resource_id, entry_id);
        let (_, raw) = self.send(self.request(reqwest::Method::GET, &url)).await?;
        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();
        Ok(EntryStatusReport { status, raw })
    }

    async fn list_entries(&self, resource_id: &str) -> Result<Vec<RemoteEntrySummary>, RawError> {
        let url = self.entries_url(resource_id);
        let (_, raw) = self.send(self.request(reqwest::Method::GET, &url)).await?;
        Ok(entry_summaries(&raw))
    }
}

fn map_transport(err: reqwest::Error) -> RawError {
    let code = if err.is_timeout() {
        TransportCode::TimedOut
    } else if err.is_connect() {
        let text = err.to_string().to_ascii_lowercase();
        if text.contains("dns") || text.contains("resolve") {
            TransportCode::HostNotFound
        } else {
            TransportCode::ConnectionRefused
        }
    } else if err.is_request() || err.is_body() {
        TransportCode::ConnectionReset
    } else {
        TransportCode::Other
    };
    RawError::transport(code, err.to_string())
}

fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_result(raw: &Value) -> Option<&Value> {
    raw.get("results").and_then(Value::as_array)?.first()
}

/// The entry id of a create response.
///
/// Sensay answers either with the entry itself (`id` or `uuid`) or with a
/// multi-status body whose first result carries `knowledgeBaseID` or `id`.
pub fn canonical_entry_id(raw: &Value) -> Option<String> {
    raw.get("id")
        .and_then(id_value)
        .or_else(|| raw.get("uuid").and_then(id_value))
        .or_else(|| {
            let result = first_result(raw)?;
            result
                .get("knowledgeBaseID")
                .and_then(id_value)
                .or_else(|| result.get("id").and_then(id_value))
        })
}

fn signed_upload_url(raw: &Value) -> Option<String> {
    raw.get("signedURL")
        .or_else(|| first_result(raw)?.get("signedURL"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Rows of a listing response: a bare array or one wrapped in `items` or
/// `entries`. Rows without an id are dropped.
pub fn entry_summaries(raw: &Value) -> Vec<RemoteEntrySummary> {
    let rows = raw
        .as_array()
        .or_else(|| raw.get("items").and_then(Value::as_array))
        .or_else(|| raw.get("entries").and_then(Value::as_array));
    rows.into_iter()
        .flatten()
        .filter_map(|row| {
            let id = row
                .get("id")
                .and_then(id_value)
                .or_else(|| row.get("uuid").and_then(id_value))?;
            let title = row
                .get("title")
                .or_else(|| row.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(RemoteEntrySummary { id, title })
        })
        .collect()
}

/// Build the provider set described by `config.providers`.
///
/// `Ok(None)` when no primary endpoint is configured.
pub fn providers_from_config(
    config: &ResilienceConfig,
) -> Result<Option<ProviderConfig>, reqwest::Error> {
    let Some(primary) = &config.providers.primary else {
        return Ok(None);
    };
    let primary_client: Arc<dyn KnowledgeBaseProvider> =
        Arc::new(SensayClient::new(primary.clone())?);

    let providers = match &config.providers.secondary {
        None => ProviderConfig::single(primary.name.clone(), primary_client),
        Some(secondary) => ProviderConfig::dual(
            primary.name.clone(),
            primary_client,
            secondary.name.clone(),
            Arc::new(SensayClient::new(secondary.clone())?),
        ),
    };
    Ok(Some(providers))
}
