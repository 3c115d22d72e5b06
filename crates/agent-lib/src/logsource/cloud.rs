//! Cloud Logging backend adapter
//!
//! Talks to the Cloud Logging REST API (`entries:list`). Authentication is
//! an already-established capability: the caller hands in a bearer token at
//! construction and the adapter never refreshes it.

use super::{LogSource, SourceError};
use crate::models::{LogRecord, Severity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Production Cloud Logging endpoint
pub const DEFAULT_LOGGING_ENDPOINT: &str = "https://logging.googleapis.com";

/// Log source backed by the Cloud Logging `entries:list` API
pub struct CloudLoggingSource {
    client: Client,
    base_url: Url,
    project_id: String,
    access_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListEntriesRequest<'a> {
    resource_names: Vec<String>,
    filter: &'a str,
    order_by: &'a str,
    page_size: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEntriesResponse {
    #[serde(default)]
    entries: Vec<Entry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    timestamp: Option<DateTime<Utc>>,
    severity: Option<Severity>,
    text_payload: Option<String>,
    json_payload: Option<Value>,
    resource: Option<EntryResource>,
    #[serde(default)]
    labels: std::collections::HashMap<String, String>,
}

#[derive(Deserialize)]
struct EntryResource {
    #[serde(rename = "type")]
    resource_type: Option<String>,
}

impl CloudLoggingSource {
    /// Create an adapter for the production endpoint
    pub fn new(project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_LOGGING_ENDPOINT, project_id, access_token)
            .expect("default logging endpoint is a valid URL")
    }

    /// Create an adapter against a specific endpoint (used by tests)
    pub fn with_endpoint(
        endpoint: &str,
        project_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let base_url = Url::parse(endpoint).map_err(|e| SourceError::Unavailable {
            message: format!("invalid logging endpoint: {}", e),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Unavailable {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            project_id: project_id.into(),
            access_token: access_token.into(),
        })
    }

    fn entry_to_record(entry: Entry) -> LogRecord {
        let message = match (entry.text_payload, entry.json_payload) {
            (Some(text), _) => text,
            (None, Some(json)) => json
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| json.to_string()),
            (None, None) => String::new(),
        };

        LogRecord {
            timestamp: entry.timestamp.unwrap_or_else(Utc::now),
            severity: entry.severity.unwrap_or(Severity::Debug),
            message,
            resource_type: entry
                .resource
                .and_then(|r| r.resource_type)
                .unwrap_or_default(),
            app_label: entry.labels.get("k8s-pod/app").cloned(),
        }
    }
}

#[async_trait]
impl LogSource for CloudLoggingSource {
    async fn fetch(
        &self,
        filter: &str,
        max_entries: usize,
    ) -> Result<Vec<LogRecord>, SourceError> {
        debug!(filter = %filter, max_entries = max_entries, "Fetching log entries");

        let url = self
            .base_url
            .join("/v2/entries:list")
            .map_err(|e| SourceError::Unavailable {
                message: format!("invalid request URL: {}", e),
            })?;

        let body = ListEntriesRequest {
            resource_names: vec![format!("projects/{}", self.project_id)],
            filter,
            order_by: "timestamp desc",
            page_size: max_entries,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable {
                message: e.to_string(),
            })?;

        match response.status() {
            StatusCode::BAD_REQUEST => {
                let text = response.text().await.unwrap_or_default();
                return Err(SourceError::InvalidFilter { message: text });
            }
            status if !status.is_success() => {
                let text = response.text().await.unwrap_or_default();
                return Err(SourceError::Unavailable {
                    message: format!("backend returned {}: {}", status, text),
                });
            }
            _ => {}
        }

        let parsed: ListEntriesResponse =
            response.json().await.map_err(|e| SourceError::Unavailable {
                message: format!("malformed backend response: {}", e),
            })?;

        let records: Vec<LogRecord> = parsed
            .entries
            .into_iter()
            .take(max_entries)
            .map(Self::entry_to_record)
            .collect();

        debug!(count = records.len(), "Fetched log entries");
        Ok(records)
    }
}
