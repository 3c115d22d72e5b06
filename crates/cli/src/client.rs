//! HTTP client for the remediation agent API

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

/// Client for the agent's trigger surface
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

/// Acknowledgement returned by the trigger and manual-scale endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Aggregate health as reported by `/healthz`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub components: serde_json::Map<String, serde_json::Value>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Kick off a reconciliation pass
    pub async fn trigger(&self) -> Result<MessageResponse> {
        self.post("/trigger-scaling").await
    }

    /// Scale the target deployment directly
    pub async fn scale(&self, replicas: u32) -> Result<MessageResponse> {
        self.post(&format!("/scale-manual/{}", replicas)).await
    }

    /// Query agent health
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("/healthz").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Agent unhealthy ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    async fn post(&self, path: &str) -> Result<MessageResponse> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}
