//! Gemini text-generation client
//!
//! Thin REST client for the `models/{model}:generateContent` endpoint. The
//! API key is an ambient credential handed in at construction.

use super::{DecisionError, TextModel};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Production generative language endpoint
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Text model backed by the Gemini REST API
pub struct GeminiModel {
    client: Client,
    base_url: Url,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiModel {
    /// Create a client for the production endpoint
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_GEMINI_ENDPOINT, model, api_key)
            .expect("default Gemini endpoint is a valid URL")
    }

    /// Create a client against a specific endpoint (used by tests)
    pub fn with_endpoint(
        endpoint: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, DecisionError> {
        let base_url = Url::parse(endpoint).map_err(|e| DecisionError::ModelUnavailable {
            message: format!("invalid Gemini endpoint: {}", e),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| DecisionError::ModelUnavailable {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            model: model.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl TextModel for GeminiModel {
    async fn generate(&self, system: &str, user: &str) -> Result<String, DecisionError> {
        let path = format!("/v1beta/models/{}:generateContent", self.model);
        let mut url = self
            .base_url
            .join(&path)
            .map_err(|e| DecisionError::ModelUnavailable {
                message: format!("invalid request URL: {}", e),
            })?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let body = GenerateRequest {
            system_instruction: Content {
                parts: vec![Part { text: system }],
            },
            contents: vec![Content {
                parts: vec![Part { text: user }],
            }],
        };

        debug!(model = %self.model, "Invoking text model");

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DecisionError::ModelUnavailable {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DecisionError::ModelUnavailable {
                message: format!("model returned {}: {}", status, text),
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| DecisionError::ModelUnavailable {
                    message: format!("malformed model response: {}", e),
                })?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| DecisionError::ModelUnavailable {
                message: "model response contained no text candidate".to_string(),
            })?;

        Ok(text)
    }
}
