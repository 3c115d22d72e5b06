//! Decision engine
//!
//! Hands the fetched log records plus a fixed instruction to an external
//! text-generation model and parses its reply into an [`ActionPlan`]. The
//! model is an opaque, non-deterministic black box: exactly one invocation
//! per decision, no retries, no streaming. Parse failures never escape this
//! boundary; they become `ActionPlan::Invalid` and the caller decides what
//! to do with them.

mod gemini;
mod parse;
mod prompt;

pub use gemini::{GeminiModel, DEFAULT_GEMINI_ENDPOINT};
pub use parse::parse_action_plan;
pub use prompt::{render_log_payload, SYSTEM_INSTRUCTION, MAX_PAYLOAD_BYTES};

use crate::models::{ActionPlan, LogRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the decision engine
///
/// Only model transport failures surface here; a reply the engine cannot
/// make sense of is `Ok(ActionPlan::Invalid)`, not an error.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("text model unavailable: {message}")]
    ModelUnavailable { message: String },
}

/// An external text-generation service
///
/// Treated as a black box returning text. Tests inject deterministic stubs;
/// nothing may assume repeatable output from the real service.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, DecisionError>;
}

/// Turns log records into a remediation decision via the text model
pub struct DecisionEngine {
    model: Arc<dyn TextModel>,
}

impl DecisionEngine {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Decide on an action for the given log window
    ///
    /// Invokes the model exactly once. Latency is unbounded from the
    /// engine's point of view; callers keep this off their critical path.
    pub async fn decide(&self, records: &[LogRecord]) -> Result<ActionPlan, DecisionError> {
        let payload = render_log_payload(records);
        let user = format!(
            "Analyze the following logs and suggest an action:\n\n{}",
            payload
        );

        let reply = self.model.generate(SYSTEM_INSTRUCTION, &user).await?;
        debug!(reply = %reply, "Model reply received");

        let plan = parse_action_plan(&reply);
        if let ActionPlan::Invalid { reason } = &plan {
            warn!(reason = %reason, "Model returned an invalid action plan");
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use chrono::Utc;

    struct FixedModel {
        reply: String,
    }

    #[async_trait]
    impl TextModel for FixedModel {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, DecisionError> {
            Ok(self.reply.clone())
        }
    }

    fn engine_with_reply(reply: &str) -> DecisionEngine {
        DecisionEngine::new(Arc::new(FixedModel {
            reply: reply.to_string(),
        }))
    }

    fn error_record(message: &str) -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            severity: Severity::Error,
            message: message.to_string(),
            resource_type: "k8s_container".to_string(),
            app_label: Some("nginx".to_string()),
        }
    }

    #[tokio::test]
    async fn test_decide_scale_reply() {
        let engine = engine_with_reply(r#"{"action": "scale", "replicas": 5}"#);
        let plan = engine.decide(&[error_record("boom")]).await.unwrap();
        assert_eq!(plan, ActionPlan::ScaleTo { replicas: 5 });
    }

    #[tokio::test]
    async fn test_decide_fenced_reply_parses_like_unfenced() {
        let fenced = engine_with_reply("```json\n{\"action\": \"none\"}\n```");
        let plain = engine_with_reply(r#"{"action": "none"}"#);

        let records = [error_record("boom")];
        assert_eq!(
            fenced.decide(&records).await.unwrap(),
            plain.decide(&records).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_decide_garbage_reply_is_invalid_not_error() {
        let engine = engine_with_reply("not json");
        let plan = engine.decide(&[error_record("boom")]).await.unwrap();
        assert!(matches!(plan, ActionPlan::Invalid { .. }));
    }

    #[tokio::test]
    async fn test_decide_transport_failure_propagates() {
        struct DownModel;

        #[async_trait]
        impl TextModel for DownModel {
            async fn generate(&self, _: &str, _: &str) -> Result<String, DecisionError> {
                Err(DecisionError::ModelUnavailable {
                    message: "connection refused".to_string(),
                })
            }
        }

        let engine = DecisionEngine::new(Arc::new(DownModel));
        let err = engine.decide(&[error_record("boom")]).await.unwrap_err();
        assert!(matches!(err, DecisionError::ModelUnavailable { .. }));
    }
}
