//! Agent configuration

use anyhow::Result;
use serde::Deserialize;

/// Agent configuration, loaded from `AGENT_*` environment variables
///
/// Credentials (API keys, access tokens, kubeconfig) are ambient
/// capabilities read separately at startup; they never live here.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Deployment acted upon by reconciliation passes
    #[serde(default = "default_deployment_name")]
    pub deployment_name: String,

    /// Namespace of the deployment
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// API server port for the trigger/health/metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Cloud project whose logs are fetched
    #[serde(default = "default_project_id")]
    pub project_id: String,

    /// Trailing log window per pass, in hours
    #[serde(default = "default_log_window_hours")]
    pub log_window_hours: i64,

    /// Upper bound on log entries fetched per pass
    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: usize,

    /// Text model used for decisions
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
}

fn default_deployment_name() -> String {
    "nginx".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_project_id() -> String {
    std::env::var("GOOGLE_CLOUD_PROJECT").unwrap_or_else(|_| "unknown".to_string())
}

fn default_log_window_hours() -> i64 {
    2
}

fn default_max_log_entries() -> usize {
    20
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            deployment_name: default_deployment_name(),
            namespace: default_namespace(),
            api_port: default_api_port(),
            project_id: default_project_id(),
            log_window_hours: default_log_window_hours(),
            max_log_entries: default_max_log_entries(),
            gemini_model: default_gemini_model(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("AGENT"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }
}
