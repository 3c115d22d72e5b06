//! Remediation agent - log-driven scale/rollback for one deployment
//!
//! Fetches recent error logs, asks a text model for a remediation decision,
//! and applies it to the target deployment. Exposed over a small HTTP
//! trigger surface.

use anyhow::{Context, Result};
use chrono::Duration;
use remedy_lib::{
    decision::{DecisionEngine, GeminiModel},
    health::components,
    logsource::CloudLoggingSource,
    orchestrator::KubeOrchestrator,
    AgentMetrics, DeploymentTarget, HealthRegistry, Reconciler, SingleFlight, StructuredLogger,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting remedy-agent");

    // Load configuration
    let config = config::AgentConfig::load()?;
    let target = DeploymentTarget::new(&config.deployment_name, &config.namespace);
    info!(target = %target.key(), project = %config.project_id, "Agent configured");

    // Ambient credentials; the agent holds them but never manages them
    let api_key =
        std::env::var("GOOGLE_API_KEY").context("GOOGLE_API_KEY must be set for the text model")?;
    let access_token = std::env::var("GOOGLE_ACCESS_TOKEN")
        .context("GOOGLE_ACCESS_TOKEN must be set for the logging backend")?;

    // Process-wide clients, created once and shared by all passes
    let kube_client = kube::Client::try_default()
        .await
        .context("Failed to build Kubernetes client")?;
    let source = Arc::new(CloudLoggingSource::new(&config.project_id, access_token));
    let engine = DecisionEngine::new(Arc::new(GeminiModel::new(&config.gemini_model, api_key)));
    let orchestrator = Arc::new(KubeOrchestrator::new(kube_client));

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::LOG_SOURCE).await;
    health_registry.register(components::DECISION_ENGINE).await;
    health_registry.register(components::ORCHESTRATOR).await;

    // Initialize metrics
    let metrics = AgentMetrics::new();

    let logger = StructuredLogger::new(target.key());
    logger.log_startup(AGENT_VERSION, &config.gemini_model);

    let reconciler = Arc::new(Reconciler::new(
        source,
        engine,
        orchestrator,
        target,
        Duration::hours(config.log_window_hours),
        config.max_log_entries,
        SingleFlight::new(),
        health_registry.clone(),
        metrics,
    ));

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(reconciler, health_registry.clone()));

    // Mark agent as ready after initialization
    health_registry.set_ready(true).await;

    // Start the trigger/health/metrics server
    let _api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
