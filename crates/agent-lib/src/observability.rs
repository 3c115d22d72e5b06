//! Observability infrastructure for the remediation agent
//!
//! Prometheus metrics for pass activity and external-call latency, plus a
//! structured logger for the events operators grep for.

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for external network calls (log fetch, inference);
/// those run hundreds of milliseconds to several seconds
const EXTERNAL_CALL_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

struct AgentMetricsInner {
    fetch_latency_seconds: Histogram,
    inference_latency_seconds: Histogram,
    passes_triggered: IntCounter,
    passes_failed: IntCounter,
    decisions: IntCounterVec,
    actuations: IntCounterVec,
    actuation_errors: IntCounter,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            fetch_latency_seconds: register_histogram!(
                "remedy_agent_fetch_latency_seconds",
                "Time spent fetching log records from the logging backend",
                EXTERNAL_CALL_BUCKETS.to_vec()
            )
            .expect("Failed to register fetch_latency_seconds"),

            inference_latency_seconds: register_histogram!(
                "remedy_agent_inference_latency_seconds",
                "Time spent waiting for the decision model",
                EXTERNAL_CALL_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            passes_triggered: register_int_counter!(
                "remedy_agent_passes_triggered_total",
                "Total number of reconciliation passes started"
            )
            .expect("Failed to register passes_triggered"),

            passes_failed: register_int_counter!(
                "remedy_agent_passes_failed_total",
                "Total number of reconciliation passes that ended in an error"
            )
            .expect("Failed to register passes_failed"),

            decisions: register_int_counter_vec!(
                "remedy_agent_decisions_total",
                "Decisions returned by the model, by action",
                &["action"]
            )
            .expect("Failed to register decisions"),

            actuations: register_int_counter_vec!(
                "remedy_agent_actuations_total",
                "Orchestration actions applied, by kind",
                &["kind"]
            )
            .expect("Failed to register actuations"),

            actuation_errors: register_int_counter!(
                "remedy_agent_actuation_errors_total",
                "Orchestration API calls that failed"
            )
            .expect("Failed to register actuation_errors"),
        }
    }
}

/// Lightweight handle to the global metrics instance
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone, Default)]
pub struct AgentMetrics {
    _private: (),
}

impl AgentMetrics {
    /// Create a metrics handle (registers the collectors on first call)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_fetch_latency(&self, duration_secs: f64) {
        self.inner().fetch_latency_seconds.observe(duration_secs);
    }

    pub fn observe_inference_latency(&self, duration_secs: f64) {
        self.inner().inference_latency_seconds.observe(duration_secs);
    }

    pub fn inc_passes_triggered(&self) {
        self.inner().passes_triggered.inc();
    }

    pub fn inc_passes_failed(&self) {
        self.inner().passes_failed.inc();
    }

    pub fn inc_decision(&self, action: &str) {
        self.inner().decisions.with_label_values(&[action]).inc();
    }

    pub fn inc_actuation(&self, kind: &str) {
        self.inner().actuations.with_label_values(&[kind]).inc();
    }

    pub fn inc_actuation_errors(&self) {
        self.inner().actuation_errors.inc();
    }
}

/// Structured logger for pass-level events
///
/// Emits event-tagged records so a single filter surfaces every decision
/// and actuation for a target.
#[derive(Clone)]
pub struct StructuredLogger {
    target: String,
}

impl StructuredLogger {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model: &str) {
        info!(
            event = "agent_started",
            target = %self.target,
            agent_version = %version,
            model = %model,
            "Remediation agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            target = %self.target,
            reason = %reason,
            "Remediation agent shutting down"
        );
    }

    pub fn log_pass_started(&self, filter: &str, max_entries: usize) {
        info!(
            event = "pass_started",
            target = %self.target,
            filter = %filter,
            max_entries = max_entries,
            "Reconciliation pass started"
        );
    }

    pub fn log_no_logs(&self) {
        info!(
            event = "pass_completed",
            target = %self.target,
            outcome = "no_logs",
            "No logs to process"
        );
    }

    pub fn log_decision(&self, action: &str, record_count: usize) {
        info!(
            event = "decision_made",
            target = %self.target,
            action = %action,
            record_count = record_count,
            "Decision received from model"
        );
    }

    pub fn log_invalid_decision(&self, reason: &str) {
        warn!(
            event = "decision_invalid",
            target = %self.target,
            reason = %reason,
            "Model returned an invalid action plan; taking no action"
        );
    }

    pub fn log_scaled(&self, replicas: u32) {
        info!(
            event = "deployment_scaled",
            target = %self.target,
            replicas = replicas,
            "Deployment scaled"
        );
    }

    pub fn log_rolled_back(&self, revision: &str) {
        info!(
            event = "deployment_rolled_back",
            target = %self.target,
            revision = %revision,
            "Deployment rolled back"
        );
    }

    pub fn log_contended(&self) {
        warn!(
            event = "pass_contended",
            target = %self.target,
            "Another pass holds the actuation step; skipping"
        );
    }

    pub fn log_pass_failed(&self, stage: &str, error: &str) {
        error!(
            event = "pass_failed",
            target = %self.target,
            stage = %stage,
            error = %error,
            "Reconciliation pass failed"
        );
    }
}
