//! End-to-end reconciliation pass tests against stubbed collaborators

use super::*;
use crate::decision::TextModel;
use crate::models::{LogRecord, Severity};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

struct StubSource {
    records: Vec<LogRecord>,
}

#[async_trait]
impl LogSource for StubSource {
    async fn fetch(
        &self,
        _filter: &str,
        max_entries: usize,
    ) -> Result<Vec<LogRecord>, SourceError> {
        Ok(self.records.iter().take(max_entries).cloned().collect())
    }
}

struct StubModel {
    reply: String,
}

#[async_trait]
impl TextModel for StubModel {
    async fn generate(&self, _system: &str, _user: &str) -> Result<String, DecisionError> {
        Ok(self.reply.clone())
    }
}

/// Records every orchestration call; scale is idempotent by construction
#[derive(Default)]
struct RecordingOrchestrator {
    replica_count: AtomicU32,
    scale_calls: AtomicUsize,
    rollback_calls: AtomicUsize,
    rollback_result: Mutex<Option<Result<String, ()>>>,
}

impl RecordingOrchestrator {
    fn with_rollback_revision(revision: &str) -> Self {
        let orchestrator = Self::default();
        *orchestrator.rollback_result.lock().unwrap() = Some(Ok(revision.to_string()));
        orchestrator
    }

    fn with_no_previous_revision() -> Self {
        let orchestrator = Self::default();
        *orchestrator.rollback_result.lock().unwrap() = Some(Err(()));
        orchestrator
    }

    fn total_calls(&self) -> usize {
        self.scale_calls.load(Ordering::SeqCst) + self.rollback_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Orchestrator for RecordingOrchestrator {
    async fn scale(
        &self,
        _target: &DeploymentTarget,
        replicas: u32,
    ) -> Result<u32, OrchestratorError> {
        self.scale_calls.fetch_add(1, Ordering::SeqCst);
        self.replica_count.store(replicas, Ordering::SeqCst);
        Ok(self.replica_count.load(Ordering::SeqCst))
    }

    async fn rollback_to_previous(
        &self,
        target: &DeploymentTarget,
    ) -> Result<String, OrchestratorError> {
        self.rollback_calls.fetch_add(1, Ordering::SeqCst);
        match self.rollback_result.lock().unwrap().clone() {
            Some(Ok(revision)) => Ok(revision),
            _ => Err(OrchestratorError::NoPreviousRevision {
                deployment: target.name.clone(),
            }),
        }
    }
}

fn error_records(total: usize, errors: usize) -> Vec<LogRecord> {
    (0..total)
        .map(|i| LogRecord {
            timestamp: Utc::now(),
            severity: if i < errors {
                Severity::Error
            } else {
                Severity::Info
            },
            message: format!("record {}", i),
            resource_type: "k8s_container".to_string(),
            app_label: Some("nginx".to_string()),
        })
        .collect()
}

fn reconciler(
    records: Vec<LogRecord>,
    reply: &str,
    orchestrator: Arc<RecordingOrchestrator>,
) -> Reconciler {
    Reconciler::new(
        Arc::new(StubSource { records }),
        DecisionEngine::new(Arc::new(StubModel {
            reply: reply.to_string(),
        })),
        orchestrator,
        DeploymentTarget::new("nginx", "default"),
        Duration::hours(2),
        20,
        SingleFlight::new(),
        HealthRegistry::new(),
        AgentMetrics::new(),
    )
}

#[tokio::test]
async fn test_scale_decision_reaches_the_orchestrator() {
    // Scenario A: 20 records, 18 errors, model says scale to 5.
    let orchestrator = Arc::new(RecordingOrchestrator::default());
    let reconciler = reconciler(
        error_records(20, 18),
        r#"{"action": "scale", "replicas": 5}"#,
        Arc::clone(&orchestrator),
    );

    let outcome = reconciler.run_pass().await.unwrap();
    assert_eq!(outcome, PassOutcome::Scaled { replicas: 5 });
    assert_eq!(orchestrator.replica_count.load(Ordering::SeqCst), 5);
    assert_eq!(orchestrator.scale_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_log_window_ends_the_pass() {
    // Scenario B: nothing fetched, no decision, no orchestration call.
    let orchestrator = Arc::new(RecordingOrchestrator::default());
    let reconciler = reconciler(
        vec![],
        r#"{"action": "scale", "replicas": 5}"#,
        Arc::clone(&orchestrator),
    );

    let outcome = reconciler.run_pass().await.unwrap();
    assert_eq!(outcome, PassOutcome::NoLogs);
    assert_eq!(orchestrator.total_calls(), 0);
}

#[tokio::test]
async fn test_malformed_reply_makes_no_orchestration_call() {
    // Scenario C: model returns garbage; logged as invalid, no actuation.
    let orchestrator = Arc::new(RecordingOrchestrator::default());
    let reconciler = reconciler(error_records(5, 5), "not json", Arc::clone(&orchestrator));

    let outcome = reconciler.run_pass().await.unwrap();
    assert!(matches!(outcome, PassOutcome::Invalid { .. }));
    assert_eq!(orchestrator.total_calls(), 0);
}

#[tokio::test]
async fn test_none_decision_makes_no_orchestration_call() {
    let orchestrator = Arc::new(RecordingOrchestrator::default());
    let reconciler = reconciler(
        error_records(5, 1),
        r#"{"action": "none"}"#,
        Arc::clone(&orchestrator),
    );

    let outcome = reconciler.run_pass().await.unwrap();
    assert_eq!(outcome, PassOutcome::NoAction);
    assert_eq!(orchestrator.total_calls(), 0);
}

#[tokio::test]
async fn test_rollback_decision_reaches_the_orchestrator() {
    let orchestrator = Arc::new(RecordingOrchestrator::with_rollback_revision("4"));
    let reconciler = reconciler(
        error_records(10, 10),
        r#"{"action": "rollback", "deployment_name": "nginx"}"#,
        Arc::clone(&orchestrator),
    );

    let outcome = reconciler.run_pass().await.unwrap();
    assert_eq!(
        outcome,
        PassOutcome::RolledBack {
            revision: "4".to_string()
        }
    );
    assert_eq!(orchestrator.rollback_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rollback_without_history_fails_the_pass() {
    // Scenario D: only one ReplicaSet exists; the pass fails, the template
    // is untouched.
    let orchestrator = Arc::new(RecordingOrchestrator::with_no_previous_revision());
    let reconciler = reconciler(
        error_records(10, 10),
        r#"{"action": "rollback", "deployment_name": "nginx"}"#,
        Arc::clone(&orchestrator),
    );

    let err = reconciler.run_pass().await.unwrap_err();
    assert!(matches!(
        err,
        PassError::Actuate(OrchestratorError::NoPreviousRevision { .. })
    ));
}

#[tokio::test]
async fn test_scale_is_idempotent() {
    let orchestrator = Arc::new(RecordingOrchestrator::default());
    let reconciler = reconciler(
        error_records(5, 5),
        r#"{"action": "scale", "replicas": 3}"#,
        Arc::clone(&orchestrator),
    );

    let first = reconciler.manual_scale(3).await.unwrap();
    let second = reconciler.manual_scale(3).await.unwrap();
    assert_eq!(first, 3);
    assert_eq!(second, 3);
    assert_eq!(orchestrator.replica_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_held_single_flight_skips_actuation() {
    let orchestrator = Arc::new(RecordingOrchestrator::default());
    let flight = SingleFlight::new();
    let reconciler = Reconciler::new(
        Arc::new(StubSource {
            records: error_records(5, 5),
        }),
        DecisionEngine::new(Arc::new(StubModel {
            reply: r#"{"action": "scale", "replicas": 5}"#.to_string(),
        })),
        Arc::clone(&orchestrator) as Arc<dyn Orchestrator>,
        DeploymentTarget::new("nginx", "default"),
        Duration::hours(2),
        20,
        flight.clone(),
        HealthRegistry::new(),
        AgentMetrics::new(),
    );

    let _held = flight.try_acquire("default/nginx").unwrap();

    let outcome = reconciler.run_pass().await.unwrap();
    assert_eq!(outcome, PassOutcome::Contended);
    assert_eq!(orchestrator.total_calls(), 0);
}

#[tokio::test]
async fn test_fetch_failure_is_terminal_for_the_pass() {
    struct DownSource;

    #[async_trait]
    impl LogSource for DownSource {
        async fn fetch(&self, _: &str, _: usize) -> Result<Vec<LogRecord>, SourceError> {
            Err(SourceError::Unavailable {
                message: "connection refused".to_string(),
            })
        }
    }

    let orchestrator = Arc::new(RecordingOrchestrator::default());
    let reconciler = Reconciler::new(
        Arc::new(DownSource),
        DecisionEngine::new(Arc::new(StubModel {
            reply: r#"{"action": "none"}"#.to_string(),
        })),
        Arc::clone(&orchestrator) as Arc<dyn Orchestrator>,
        DeploymentTarget::new("nginx", "default"),
        Duration::hours(2),
        20,
        SingleFlight::new(),
        HealthRegistry::new(),
        AgentMetrics::new(),
    );

    let err = reconciler.run_pass().await.unwrap_err();
    assert!(matches!(err, PassError::Fetch(SourceError::Unavailable { .. })));
    assert_eq!(orchestrator.total_calls(), 0);
}

#[tokio::test]
async fn test_spawned_pass_completes_in_background() {
    let orchestrator = Arc::new(RecordingOrchestrator::default());
    let reconciler = Arc::new(reconciler(
        error_records(5, 5),
        r#"{"action": "scale", "replicas": 2}"#,
        Arc::clone(&orchestrator),
    ));

    reconciler.spawn_pass();

    // The trigger returns immediately; poll briefly for the background
    // pass to land its patch.
    for _ in 0..50 {
        if orchestrator.scale_calls.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(orchestrator.replica_count.load(Ordering::SeqCst), 2);
}
