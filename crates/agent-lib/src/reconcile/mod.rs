//! Reconciliation pass
//!
//! Sequences one fetch → decide → act cycle for the configured deployment.
//! Passes are stateless and independent; only the actuation step is
//! serialized per target through the single-flight guard. There is no
//! cancellation and no timeout on the inference call: a pass runs to
//! completion or failure.

mod flight;

#[cfg(test)]
mod tests;

pub use flight::{FlightGuard, SingleFlight};

use crate::decision::{DecisionEngine, DecisionError};
use crate::health::{components, HealthRegistry};
use crate::logsource::{error_filter_since, LogSource, SourceError};
use crate::models::{ActionPlan, DeploymentTarget};
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::orchestrator::{Orchestrator, OrchestratorError};
use chrono::Duration;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Terminal failure of one reconciliation pass
#[derive(Debug, Error)]
pub enum PassError {
    #[error("log fetch failed: {0}")]
    Fetch(#[from] SourceError),

    #[error("decision failed: {0}")]
    Decide(#[from] DecisionError),

    #[error("actuation failed: {0}")]
    Actuate(#[from] OrchestratorError),
}

impl PassError {
    fn stage(&self) -> &'static str {
        match self {
            PassError::Fetch(_) => "fetch",
            PassError::Decide(_) => "decide",
            PassError::Actuate(_) => "actuate",
        }
    }
}

/// How one reconciliation pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The log window was empty; nothing to decide on
    NoLogs,
    /// The model decided no action was necessary
    NoAction,
    /// The model reply could not be parsed into an action
    Invalid { reason: String },
    /// The deployment was scaled; carries the observed replica count
    Scaled { replicas: u32 },
    /// The deployment was rolled back; carries the revision id
    RolledBack { revision: String },
    /// Another pass held the actuation step for this target
    Contended,
}

/// Everything a pass needs, injected once at startup
///
/// Components hold no globals; the process-wide clients live behind the
/// trait objects and are safe for concurrent passes.
pub struct Reconciler {
    source: Arc<dyn LogSource>,
    engine: DecisionEngine,
    orchestrator: Arc<dyn Orchestrator>,
    target: DeploymentTarget,
    log_window: Duration,
    max_entries: usize,
    flight: SingleFlight,
    health: HealthRegistry,
    metrics: AgentMetrics,
    logger: StructuredLogger,
}

impl Reconciler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn LogSource>,
        engine: DecisionEngine,
        orchestrator: Arc<dyn Orchestrator>,
        target: DeploymentTarget,
        log_window: Duration,
        max_entries: usize,
        flight: SingleFlight,
        health: HealthRegistry,
        metrics: AgentMetrics,
    ) -> Self {
        let logger = StructuredLogger::new(target.key());
        Self {
            source,
            engine,
            orchestrator,
            target,
            log_window,
            max_entries,
            flight,
            health,
            metrics,
            logger,
        }
    }

    pub fn target(&self) -> &DeploymentTarget {
        &self.target
    }

    /// Run one fetch → decide → act cycle
    pub async fn run_pass(&self) -> Result<PassOutcome, PassError> {
        let filter = error_filter_since(self.log_window);
        self.logger.log_pass_started(&filter, self.max_entries);

        let fetch_start = Instant::now();
        let records = match self.source.fetch(&filter, self.max_entries).await {
            Ok(records) => {
                self.health.set_healthy(components::LOG_SOURCE).await;
                records
            }
            Err(e) => {
                self.health
                    .set_degraded(components::LOG_SOURCE, e.to_string())
                    .await;
                return Err(e.into());
            }
        };
        self.metrics
            .observe_fetch_latency(fetch_start.elapsed().as_secs_f64());

        if records.is_empty() {
            self.logger.log_no_logs();
            return Ok(PassOutcome::NoLogs);
        }

        let decide_start = Instant::now();
        let plan = match self.engine.decide(&records).await {
            Ok(plan) => {
                self.health.set_healthy(components::DECISION_ENGINE).await;
                plan
            }
            Err(e) => {
                self.health
                    .set_degraded(components::DECISION_ENGINE, e.to_string())
                    .await;
                return Err(e.into());
            }
        };
        self.metrics
            .observe_inference_latency(decide_start.elapsed().as_secs_f64());
        self.metrics.inc_decision(plan.kind());
        self.logger.log_decision(plan.kind(), records.len());

        match plan {
            ActionPlan::NoAction => Ok(PassOutcome::NoAction),
            ActionPlan::Invalid { reason } => {
                self.logger.log_invalid_decision(&reason);
                Ok(PassOutcome::Invalid { reason })
            }
            ActionPlan::ScaleTo { replicas } => {
                let Some(_guard) = self.flight.try_acquire(&self.target.key()) else {
                    self.logger.log_contended();
                    return Ok(PassOutcome::Contended);
                };
                let observed = self.actuate_scale(&self.target, replicas).await?;
                Ok(PassOutcome::Scaled { replicas: observed })
            }
            ActionPlan::RollbackTo {
                deployment_name, ..
            } => {
                // The model names the deployment; the namespace is ours.
                let target = DeploymentTarget::new(deployment_name, &self.target.namespace);
                let Some(_guard) = self.flight.try_acquire(&target.key()) else {
                    self.logger.log_contended();
                    return Ok(PassOutcome::Contended);
                };
                let revision = self.actuate_rollback(&target).await?;
                Ok(PassOutcome::RolledBack { revision })
            }
        }
    }

    /// Fire-and-forget pass for the on-demand trigger
    ///
    /// Failures are terminal for the pass and observable only via logs and
    /// metrics; the triggering request has already returned.
    pub fn spawn_pass(self: &Arc<Self>) {
        self.metrics.inc_passes_triggered();
        let reconciler = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = reconciler.run_pass().await {
                reconciler.logger.log_pass_failed(e.stage(), &e.to_string());
                reconciler.metrics.inc_passes_failed();
            }
        });
    }

    /// Operator-supplied scale, bypassing fetch and decide
    ///
    /// Runs synchronously; errors propagate to the caller.
    pub async fn manual_scale(&self, replicas: u32) -> Result<u32, OrchestratorError> {
        self.actuate_scale(&self.target, replicas).await
    }

    async fn actuate_scale(
        &self,
        target: &DeploymentTarget,
        replicas: u32,
    ) -> Result<u32, OrchestratorError> {
        match self.orchestrator.scale(target, replicas).await {
            Ok(observed) => {
                self.health.set_healthy(components::ORCHESTRATOR).await;
                self.metrics.inc_actuation("scale");
                self.logger.log_scaled(observed);
                Ok(observed)
            }
            Err(e) => {
                self.health
                    .set_degraded(components::ORCHESTRATOR, e.to_string())
                    .await;
                self.metrics.inc_actuation_errors();
                Err(e)
            }
        }
    }

    async fn actuate_rollback(
        &self,
        target: &DeploymentTarget,
    ) -> Result<String, OrchestratorError> {
        match self.orchestrator.rollback_to_previous(target).await {
            Ok(revision) => {
                self.health.set_healthy(components::ORCHESTRATOR).await;
                self.metrics.inc_actuation("rollback");
                self.logger.log_rolled_back(&revision);
                Ok(revision)
            }
            Err(e) => {
                self.health
                    .set_degraded(components::ORCHESTRATOR, e.to_string())
                    .await;
                self.metrics.inc_actuation_errors();
                Err(e)
            }
        }
    }
}
