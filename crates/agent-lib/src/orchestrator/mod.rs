//! Orchestration actuator
//!
//! Applies a decided action against the Kubernetes API: a scale-subresource
//! patch, or a rollback to the previous ReplicaSet revision. No internal
//! retries; a retry policy, if any, belongs to the caller.

mod kube;
mod revision;

pub use self::kube::KubeOrchestrator;
pub use revision::{previous_revision, revision_id};

use crate::models::DeploymentTarget;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from the orchestration actuator
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Fewer than two ReplicaSets match the deployment's label selector,
    /// so there is nothing to roll back to. A selector that matches the
    /// wrong label schema lands here as well.
    #[error("no previous revision found for deployment {deployment}")]
    NoPreviousRevision { deployment: String },

    /// The orchestration API rejected the call (permission, not-found,
    /// conflict, ...)
    #[error("orchestration API call failed: {message}")]
    Actuation { message: String },
}

/// Applies remediation actions to a deployment
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Patch the deployment's scale subresource to `replicas`
    ///
    /// Returns the replica count observed after the patch. Idempotent for a
    /// fixed count.
    async fn scale(
        &self,
        target: &DeploymentTarget,
        replicas: u32,
    ) -> Result<u32, OrchestratorError>;

    /// Roll the deployment back to its second-newest ReplicaSet revision
    ///
    /// Returns the identifier of the revision rolled back to.
    async fn rollback_to_previous(
        &self,
        target: &DeploymentTarget,
    ) -> Result<String, OrchestratorError>;
}
