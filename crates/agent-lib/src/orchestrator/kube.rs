//! Kubernetes-backed actuator

use super::{previous_revision, revision_id, Orchestrator, OrchestratorError};
use crate::models::DeploymentTarget;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use serde_json::json;
use tracing::{debug, info};

impl From<kube::Error> for OrchestratorError {
    fn from(e: kube::Error) -> Self {
        OrchestratorError::Actuation {
            message: e.to_string(),
        }
    }
}

/// Actuator talking to the cluster through the process-wide kube client
///
/// The client is created once at startup from ambient credentials
/// (kubeconfig or in-cluster service account) and is safe for concurrent
/// use; each call here is self-contained.
#[derive(Clone)]
pub struct KubeOrchestrator {
    client: Client,
}

impl KubeOrchestrator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn replica_sets(&self, namespace: &str) -> Api<ReplicaSet> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl Orchestrator for KubeOrchestrator {
    async fn scale(
        &self,
        target: &DeploymentTarget,
        replicas: u32,
    ) -> Result<u32, OrchestratorError> {
        debug!(
            deployment = %target.name,
            namespace = %target.namespace,
            replicas = replicas,
            "Patching deployment scale subresource"
        );

        let patch = json!({ "spec": { "replicas": replicas } });
        let scale = self
            .deployments(&target.namespace)
            .patch_scale(&target.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        let observed = scale
            .status
            .map(|s| s.replicas)
            .or_else(|| scale.spec.and_then(|s| s.replicas))
            .unwrap_or(replicas as i32)
            .max(0) as u32;

        info!(
            deployment = %target.name,
            namespace = %target.namespace,
            replicas = observed,
            "Deployment scaled"
        );
        Ok(observed)
    }

    async fn rollback_to_previous(
        &self,
        target: &DeploymentTarget,
    ) -> Result<String, OrchestratorError> {
        let selector = target.app_selector();
        debug!(
            deployment = %target.name,
            namespace = %target.namespace,
            selector = %selector,
            "Listing ReplicaSet history"
        );

        let history = self
            .replica_sets(&target.namespace)
            .list(&ListParams::default().labels(&selector))
            .await?
            .items;

        let previous = previous_revision(history, &target.name)?;
        let revision = revision_id(&previous);

        // The previous pod spec is applied verbatim, exactly as the old
        // ReplicaSet recorded it. No field-level merge, no validation that
        // it is still deployable.
        let pod_spec = previous
            .spec
            .and_then(|s| s.template)
            .and_then(|t| t.spec)
            .ok_or_else(|| OrchestratorError::Actuation {
                message: format!(
                    "previous ReplicaSet for {} has no pod template spec",
                    target.name
                ),
            })?;

        let patch = json!({ "spec": { "template": { "spec": pod_spec } } });
        self.deployments(&target.namespace)
            .patch(&target.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        info!(
            deployment = %target.name,
            namespace = %target.namespace,
            revision = %revision,
            "Deployment rolled back to previous revision"
        );
        Ok(revision)
    }
}
