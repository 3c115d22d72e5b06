//! Core data models for the remediation agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Log severity as reported by the logging backend
///
/// Cloud Logging's `DEFAULT` collapses to `Debug`; `ALERT` and `EMERGENCY`
/// collapse to `Critical`. Unknown values also land on `Debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
}

impl From<&str> for Severity {
    fn from(name: &str) -> Self {
        match name {
            "INFO" => Severity::Info,
            "NOTICE" => Severity::Notice,
            "WARNING" => Severity::Warning,
            "ERROR" => Severity::Error,
            "CRITICAL" | "ALERT" | "EMERGENCY" => Severity::Critical,
            _ => Severity::Debug,
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Severity::from(name.as_str()))
    }
}

/// One log entry fetched from the logging backend
///
/// Produced only by the log source adapter, never mutated, discarded after
/// one reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_label: Option<String>,
}

/// The deployment a reconciliation pass acts upon
///
/// Configuration, not runtime state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub name: String,
    pub namespace: String,
}

impl DeploymentTarget {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Key used for per-target single-flight tracking
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Label selector matching the deployment's ReplicaSets
    ///
    /// Assumes the `app=<name>` label schema. A mismatching schema yields an
    /// empty ReplicaSet list downstream, which rollback treats as "no
    /// previous revision".
    pub fn app_selector(&self) -> String {
        format!("app={}", self.name)
    }
}

/// Action decided by the model for one reconciliation pass
///
/// Exactly one variant per decision. Output that cannot be parsed into one
/// of the well-formed shapes maps to `Invalid`, never to `NoAction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionPlan {
    #[serde(rename = "none")]
    NoAction,
    #[serde(rename = "scale")]
    ScaleTo { replicas: u32 },
    #[serde(rename = "rollback")]
    RollbackTo {
        deployment_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        revision: Option<String>,
    },
    Invalid { reason: String },
}

impl ActionPlan {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ActionPlan::NoAction => "none",
            ActionPlan::ScaleTo { .. } => "scale",
            ActionPlan::RollbackTo { .. } => "rollback",
            ActionPlan::Invalid { .. } => "invalid",
        }
    }
}
