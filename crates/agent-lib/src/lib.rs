//! Core library for the log-driven remediation agent
//!
//! This crate provides:
//! - Log fetching from the cloud logging backend
//! - Model-driven scale/rollback decisions
//! - Kubernetes actuation (scale subresource, revision rollback)
//! - The reconciliation pass tying the three together
//! - Health checks and observability

pub mod decision;
pub mod health;
pub mod logsource;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod reconcile;

pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
pub use reconcile::{PassError, PassOutcome, Reconciler, SingleFlight};
