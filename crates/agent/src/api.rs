//! HTTP trigger surface: health checks, metrics, and reconciliation triggers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use remedy_lib::{ComponentStatus, HealthRegistry, Reconciler};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(reconciler: Arc<Reconciler>, health_registry: HealthRegistry) -> Self {
        Self {
            reconciler,
            health_registry,
        }
    }
}

/// Health check - 200 while operational, 503 once a component fails
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check - 200 once startup wiring is complete
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Kick off a reconciliation pass and return immediately
///
/// The pass runs in a background task; its failures surface only through
/// logs and metrics, never through this response.
async fn trigger_scaling(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.reconciler.spawn_pass();
    Json(json!({
        "message": "Log analysis and potential remediation action triggered in the background."
    }))
}

/// Operator-supplied scale, applied synchronously
///
/// Bypasses log fetch and decision; failures propagate to the caller with
/// the underlying API error text.
async fn scale_manual(
    State(state): State<Arc<AppState>>,
    Path(replicas): Path<u32>,
) -> impl IntoResponse {
    match state.reconciler.manual_scale(replicas).await {
        Ok(observed) => (
            StatusCode::OK,
            Json(json!({ "message": format!("Scaled to {} replicas.", observed) })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/trigger-scaling", post(trigger_scaling))
        .route("/scale-manual/:replicas", post(scale_manual))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
