//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - Liveness probe (is the service running?)
//! - /ready, /readyz - Readiness probe (does the store answer a ping?)
//! - /version - build information captured by build.rs

use hyper::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::routes::response::{json_response, HttpResponse};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub store: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check() -> HttpResponse {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            status: "online",
            version: env!("CARGO_PKG_VERSION"),
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    )
}

/// Handle readiness probe (/ready, /readyz)
///
/// Returns 200 only if the store health check passes.
pub async fn readiness_check(state: Arc<AppState>) -> HttpResponse {
    match state.health.health_check().await {
        Ok(()) => json_response(
            StatusCode::OK,
            &ReadinessResponse {
                ready: true,
                store: "connected",
                error: None,
            },
        ),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ReadinessResponse {
                    ready: false,
                    store: "unreachable",
                    error: Some("Store health check failed"),
                },
            )
        }
    }
}

/// Handle version info (/version)
pub fn version_info() -> HttpResponse {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
            commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
            build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
            service: "quill",
        },
    )
}
