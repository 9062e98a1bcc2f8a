//! Liveness, service info and fallback handlers

use axum::{extract::State, http::Uri, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

use super::PrettyJson;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" or "degraded" (store unreachable)
    pub status: String,
    pub module: String,
    pub version: String,
    pub backend: String,
    pub uptime_seconds: u64,
    /// Last ingestion failure, for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> PrettyJson<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let status = match state.store.health_check().await {
        Ok(()) => "ok",
        Err(e) => {
            warn!("Store health check failed: {}", e);
            "degraded"
        }
    };

    PrettyJson(HealthResponse {
        status: status.to_string(),
        module: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.store.backend_name().to_string(),
        uptime_seconds,
        last_error: state.last_error.read().await.clone(),
    })
}

/// Service identification for `GET /`
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub project_id: Option<String>,
    pub backend: String,
}

/// GET /
pub async fn service_info(State(state): State<AppState>) -> PrettyJson<ServiceInfo> {
    PrettyJson(ServiceInfo {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        project_id: state.project_id.clone(),
        backend: state.store.backend_name().to_string(),
    })
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
}
