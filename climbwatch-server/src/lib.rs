//! climbwatch-server library
//!
//! Polls the gym vendor's occupancy and trend-line endpoints for each
//! registered branch, stores the results in memory or in a SQL database and
//! serves them back as JSON.

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metadata;
pub mod query;
pub mod shutdown;
pub mod store;
pub mod upstream;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::ingest::Ingestor;
use crate::store::BranchStore;
use crate::upstream::UpstreamSource;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Backend holding branch data
    pub store: Arc<dyn BranchStore>,
    /// Runs ingestion cycles against `store`
    pub ingestor: Arc<Ingestor>,
    pub project_id: Option<String>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last ingestion failure, reported by `/health`
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn BranchStore>,
        upstream: Arc<dyn UpstreamSource>,
        project_id: Option<String>,
        cycle_timeout: Duration,
        ingest_shutdown: CancellationToken,
    ) -> Self {
        let ingestor = Ingestor::new(upstream, store.clone(), cycle_timeout, ingest_shutdown);
        Self {
            store,
            ingestor: Arc::new(ingestor),
            project_id,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::branch_routes())
        .merge(api::attendance_routes())
        .fallback(api::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
