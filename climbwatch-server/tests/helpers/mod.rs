//! Test Helper Utilities
//!
//! Shared utilities for testing climbwatch-server

#![allow(dead_code)]

pub mod mock_upstream;

pub use mock_upstream::{occupancy_json, trend_json, MockUpstream, Reply};

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use climbwatch_server::store::{BranchStore, SqlStore};
use climbwatch_server::AppState;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Upstream timeout used by tests; `Reply::Delay` must exceed it to time out
pub const TEST_UPSTREAM_TIMEOUT: Duration = Duration::from_millis(500);

/// Fresh SQLite-backed store with tables created
pub async fn sql_store() -> Arc<SqlStore> {
    Arc::new(
        SqlStore::connect("sqlite::memory:", 0)
            .await
            .expect("Failed to create in-memory database"),
    )
}

/// App state wired to the mock upstream
pub fn test_state(store: Arc<dyn BranchStore>, mock: &MockUpstream) -> AppState {
    let client = climbwatch_server::upstream::UpstreamClient::new(&mock.upstream_config(TEST_UPSTREAM_TIMEOUT))
        .expect("Failed to create upstream client");

    AppState::new(
        store,
        Arc::new(client),
        Some("test-project".to_string()),
        Duration::from_secs(10),
        CancellationToken::new(),
    )
}

/// Extract JSON body from response
pub async fn extract_json(body: Body) -> Value {
    let bytes = body.collect().await.expect("Should read body").to_bytes();
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
