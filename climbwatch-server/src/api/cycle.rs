//! Shared handler logic for the `*/store` ingestion triggers

use climbwatch_common::Branch;
use serde::Serialize;

use crate::error::ApiResult;
use crate::ingest::{CycleSummary, DataKind};
use crate::AppState;

use super::PrettyJson;

/// Body returned when every branch was stored
#[derive(Debug, Serialize)]
pub struct StoreResponse {
    pub message: String,
    pub kind: DataKind,
    pub branches: Vec<Branch>,
}

impl From<CycleSummary> for StoreResponse {
    fn from(summary: CycleSummary) -> Self {
        Self {
            message: "Store Succeeded".to_string(),
            kind: summary.kind,
            branches: summary.branches,
        }
    }
}

/// Run one cycle; failures are remembered for `/health` and surface as 500
pub async fn run_store_cycle(state: &AppState, kind: DataKind) -> ApiResult<PrettyJson<StoreResponse>> {
    match state.ingestor.run_cycle(kind).await {
        Ok(summary) => Ok(PrettyJson(summary.into())),
        Err(failure) => {
            state.record_error(failure.to_string()).await;
            Err(failure.into())
        }
    }
}
