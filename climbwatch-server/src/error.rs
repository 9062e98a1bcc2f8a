//! Error types for climbwatch-server HTTP handlers
//!
//! Every failure leaves the service as `{"kind": ..., "message": ...}`;
//! ingestion failures add an `errors` array with one entry per failed branch.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::api::PrettyJson;
use crate::ingest::CycleFailure;
use crate::store::StoreError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more branches failed during an ingestion cycle (500)
    #[error(transparent)]
    Cycle(#[from] CycleFailure),

    /// Store read failed (500)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Unknown route (404)
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// Stable tag for the `kind` field
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Cycle(_) => "ingestion",
            ApiError::Store(e) => e.kind(),
            ApiError::NotFound(_) => "not_found",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = self.to_string();

        let body = match self {
            ApiError::Cycle(failure) => json!({
                "kind": kind,
                "message": message,
                "succeeded": failure.succeeded,
                "errors": failure.errors,
            }),
            _ => json!({
                "kind": kind,
                "message": message,
            }),
        };

        (status, PrettyJson(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{BranchError, DataKind, IngestError};
    use crate::upstream::UpstreamError;
    use climbwatch_common::Branch;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let response = ApiError::NotFound("/nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["kind"], "not_found");
        assert_eq!(body["message"], "Resource not found: /nope");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_cycle_failure_envelope_lists_branches() {
        let failure = CycleFailure {
            kind: DataKind::Occupancy,
            succeeded: vec![Branch::Westend, Branch::Newstead],
            errors: vec![BranchError {
                branch: Branch::Milton,
                error: IngestError::Upstream(UpstreamError::Timeout("u".to_string())),
            }],
        };

        let response = ApiError::from(failure).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["kind"], "ingestion");
        assert_eq!(body["succeeded"], json!(["westend", "newstead"]));
        assert_eq!(body["errors"][0]["branch"], "milton");
        assert_eq!(body["errors"][0]["kind"], "upstream");
    }
}
