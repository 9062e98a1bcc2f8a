//! Google Cloud project id resolution
//!
//! `GOOGLE_CLOUD_PROJECT` wins. Otherwise the GCE metadata server is asked,
//! which only answers inside Google Cloud; elsewhere the lookup fails fast and
//! the service runs without a project id.

use std::time::Duration;

use tracing::{info, warn};

use crate::upstream::UpstreamError;

/// Metadata server endpoint for the project id
pub const METADATA_PROJECT_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/project/project-id";

const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

/// Query a metadata endpoint for the project id
pub async fn fetch_project_id(url: &str, timeout: Duration) -> Result<String, UpstreamError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| UpstreamError::Network(e.to_string()))?;

    let response = client
        .get(url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| UpstreamError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    let project = response
        .text()
        .await
        .map_err(|e| UpstreamError::Decode(e.to_string()))?;
    let project = project.trim();
    if project.is_empty() {
        return Err(UpstreamError::Decode("empty project id".to_string()));
    }
    Ok(project.to_string())
}

/// Resolve the project id, falling back to the metadata server
pub async fn resolve_project_id(configured: Option<String>) -> Option<String> {
    if let Some(project) = configured {
        return Some(project);
    }

    match fetch_project_id(METADATA_PROJECT_URL, METADATA_TIMEOUT).await {
        Ok(project) => {
            info!(project = %project, "Project id resolved from metadata server");
            Some(project)
        }
        Err(e) => {
            warn!("Unable to detect project id from GOOGLE_CLOUD_PROJECT or metadata server: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configured_project_wins() {
        let project = resolve_project_id(Some("gym-stats".to_string())).await;
        assert_eq!(project.as_deref(), Some("gym-stats"));
    }

    #[tokio::test]
    async fn test_metadata_lookup_against_local_server() {
        use axum::{http::HeaderMap, routing::get, Router};

        let app = Router::new().route(
            "/project-id",
            get(|headers: HeaderMap| async move {
                match headers.get("Metadata-Flavor").and_then(|v| v.to_str().ok()) {
                    Some("Google") => (axum::http::StatusCode::OK, "gym-stats-123\n"),
                    _ => (axum::http::StatusCode::FORBIDDEN, ""),
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let url = format!("http://{}/project-id", addr);
        let project = fetch_project_id(&url, Duration::from_secs(2)).await.unwrap();
        assert_eq!(project, "gym-stats-123");
    }
}
