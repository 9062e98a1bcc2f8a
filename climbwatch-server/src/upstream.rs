//! Upstream gym API client
//!
//! Two endpoints, both templated as `base_url + branch.upstream_id()`:
//! - occupancy: one JSON object per branch
//! - trend line: a JSON array of hourly expected-attendance slots
//!
//! The client never substitutes a zero-valued record on failure. Every
//! network, status or decode problem comes back as an [`UpstreamError`] so the
//! orchestrator can record it and leave stored data alone.

use async_trait::async_trait;
use climbwatch_common::{Branch, ExpectedAttendanceSlot, OccupancyReading, EXPECTED_SLOTS_PER_BRANCH};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;

const USER_AGENT: &str = concat!("climbwatch/", env!("CARGO_PKG_VERSION"));

/// Upstream fetch errors
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Stable tag used in error envelopes
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Decode(_) => "decode",
            _ => "upstream",
        }
    }

    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout(url.to_string())
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

/// Source of per-branch payloads consumed by ingestion cycles
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    async fn fetch_occupancy(&self, branch: Branch) -> Result<OccupancyReading, UpstreamError>;

    async fn fetch_expected_attendance(
        &self,
        branch: Branch,
    ) -> Result<Vec<ExpectedAttendanceSlot>, UpstreamError>;
}

/// HTTP client for the vendor API
pub struct UpstreamClient {
    http_client: reqwest::Client,
    occupancy_url: String,
    attendance_url: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            occupancy_url: config.occupancy_url.clone(),
            attendance_url: config.attendance_url.clone(),
        })
    }

    pub fn occupancy_url(&self, branch: Branch) -> String {
        format!("{}{}", self.occupancy_url, branch.upstream_id())
    }

    pub fn attendance_url(&self, branch: Branch) -> String {
        format!("{}{}", self.attendance_url, branch.upstream_id())
    }

    /// GET `url` and decode the body as `T`
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, UpstreamError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, e))?;

        serde_json::from_slice(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[async_trait]
impl UpstreamSource for UpstreamClient {
    async fn fetch_occupancy(&self, branch: Branch) -> Result<OccupancyReading, UpstreamError> {
        let url = self.occupancy_url(branch);
        debug!(branch = %branch, url = %url, "Fetching occupancy");

        let reading: OccupancyReading = self.get_json(&url).await?;

        debug!(
            branch = %branch,
            status = %reading.status,
            current_percentage = reading.current_percentage,
            "Occupancy fetched"
        );
        Ok(reading)
    }

    async fn fetch_expected_attendance(
        &self,
        branch: Branch,
    ) -> Result<Vec<ExpectedAttendanceSlot>, UpstreamError> {
        let url = self.attendance_url(branch);
        debug!(branch = %branch, url = %url, "Fetching expected attendance");

        let slots: Vec<ExpectedAttendanceSlot> = self.get_json(&url).await?;

        if slots.len() != EXPECTED_SLOTS_PER_BRANCH {
            warn!(
                branch = %branch,
                slots = slots.len(),
                expected = EXPECTED_SLOTS_PER_BRANCH,
                "Unexpected number of attendance slots"
            );
        }
        Ok(slots)
    }
}
