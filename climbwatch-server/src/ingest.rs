//! Ingestion orchestrator
//!
//! One cycle walks every registered branch, fetches one kind of payload and
//! hands it to the store. A failing branch is logged and collected; the cycle
//! moves on. Nothing already stored for another branch is rolled back.
//!
//! A cycle stops early when the shutdown token trips or the cycle deadline
//! passes. Branches not finished by then are reported as cancelled.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use climbwatch_common::branch::empty_branch_map;
use climbwatch_common::{Branch, BranchMap, ExpectedAttendanceSlot};
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::store::{BranchStore, StoreError};
use crate::upstream::{UpstreamError, UpstreamSource};

/// Which payload a cycle ingests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// Current occupancy, appended per cycle
    Occupancy,
    /// Expected-attendance trend, replaced per cycle
    Attendance,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Occupancy => f.write_str("occupancy"),
            DataKind::Attendance => f.write_str("attendance"),
        }
    }
}

/// Why one branch's step failed
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Cancelled: {0}")]
    Cancelled(&'static str),
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Upstream(e) => e.kind(),
            IngestError::Store(e) => e.kind(),
            IngestError::Cancelled(_) => "cancelled",
        }
    }
}

/// A failed branch within a cycle
#[derive(Debug)]
pub struct BranchError {
    pub branch: Branch,
    pub error: IngestError,
}

impl Serialize for BranchError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("BranchError", 3)?;
        s.serialize_field("branch", &self.branch)?;
        s.serialize_field("kind", self.error.kind())?;
        s.serialize_field("message", &self.error.to_string())?;
        s.end()
    }
}

/// Every branch succeeded
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub kind: DataKind,
    pub branches: Vec<Branch>,
}

/// At least one branch failed; `succeeded` lists the ones that were stored
#[derive(Debug, Error)]
#[error("{kind} ingestion failed for {count} branch(es)", count = .errors.len())]
pub struct CycleFailure {
    pub kind: DataKind,
    pub succeeded: Vec<Branch>,
    pub errors: Vec<BranchError>,
}

/// Runs ingestion cycles against one upstream source and one store
pub struct Ingestor {
    upstream: Arc<dyn UpstreamSource>,
    store: Arc<dyn BranchStore>,
    cycle_timeout: Duration,
    shutdown: CancellationToken,
}

impl Ingestor {
    pub fn new(
        upstream: Arc<dyn UpstreamSource>,
        store: Arc<dyn BranchStore>,
        cycle_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            upstream,
            store,
            cycle_timeout,
            shutdown,
        }
    }

    /// Run one best-effort pass over every branch
    pub async fn run_cycle(&self, kind: DataKind) -> Result<CycleSummary, CycleFailure> {
        let deadline = Instant::now() + self.cycle_timeout;
        let mut succeeded = Vec::new();
        let mut errors = Vec::new();

        info!(kind = %kind, "Ingestion cycle started");

        for branch in Branch::all() {
            let step = self.ingest_branch(kind, branch);
            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Err(IngestError::Cancelled("shutdown in progress")),
                outcome = tokio::time::timeout_at(deadline, step) => {
                    outcome.unwrap_or(Err(IngestError::Cancelled("cycle deadline exceeded")))
                }
            };

            match result {
                Ok(()) => succeeded.push(branch),
                Err(e) => {
                    error!(kind = %kind, branch = %branch, error_kind = e.kind(), "Ingestion failed: {}", e);
                    errors.push(BranchError { branch, error: e });
                }
            }
        }

        if errors.is_empty() {
            info!(kind = %kind, branches = succeeded.len(), "Ingestion cycle complete");
            Ok(CycleSummary {
                kind,
                branches: succeeded,
            })
        } else {
            warn!(
                kind = %kind,
                succeeded = succeeded.len(),
                failed = errors.len(),
                "Ingestion cycle finished with errors"
            );
            Err(CycleFailure {
                kind,
                succeeded,
                errors,
            })
        }
    }

    async fn ingest_branch(&self, kind: DataKind, branch: Branch) -> Result<(), IngestError> {
        match kind {
            DataKind::Occupancy => {
                let reading = self.upstream.fetch_occupancy(branch).await?;
                self.store.record_occupancy(branch, reading).await?;
            }
            DataKind::Attendance => {
                let slots = self.upstream.fetch_expected_attendance(branch).await?;
                self.store.replace_attendance(branch, slots).await?;
            }
        }
        Ok(())
    }

    /// Fetch attendance for every branch without storing it
    pub async fn preview_attendance(&self) -> (BranchMap<ExpectedAttendanceSlot>, Vec<BranchError>) {
        let mut map = empty_branch_map();
        let mut errors = Vec::new();

        for branch in Branch::all() {
            match self.upstream.fetch_expected_attendance(branch).await {
                Ok(slots) => {
                    map.insert(branch, slots);
                }
                Err(e) => {
                    warn!(branch = %branch, "Attendance preview failed: {}", e);
                    errors.push(BranchError {
                        branch,
                        error: e.into(),
                    });
                }
            }
        }
        (map, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use climbwatch_common::OccupancyReading;
    use std::collections::HashMap;

    /// Scripted upstream: branches missing from `fail` succeed
    #[derive(Default)]
    struct FakeUpstream {
        fail: HashMap<Branch, fn() -> UpstreamError>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl UpstreamSource for FakeUpstream {
        async fn fetch_occupancy(&self, branch: Branch) -> Result<OccupancyReading, UpstreamError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(make) = self.fail.get(&branch) {
                return Err(make());
            }
            Ok(OccupancyReading {
                name: branch.name().to_string(),
                status: "Quiet".to_string(),
                current_percentage: branch.storage_id() as f64 * 10.0,
                ..Default::default()
            })
        }

        async fn fetch_expected_attendance(
            &self,
            branch: Branch,
        ) -> Result<Vec<ExpectedAttendanceSlot>, UpstreamError> {
            if let Some(make) = self.fail.get(&branch) {
                return Err(make());
            }
            Ok((6..22)
                .map(|hour| ExpectedAttendanceSlot {
                    hour,
                    percentage: hour as f64,
                    remaining: None,
                })
                .collect())
        }
    }

    fn ingestor(upstream: FakeUpstream, store: Arc<MemoryStore>) -> Ingestor {
        Ingestor::new(
            Arc::new(upstream),
            store,
            Duration::from_secs(5),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_occupancy_cycle_success() {
        let store = Arc::new(MemoryStore::default());
        let summary = ingestor(FakeUpstream::default(), store.clone())
            .run_cycle(DataKind::Occupancy)
            .await
            .unwrap();

        assert_eq!(summary.kind, DataKind::Occupancy);
        assert_eq!(summary.branches.len(), 3);

        let map = store.read_occupancy().await.unwrap();
        assert!(map.values().all(|v| v.len() == 1));
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_successful_branches() {
        let store = Arc::new(MemoryStore::default());
        let mut upstream = FakeUpstream::default();
        upstream
            .fail
            .insert(Branch::Milton, || UpstreamError::Timeout("milton".to_string()));

        let failure = ingestor(upstream, store.clone())
            .run_cycle(DataKind::Occupancy)
            .await
            .unwrap_err();

        assert_eq!(failure.errors.len(), 1);
        assert_eq!(failure.errors[0].branch, Branch::Milton);
        assert_eq!(failure.errors[0].error.kind(), "upstream");
        assert_eq!(failure.succeeded.len(), 2);

        let map = store.read_occupancy().await.unwrap();
        assert_eq!(map[&Branch::Westend].len(), 1);
        assert_eq!(map[&Branch::Newstead].len(), 1);
        assert!(map[&Branch::Milton].is_empty());
    }

    #[tokio::test]
    async fn test_decode_failure_preserves_prior_attendance() {
        let store = Arc::new(MemoryStore::default());
        ingestor(FakeUpstream::default(), store.clone())
            .run_cycle(DataKind::Attendance)
            .await
            .unwrap();

        let mut upstream = FakeUpstream::default();
        upstream
            .fail
            .insert(Branch::Westend, || UpstreamError::Decode("expected value".to_string()));
        let failure = ingestor(upstream, store.clone())
            .run_cycle(DataKind::Attendance)
            .await
            .unwrap_err();

        assert_eq!(failure.errors[0].error.kind(), "decode");
        let map = store.read_attendance().await.unwrap();
        assert_eq!(map[&Branch::Westend].len(), 16);
    }

    #[tokio::test]
    async fn test_cancelled_cycle_reports_every_branch() {
        let store = Arc::new(MemoryStore::default());
        let token = CancellationToken::new();
        token.cancel();
        let ingestor = Ingestor::new(
            Arc::new(FakeUpstream::default()),
            store.clone(),
            Duration::from_secs(5),
            token,
        );

        let failure = ingestor.run_cycle(DataKind::Occupancy).await.unwrap_err();
        assert_eq!(failure.errors.len(), 3);
        assert!(failure.errors.iter().all(|e| e.error.kind() == "cancelled"));
        assert!(store.read_occupancy().await.unwrap().values().all(|v| v.is_empty()));
    }

    #[tokio::test]
    async fn test_cycle_deadline() {
        let store = Arc::new(MemoryStore::default());
        let upstream = FakeUpstream {
            delay: Some(Duration::from_millis(500)),
            ..Default::default()
        };
        let ingestor = Ingestor::new(
            Arc::new(upstream),
            store,
            Duration::from_millis(50),
            CancellationToken::new(),
        );

        let failure = ingestor.run_cycle(DataKind::Occupancy).await.unwrap_err();
        assert_eq!(failure.errors.len(), 3);
        assert!(failure.succeeded.is_empty());
    }

    #[tokio::test]
    async fn test_preview_does_not_store() {
        let store = Arc::new(MemoryStore::default());
        let (map, errors) = ingestor(FakeUpstream::default(), store.clone())
            .preview_attendance()
            .await;

        assert!(errors.is_empty());
        assert!(map.values().all(|v| v.len() == 16));
        assert!(store.read_attendance().await.unwrap().values().all(|v| v.is_empty()));
    }

    #[test]
    fn test_branch_error_serializes_envelope_fields() {
        let err = BranchError {
            branch: Branch::Newstead,
            error: IngestError::Cancelled("shutdown in progress"),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["branch"], "newstead");
        assert_eq!(value["kind"], "cancelled");
        assert_eq!(value["message"], "Cancelled: shutdown in progress");
    }

    #[test]
    fn test_cycle_failure_message() {
        let failure = CycleFailure {
            kind: DataKind::Attendance,
            succeeded: vec![],
            errors: vec![BranchError {
                branch: Branch::Milton,
                error: IngestError::Cancelled("x"),
            }],
        };
        assert_eq!(failure.to_string(), "attendance ingestion failed for 1 branch(es)");
    }
}
