//! Branch data storage
//!
//! [`BranchStore`] is the seam between ingestion and persistence. Two
//! implementations:
//! - [`MemoryStore`]: process-local, lock-guarded maps
//! - [`SqlStore`]: relational tables through sqlx (MySQL in production,
//!   SQLite for local runs and tests)
//!
//! Occupancy readings are append-only. Attendance slots are replaced per
//! branch. Both backends shift `last_updated` by the configured offset before
//! storing.

use std::sync::Arc;

use async_trait::async_trait;
use climbwatch_common::{Branch, BranchMap, ExpectedAttendanceSlot, OccupancyReading};
use thiserror::Error;

mod memory;
mod sql;

pub use memory::MemoryStore;
pub use sql::{Dialect, SqlStore};

use crate::config::StoreConfig;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),
}

impl StoreError {
    pub fn kind(&self) -> &'static str {
        "store"
    }
}

/// Storage backend for per-branch readings
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// request handler.
#[async_trait]
pub trait BranchStore: Send + Sync {
    /// Short backend name for logs and the info endpoint
    fn backend_name(&self) -> &'static str;

    /// Append one occupancy reading to the branch's history
    async fn record_occupancy(&self, branch: Branch, reading: OccupancyReading) -> StoreResult<()>;

    /// Discard the branch's attendance slots and store `slots` in their place
    async fn replace_attendance(
        &self,
        branch: Branch,
        slots: Vec<ExpectedAttendanceSlot>,
    ) -> StoreResult<()>;

    /// All occupancy readings, per branch, oldest first
    async fn read_occupancy(&self) -> StoreResult<BranchMap<OccupancyReading>>;

    /// Current attendance slots, per branch, in upstream order
    async fn read_attendance(&self) -> StoreResult<BranchMap<ExpectedAttendanceSlot>>;

    /// Check the backend can serve queries
    async fn health_check(&self) -> StoreResult<()>;
}

/// Build the configured backend
pub async fn open_store(config: &StoreConfig, offset_hours: i64) -> StoreResult<Arc<dyn BranchStore>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new(offset_hours))),
        StoreConfig::Database { url } => Ok(Arc::new(SqlStore::connect(url, offset_hours).await?)),
    }
}
