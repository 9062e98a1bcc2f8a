//! In-memory branch store
//!
//! A single `RwLock` guards both maps. Reads hand out copies, so a response
//! never observes a half-applied write. Occupancy history grows without bound
//! for the life of the process.

use std::sync::Arc;

use async_trait::async_trait;
use climbwatch_common::branch::empty_branch_map;
use climbwatch_common::{Branch, BranchMap, ExpectedAttendanceSlot, OccupancyReading};
use tokio::sync::RwLock;

use super::{BranchStore, StoreResult};

struct MemoryData {
    occupancy: BranchMap<OccupancyReading>,
    attendance: BranchMap<ExpectedAttendanceSlot>,
}

impl Default for MemoryData {
    fn default() -> Self {
        Self {
            occupancy: empty_branch_map(),
            attendance: empty_branch_map(),
        }
    }
}

/// Process-local store
#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
    offset_hours: i64,
}

impl MemoryStore {
    pub fn new(offset_hours: i64) -> Self {
        Self {
            data: Arc::new(RwLock::new(MemoryData::default())),
            offset_hours,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl BranchStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn record_occupancy(&self, branch: Branch, reading: OccupancyReading) -> StoreResult<()> {
        let reading = reading.with_offset(self.offset_hours);
        let mut data = self.data.write().await;
        data.occupancy.entry(branch).or_default().push(reading);
        Ok(())
    }

    async fn replace_attendance(
        &self,
        branch: Branch,
        slots: Vec<ExpectedAttendanceSlot>,
    ) -> StoreResult<()> {
        let mut data = self.data.write().await;
        data.attendance.insert(branch, slots);
        Ok(())
    }

    async fn read_occupancy(&self) -> StoreResult<BranchMap<OccupancyReading>> {
        Ok(self.data.read().await.occupancy.clone())
    }

    async fn read_attendance(&self) -> StoreResult<BranchMap<ExpectedAttendanceSlot>> {
        Ok(self.data.read().await.attendance.clone())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
