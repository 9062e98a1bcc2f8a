//! Query surface: current per-branch state for external consumers
//!
//! The memory backend answers from a snapshot of live state; the database
//! backend runs a fresh full-table read on every call.

use climbwatch_common::{BranchMap, ExpectedAttendanceSlot, OccupancyReading};
use serde::Serialize;

use crate::ingest::DataKind;
use crate::store::{BranchStore, StoreResult};

/// Per-branch state for one [`DataKind`], serialized as a bare map
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BranchState {
    Occupancy(BranchMap<OccupancyReading>),
    Attendance(BranchMap<ExpectedAttendanceSlot>),
}

/// Read the current state of `kind` from the store
pub async fn current_state(store: &dyn BranchStore, kind: DataKind) -> StoreResult<BranchState> {
    Ok(match kind {
        DataKind::Occupancy => BranchState::Occupancy(store.read_occupancy().await?),
        DataKind::Attendance => BranchState::Attendance(store.read_attendance().await?),
    })
}
