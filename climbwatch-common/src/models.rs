//! Occupancy and expected-attendance records
//!
//! Field names on the wire follow the upstream API so consumers of the
//! re-served JSON see the same keys the vendor publishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time;

/// Number of hourly slots the upstream trend endpoint returns per branch
pub const EXPECTED_SLOTS_PER_BRANCH: usize = 16;

/// Point-in-time snapshot of how full a branch is
///
/// `Default` yields the zero-valued reading (epoch timestamp, empty text,
/// 0%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OccupancyReading {
    /// Epoch when upstream sends `null` or omits the key
    #[serde(rename = "LastUpdated", default, deserialize_with = "time::deserialize_upstream")]
    pub last_updated: DateTime<Utc>,

    #[serde(rename = "Name", default)]
    pub name: String,

    /// Free-text label such as "Quiet" or "Busy"
    #[serde(rename = "Status", default)]
    pub status: String,

    /// 0-100
    #[serde(rename = "CurrentPercentage")]
    pub current_percentage: f64,
}

impl OccupancyReading {
    /// Shift `last_updated` by the deployment's timestamp offset
    pub fn with_offset(mut self, offset_hours: i64) -> Self {
        self.last_updated = time::apply_offset(self.last_updated, offset_hours);
        self
    }
}

/// Forecast occupancy for one hour of the day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedAttendanceSlot {
    /// Hour of day, 0-23
    pub hour: u32,

    /// Upstream spells this key "percantage"
    #[serde(alias = "percantage")]
    pub percentage: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<f64>,
}
