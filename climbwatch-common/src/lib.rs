//! # Climbwatch Common Library
//!
//! Shared code for the climbwatch service:
//! - Branch registry (the fixed set of tracked gyms)
//! - Occupancy and expected-attendance records
//! - Upstream timestamp parsing and storage normalization
//! - Common error type

pub mod branch;
pub mod error;
pub mod models;
pub mod time;

pub use branch::{Branch, BranchMap};
pub use error::{Error, Result};
pub use models::{ExpectedAttendanceSlot, OccupancyReading, EXPECTED_SLOTS_PER_BRANCH};
