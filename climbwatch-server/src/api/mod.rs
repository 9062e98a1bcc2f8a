//! HTTP API handlers for climbwatch-server
//!
//! Ingestion triggers are POST. The legacy GET paths stay as aliases so
//! existing schedulers keep working.

pub mod attendance;
pub mod branches;
pub mod cycle;
pub mod health;
pub mod pretty;

pub use attendance::attendance_routes;
pub use branches::branch_routes;
pub use health::{health_routes, not_found};
pub use pretty::PrettyJson;
