//! Expected-attendance endpoints
//!
//! The trend line changes once a day; schedulers hit `/attendance/store`
//! daily. `/attendance/preview` fetches live without touching the store;
//! `/test/attendance` is its legacy path.

use axum::{extract::State, routing::get, Router};
use climbwatch_common::{BranchMap, ExpectedAttendanceSlot};
use serde::Serialize;

use crate::error::ApiResult;
use crate::ingest::{BranchError, DataKind};
use crate::query::{current_state, BranchState};
use crate::AppState;

use super::cycle::{run_store_cycle, StoreResponse};
use super::PrettyJson;

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub attendance: BranchMap<ExpectedAttendanceSlot>,
    pub errors: Vec<BranchError>,
}

/// GET /attendance
pub async fn list_attendance(State(state): State<AppState>) -> ApiResult<PrettyJson<BranchState>> {
    let current = current_state(state.store.as_ref(), DataKind::Attendance).await?;
    Ok(PrettyJson(current))
}

/// POST /attendance/store
pub async fn store_attendance(State(state): State<AppState>) -> ApiResult<PrettyJson<StoreResponse>> {
    run_store_cycle(&state, DataKind::Attendance).await
}

/// GET /attendance/preview
pub async fn preview_attendance(State(state): State<AppState>) -> PrettyJson<PreviewResponse> {
    let (attendance, errors) = state.ingestor.preview_attendance().await;
    PrettyJson(PreviewResponse { attendance, errors })
}

/// Build attendance routes
pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/attendance", get(list_attendance))
        .route("/attendance/store", get(store_attendance).post(store_attendance))
        .route("/attendance/preview", get(preview_attendance))
        .route("/test/attendance", get(preview_attendance))
}
