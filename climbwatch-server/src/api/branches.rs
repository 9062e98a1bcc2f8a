//! Occupancy endpoints
//!
//! - `GET /branches`: occupancy history per branch
//! - `POST /branches/store` (and the legacy `GET`): run one occupancy cycle

use axum::{extract::State, routing::get, Router};

use crate::error::ApiResult;
use crate::ingest::DataKind;
use crate::query::{current_state, BranchState};
use crate::AppState;

use super::cycle::{run_store_cycle, StoreResponse};
use super::PrettyJson;

/// GET /branches
pub async fn list_branches(State(state): State<AppState>) -> ApiResult<PrettyJson<BranchState>> {
    let current = current_state(state.store.as_ref(), DataKind::Occupancy).await?;
    Ok(PrettyJson(current))
}

/// POST /branches/store
pub async fn store_branches(State(state): State<AppState>) -> ApiResult<PrettyJson<StoreResponse>> {
    run_store_cycle(&state, DataKind::Occupancy).await
}

/// Build occupancy routes
pub fn branch_routes() -> Router<AppState> {
    Router::new()
        .route("/branches", get(list_branches))
        .route("/branches/store", get(store_branches).post(store_branches))
}
