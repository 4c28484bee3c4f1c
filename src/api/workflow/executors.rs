//! Executor introspection

use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::types::Json;
use crate::domain::executor::ExecutorInfo;

#[derive(Debug, Serialize)]
pub struct ListExecutorsResponse {
    pub executors: Vec<ExecutorInfo>,
    pub total: usize,
}

/// GET /api/executors
pub async fn list_executors(State(state): State<AppState>) -> Json<ListExecutorsResponse> {
    let executors = state.registry.describe_all().await;
    let total = executors.len();

    Json(ListExecutorsResponse { executors, total })
}
