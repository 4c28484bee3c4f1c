//! Execution endpoints
//!
//! Engine operations always yield an [`ExecutionResult`]; the HTTP status only
//! distinguishes results that carry execution state from those that do not.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::api::middleware::ActingUser;
use crate::api::state::AppState;
use crate::api::types::Json;
use crate::domain::execution::{ExecutionId, ExecutionResult, StepExecutionId};
use crate::domain::recipe::{RecipeId, Step};

/// POST /api/executions body
#[derive(Debug, Clone, Deserialize)]
pub struct StartExecutionRequest {
    pub recipe_id: RecipeId,
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
    /// Replaces the recipe's steps for this run only
    #[serde(default)]
    pub custom_steps: Option<Vec<Step>>,
}

/// Retry body; both fields optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryStepRequest {
    #[serde(default)]
    pub modified_prompt: Option<String>,
    #[serde(default)]
    pub modified_inputs: Option<HashMap<String, Value>>,
}

type ExecutionResponse = (StatusCode, Json<ExecutionResult>);

fn respond(result: ExecutionResult) -> ExecutionResponse {
    let status = match (&result.status, result.error.as_deref()) {
        (Some(_), _) => StatusCode::OK,
        (None, Some(error)) if error.starts_with("Not found") => StatusCode::NOT_FOUND,
        (None, _) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(result))
}

/// POST /api/executions
pub async fn start_execution(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(request): Json<StartExecutionRequest>,
) -> ExecutionResponse {
    debug!(recipe_id = %request.recipe_id, user_id, "Starting execution");

    respond(
        state
            .engine
            .start_execution(
                request.recipe_id,
                user_id,
                request.inputs,
                request.custom_steps,
            )
            .await,
    )
}

/// GET /api/executions/{execution_id}
pub async fn get_execution(
    State(state): State<AppState>,
    Path(execution_id): Path<ExecutionId>,
) -> ExecutionResponse {
    respond(state.engine.get_execution_status(execution_id).await)
}

/// POST /api/executions/{execution_id}/steps/{step_execution_id}/approve
pub async fn approve_step(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path((execution_id, step_execution_id)): Path<(ExecutionId, StepExecutionId)>,
) -> ExecutionResponse {
    respond(
        state
            .engine
            .approve_step(execution_id, step_execution_id, user_id)
            .await,
    )
}

/// POST /api/executions/{execution_id}/steps/{step_execution_id}/reject
pub async fn reject_step(
    State(state): State<AppState>,
    Path((execution_id, step_execution_id)): Path<(ExecutionId, StepExecutionId)>,
) -> ExecutionResponse {
    respond(
        state
            .engine
            .reject_step(execution_id, step_execution_id)
            .await,
    )
}

/// POST /api/executions/{execution_id}/steps/{step_execution_id}/retry
pub async fn retry_step(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path((execution_id, step_execution_id)): Path<(ExecutionId, StepExecutionId)>,
    Json(request): Json<RetryStepRequest>,
) -> ExecutionResponse {
    debug!(
        execution_id = %execution_id,
        step_execution_id = %step_execution_id,
        has_prompt = request.modified_prompt.is_some(),
        "Retrying step"
    );

    respond(
        state
            .engine
            .retry_step(
                execution_id,
                step_execution_id,
                user_id,
                request.modified_prompt,
                request.modified_inputs,
            )
            .await,
    )
}

/// POST /api/executions/{execution_id}/cancel
pub async fn cancel_execution(
    State(state): State<AppState>,
    Path(execution_id): Path<ExecutionId>,
) -> ExecutionResponse {
    respond(state.engine.cancel_execution(execution_id).await)
}
