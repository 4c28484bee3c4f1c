//! Workflow API - executions, executor introspection and the assistant

pub mod assistant;
pub mod executions;
pub mod executors;

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

/// Routes mounted under `/api`
pub fn create_workflow_router() -> Router<AppState> {
    Router::new()
        .route("/executions", post(executions::start_execution))
        .route("/executions/{execution_id}", get(executions::get_execution))
        .route(
            "/executions/{execution_id}/cancel",
            post(executions::cancel_execution),
        )
        .route(
            "/executions/{execution_id}/steps/{step_execution_id}/approve",
            post(executions::approve_step),
        )
        .route(
            "/executions/{execution_id}/steps/{step_execution_id}/reject",
            post(executions::reject_step),
        )
        .route(
            "/executions/{execution_id}/steps/{step_execution_id}/retry",
            post(executions::retry_step),
        )
        .route("/executors", get(executors::list_executors))
        .route("/assistant/generate", post(assistant::generate_workflow))
        .route("/assistant/save", post(assistant::save_workflow))
}
