//! Workflow assistant endpoints

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::middleware::ActingUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::ai::Message;
use crate::domain::assistant::GeneratedWorkflow;
use crate::domain::recipe::{Recipe, RecipeId, Step};
use crate::infrastructure::services::AssistantReply;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateWorkflowRequest {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveWorkflowRequest {
    pub workflow: GeneratedWorkflow,
    #[serde(default)]
    pub is_template: bool,
}

/// A saved recipe as returned to the client
#[derive(Debug, Clone, Serialize)]
pub struct RecipeResponse {
    pub id: RecipeId,
    pub user_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_template: bool,
    pub steps: Vec<Step>,
    pub created_at: String,
}

impl From<&Recipe> for RecipeResponse {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id(),
            user_id: recipe.user_id(),
            name: recipe.name().to_string(),
            description: recipe.description().map(String::from),
            is_template: recipe.is_template(),
            steps: recipe.steps().to_vec(),
            created_at: recipe.created_at().to_rfc3339(),
        }
    }
}

/// POST /api/assistant/generate
pub async fn generate_workflow(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(request): Json<GenerateWorkflowRequest>,
) -> Result<Json<AssistantReply>, ApiError> {
    debug!(user_id, messages = request.messages.len(), "Generating workflow");

    let reply = state
        .assistant
        .generate_workflow(request.messages, user_id)
        .await?;

    Ok(Json(reply))
}

/// POST /api/assistant/save
pub async fn save_workflow(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(request): Json<SaveWorkflowRequest>,
) -> Result<(StatusCode, Json<RecipeResponse>), ApiError> {
    let recipe = state
        .assistant
        .save_workflow_as_recipe(request.workflow, user_id, request.is_template)
        .await?;

    Ok((StatusCode::CREATED, Json(RecipeResponse::from(&recipe))))
}
