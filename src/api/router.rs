use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::health;
use super::state::AppState;
use super::workflow;

/// Create the full router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .nest("/api", workflow::create_workflow_router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::ai::MockAiClient;
    use crate::domain::execution::{
        ExecutionInputRecord, StepExecution, WorkflowExecution,
    };
    use crate::domain::executor::{ExecutorOutcome, ExecutorRegistry, MockExecutor};
    use crate::domain::prompt::PromptCompiler;
    use crate::domain::recipe::{Recipe, RecipeRepository, Step};
    use crate::infrastructure::execution::{
        StorageExecutionInputRepository, StorageExecutionRepository,
        StorageStepExecutionRepository,
    };
    use crate::infrastructure::recipe::StorageRecipeRepository;
    use crate::infrastructure::services::{AssistantSettings, WorkflowAssistant};
    use crate::infrastructure::storage::InMemoryStorage;
    use crate::infrastructure::workflow::{EngineConfig, EngineRepositories, WorkflowEngine};

    async fn app() -> Router {
        let recipes = Arc::new(StorageRecipeRepository::new(Arc::new(
            InMemoryStorage::<Recipe>::new(),
        )));
        recipes
            .create(Recipe::new(1, "Cats").with_steps(vec![
                Step::ai(1, "Summarize", "Summarize {{topic}}"),
                Step::ai(2, "Expand", "Expand: {{step_1_output}}"),
            ]))
            .await
            .unwrap();

        let registry = Arc::new(ExecutorRegistry::new());
        registry
            .register(Arc::new(MockExecutor::new("ai", ExecutorOutcome::ok("draft"))))
            .await;

        let engine = Arc::new(WorkflowEngine::new(
            EngineRepositories {
                recipes: recipes.clone(),
                executions: Arc::new(StorageExecutionRepository::new(Arc::new(
                    InMemoryStorage::<WorkflowExecution>::new(),
                ))),
                step_executions: Arc::new(StorageStepExecutionRepository::new(Arc::new(
                    InMemoryStorage::<StepExecution>::new(),
                ))),
                input_records: Arc::new(StorageExecutionInputRepository::new(Arc::new(
                    InMemoryStorage::<ExecutionInputRecord>::new(),
                ))),
            },
            registry.clone(),
            PromptCompiler::default(),
            EngineConfig::default(),
        ));
        let assistant = Arc::new(WorkflowAssistant::new(
            Arc::new(MockAiClient::new()),
            recipes.clone(),
            registry,
            AssistantSettings::default(),
        ));

        create_router(AppState::new(engine, assistant, recipes))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let app = app().await;

        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_execution_review_flow() {
        let app = app().await;

        let (status, started) = send(
            &app,
            "POST",
            "/api/executions",
            Some(json!({"recipe_id": 1, "inputs": {"topic": "cats"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(started["status"], "paused");
        assert_eq!(started["steps"][0]["status"], "awaiting_review");

        let execution_id = started["execution_id"].as_i64().unwrap();
        let step_id = started["steps"][0]["id"].as_i64().unwrap();

        let (status, approved) = send(
            &app,
            "POST",
            &format!("/api/executions/{}/steps/{}/approve", execution_id, step_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["current_step"], 2);

        let (status, cancelled) = send(
            &app,
            "POST",
            &format!("/api/executions/{}/cancel", execution_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cancelled["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_missing_input_is_unprocessable() {
        let app = app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/executions",
            Some(json!({"recipe_id": 1})),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["execution_id"], 0);
        assert!(body["error"].as_str().unwrap().contains("topic"));
    }

    #[tokio::test]
    async fn test_unknown_execution_is_not_found() {
        let app = app().await;

        let (status, body) = send(&app, "GET", "/api/executions/77", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_bad_user_header() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/executions")
                    .header("content-type", "application/json")
                    .header("x-user-id", "nobody")
                    .body(Body::from(r#"{"recipe_id": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_executors() {
        let app = app().await;

        let (status, body) = send(&app, "GET", "/api/executors", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["executors"][0]["step_type"], "ai");
    }

    #[tokio::test]
    async fn test_assistant_save_and_validation() {
        let app = app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/assistant/save",
            Some(json!({
                "workflow": {
                    "name": "Posts",
                    "steps": [{"order": 1, "name": "Write", "prompt_template": "Write about {{topic}}"}],
                    "required_inputs": [{"name": "topic"}]
                },
                "is_template": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["is_template"], true);
        assert_eq!(body["steps"][0]["input_config"][0]["name"], "topic");

        let (status, body) = send(
            &app,
            "POST",
            "/api/assistant/generate",
            Some(json!({"messages": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }
}
