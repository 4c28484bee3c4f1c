//! Application state shared by the handlers

use std::sync::Arc;

use crate::domain::executor::ExecutorRegistry;
use crate::domain::recipe::RecipeRepository;
use crate::infrastructure::services::WorkflowAssistant;
use crate::infrastructure::workflow::WorkflowEngine;

/// Services the HTTP surface drives
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
    pub assistant: Arc<WorkflowAssistant>,
    pub registry: Arc<ExecutorRegistry>,
    /// Probed by the readiness check
    pub recipes: Arc<dyn RecipeRepository>,
}

impl AppState {
    pub fn new(
        engine: Arc<WorkflowEngine>,
        assistant: Arc<WorkflowAssistant>,
        recipes: Arc<dyn RecipeRepository>,
    ) -> Self {
        Self {
            registry: engine.registry().clone(),
            engine,
            assistant,
            recipes,
        }
    }
}
