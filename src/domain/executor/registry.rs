//! Executor registry
//!
//! Lookup table from step type tag to executor, built at startup and injected
//! into the engine and the assistant.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::contract::{ConfigField, StepExecutor};
use crate::domain::recipe::DEFAULT_STEP_TYPE;

/// Introspection view of a registered executor
#[derive(Debug, Clone, Serialize)]
pub struct ExecutorInfo {
    pub step_type: String,
    pub description: String,
    pub config_schema: Vec<ConfigField>,
}

/// Registry of step executors keyed by type tag
#[derive(Debug, Default)]
pub struct ExecutorRegistry {
    executors: RwLock<HashMap<String, Arc<dyn StepExecutor>>>,
}

impl ExecutorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor, replacing any with the same tag
    pub async fn register(&self, executor: Arc<dyn StepExecutor>) {
        let step_type = executor.step_type().to_string();
        let mut executors = self.executors.write().await;

        if executors.contains_key(&step_type) {
            warn!(step_type = %step_type, "Replacing registered executor");
        } else {
            info!(step_type = %step_type, "Registering executor");
        }

        executors.insert(step_type, executor);
    }

    /// Get the executor registered for a tag
    pub async fn get(&self, step_type: &str) -> Option<Arc<dyn StepExecutor>> {
        self.executors.read().await.get(step_type).cloned()
    }

    /// All registered executors, ordered by tag
    pub async fn get_all(&self) -> Vec<Arc<dyn StepExecutor>> {
        let executors = self.executors.read().await;
        let mut all: Vec<Arc<dyn StepExecutor>> = executors.values().cloned().collect();
        all.sort_by_key(|e| e.step_type());
        all
    }

    /// The executor for a declared type, falling back to `ai` when the type is
    /// empty or unregistered
    pub async fn resolve(&self, step_type: &str) -> Option<Arc<dyn StepExecutor>> {
        let executors = self.executors.read().await;

        if !step_type.is_empty() {
            if let Some(executor) = executors.get(step_type) {
                return Some(executor.clone());
            }
            debug!(step_type = %step_type, "No executor registered, falling back to ai");
        }

        executors.get(DEFAULT_STEP_TYPE).cloned()
    }

    /// Descriptions of every executor, ordered by tag
    pub async fn describe_all(&self) -> Vec<ExecutorInfo> {
        self.get_all()
            .await
            .iter()
            .map(|e| ExecutorInfo {
                step_type: e.step_type().to_string(),
                description: e.description().to_string(),
                config_schema: e.config_schema(),
            })
            .collect()
    }
}
