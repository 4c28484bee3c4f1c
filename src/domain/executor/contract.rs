//! The contract every step executor implements

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::cancel::CancellationSignal;
use crate::domain::execution::{ExecutionId, StepExecution};
use crate::domain::recipe::Step;
use crate::domain::workflow::WorkflowError;

/// Result of checking a step's configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// One advisory configuration field of an executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: bool,
    pub description: String,
}

impl ConfigField {
    pub fn required(name: &str, field_type: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, field_type: &str, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, field_type, description)
        }
    }
}

/// What an executor produced for one step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorOutcome {
    pub success: bool,
    pub content: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_variables: Vec<String>,
}

impl ExecutorOutcome {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Converts an error into a failed outcome, keeping unresolved names
    pub fn from_error(error: WorkflowError) -> Self {
        let unresolved = error.unresolved_names().map(<[String]>::to_vec);
        let mut outcome = Self::failed(error.to_string());
        if let Some(names) = unresolved {
            outcome.unresolved_variables = names;
        }
        outcome
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt_used = Some(prompt.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_used = Some(model.into());
        self
    }

    /// The stored step payload: `{content, ...metadata}` as JSON text
    pub fn payload(&self) -> String {
        let mut payload = self.metadata.clone();
        payload.insert("content".to_string(), Value::String(self.content.clone()));
        Value::Object(payload).to_string()
    }
}

/// Everything an executor may read while running a step
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub user_id: i64,
    pub execution_id: ExecutionId,
    pub step_execution: StepExecution,
    pub user_inputs: HashMap<String, Value>,
    /// All step executions of the run; completed ones carry cross-step data
    pub step_executions: Vec<StepExecution>,
    /// Replaces prompt compilation when set (retry with an edited prompt)
    pub prompt_override: Option<String>,
    pub cancellation: CancellationSignal,
}

impl ExecutionContext {
    /// Content of completed steps keyed by order, in order
    pub fn completed_outputs(&self) -> Vec<(u32, String)> {
        let mut outputs: Vec<(u32, String)> = self
            .step_executions
            .iter()
            .filter(|s| s.is_completed())
            .filter_map(|s| s.content().map(|c| (s.step_order(), c)))
            .collect();
        outputs.sort_by_key(|(order, _)| *order);
        outputs
    }
}

/// A pluggable unit that runs one step type
#[async_trait]
pub trait StepExecutor: Send + Sync + Debug {
    /// Stable type tag, e.g. `ai`
    fn step_type(&self) -> &'static str;

    /// One line describing what the executor does
    fn description(&self) -> &'static str;

    fn validate_config(&self, step: &Step) -> ValidationReport;

    /// Runs the step; failures are reported in the outcome, never raised
    async fn execute(&self, step: &Step, context: &ExecutionContext) -> ExecutorOutcome;

    /// Advisory list of configuration fields
    fn config_schema(&self) -> Vec<ConfigField>;
}
