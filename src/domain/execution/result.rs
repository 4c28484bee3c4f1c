//! Execution result projection returned by every engine operation

use serde::{Deserialize, Serialize};

use super::entity::{
    ExecutionId, ExecutionStatus, StepExecution, StepExecutionId, StepExecutionStatus,
    WorkflowExecution,
};

/// Name shown for a step execution whose definition can no longer be found
pub const UNKNOWN_STEP_NAME: &str = "Unknown";

/// Per-step view of an execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub id: StepExecutionId,
    pub step_order: u32,
    pub step_name: String,
    pub status: StepExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_used: Option<String>,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepSummary {
    pub fn from_step_execution(step: &StepExecution, step_name: Option<&str>) -> Self {
        Self {
            id: step.id(),
            step_order: step.step_order(),
            step_name: step_name.unwrap_or(UNKNOWN_STEP_NAME).to_string(),
            status: step.status(),
            content: step.content(),
            model_used: step.model_used().map(str::to_string),
            prompt_used: step.prompt_used().map(str::to_string),
            approved: step.approved(),
            error: step.error_message().map(str::to_string),
        }
    }
}

/// Outcome of an engine operation
///
/// Engine operations never return an error; failures are carried in `error`
/// with `success = false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub execution_id: ExecutionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
    pub current_step: u32,
    pub steps: Vec<StepSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unresolved_variables: Option<Vec<String>>,
}

impl ExecutionResult {
    /// Projects the current state of an execution
    pub fn from_execution(execution: &WorkflowExecution, steps: Vec<StepSummary>) -> Self {
        let status = execution.status();
        Self {
            success: status != ExecutionStatus::Failed,
            execution_id: execution.id(),
            status: Some(status),
            current_step: execution.current_step(),
            steps,
            error: execution.error_message().map(str::to_string),
            unresolved_variables: None,
        }
    }

    /// A failure with no execution state to report
    pub fn failure(execution_id: ExecutionId, error: impl Into<String>) -> Self {
        Self {
            success: false,
            execution_id,
            status: None,
            current_step: 0,
            steps: Vec::new(),
            error: Some(error.into()),
            unresolved_variables: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    pub fn with_unresolved(mut self, names: Vec<String>) -> Self {
        if !names.is_empty() {
            self.unresolved_variables = Some(names);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::{ExecutionInput, StepRef};
    use crate::domain::recipe::{RecipeId, StepId};

    #[test]
    fn test_failure_result() {
        let result = ExecutionResult::failure(ExecutionId::default(), "Missing required inputs: topic");

        assert!(!result.success);
        assert_eq!(result.execution_id.to_string(), "0");
        assert!(result.status.is_none());
        assert!(result.error.unwrap().contains("topic"));
    }

    #[test]
    fn test_success_tracks_failed_status() {
        let mut execution = WorkflowExecution::new(RecipeId::new(1), 1, ExecutionInput::default())
            .with_id(ExecutionId::new(5));
        execution.pause();
        assert!(ExecutionResult::from_execution(&execution, vec![]).success);

        execution.fail("step definition missing");
        let result = ExecutionResult::from_execution(&execution, vec![]);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("step definition missing"));
    }

    #[test]
    fn test_summary_uses_unknown_name() {
        let step = StepExecution::new(ExecutionId::new(1), StepRef::Persisted(StepId::new(2)), 1);
        let summary = StepSummary::from_step_execution(&step, None);

        assert_eq!(summary.step_name, UNKNOWN_STEP_NAME);
        assert_eq!(summary.status, StepExecutionStatus::Pending);
        assert!(summary.content.is_none());
    }

    #[test]
    fn test_with_unresolved_ignores_empty() {
        let result = ExecutionResult::failure(ExecutionId::new(1), "x").with_unresolved(vec![]);
        assert!(result.unresolved_variables.is_none());
    }
}
