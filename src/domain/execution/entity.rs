//! Workflow execution state

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::recipe::{RecipeId, Step, StepId};
use crate::domain::storage::{entity_id, StorageEntity};

entity_id!(
    /// Workflow execution identifier
    ExecutionId
);

entity_id!(
    /// Step execution identifier
    StepExecutionId
);

entity_id!(
    /// Execution input revision identifier
    InputRecordId
);

/// Lifecycle of a workflow execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// No further human action is accepted once terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single step within an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepExecutionStatus {
    Pending,
    Running,
    AwaitingReview,
    Completed,
    Failed,
}

impl StepExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::AwaitingReview => "awaiting_review",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for StepExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs an execution was started with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionInput {
    #[serde(default)]
    pub user_inputs: HashMap<String, Value>,
    /// Ad hoc steps replacing the recipe's own steps for this run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_overrides: Option<Vec<Step>>,
}

impl ExecutionInput {
    pub fn new(user_inputs: HashMap<String, Value>) -> Self {
        Self {
            user_inputs,
            step_overrides: None,
        }
    }

    pub fn with_step_overrides(mut self, steps: Vec<Step>) -> Self {
        self.step_overrides = Some(steps);
        self
    }
}

/// One run of a recipe against concrete inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    id: ExecutionId,
    recipe_id: RecipeId,
    user_id: i64,
    status: ExecutionStatus,
    current_step: u32,
    input: ExecutionInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

impl WorkflowExecution {
    pub fn new(recipe_id: RecipeId, user_id: i64, input: ExecutionInput) -> Self {
        let now = Utc::now();
        Self {
            id: ExecutionId::default(),
            recipe_id,
            user_id,
            status: ExecutionStatus::Pending,
            current_step: 0,
            input,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn with_id(mut self, id: ExecutionId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> ExecutionId {
        self.id
    }

    pub fn recipe_id(&self) -> RecipeId {
        self.recipe_id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn input(&self) -> &ExecutionInput {
        &self.input
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// A step with the given order is now running
    pub fn start_step(&mut self, order: u32) {
        self.status = ExecutionStatus::Running;
        self.current_step = order;
        self.error_message = None;
        self.completed_at = None;
        self.touch();
    }

    pub fn pause(&mut self) {
        self.status = ExecutionStatus::Paused;
        self.touch();
    }

    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.error_message = None;
        self.completed_at = Some(Utc::now());
        self.touch();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ExecutionStatus::Failed;
        self.error_message = Some(error.into());
        self.completed_at = Some(Utc::now());
        self.touch();
    }

    pub fn cancel(&mut self) {
        self.status = ExecutionStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        self.touch();
    }

    /// Moves the cursor back one step, never below zero
    pub fn step_back(&mut self) {
        self.current_step = self.current_step.saturating_sub(1);
        self.touch();
    }

    /// Overlays new values onto the stored user inputs
    pub fn merge_inputs(&mut self, overrides: &HashMap<String, Value>) {
        for (name, value) in overrides {
            self.input.user_inputs.insert(name.clone(), value.clone());
        }
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl StorageEntity for WorkflowExecution {
    type Key = ExecutionId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// Which step definition a step execution runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StepRef {
    /// A step stored on the recipe
    Persisted(StepId),
    /// Index into the execution's step overrides
    Adhoc(usize),
}

/// The record of one step's outcome within an execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    id: StepExecutionId,
    execution_id: ExecutionId,
    step_ref: StepRef,
    step_order: u32,
    status: StepExecutionStatus,
    /// JSON text of `{content, ...metadata}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prompt_used: Option<String>,
    #[serde(default)]
    approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    executed_at: Option<DateTime<Utc>>,
}

impl StepExecution {
    pub fn new(execution_id: ExecutionId, step_ref: StepRef, step_order: u32) -> Self {
        Self {
            id: StepExecutionId::default(),
            execution_id,
            step_ref,
            step_order,
            status: StepExecutionStatus::Pending,
            output: None,
            model_used: None,
            prompt_used: None,
            approved: false,
            error_message: None,
            executed_at: None,
        }
    }

    pub fn with_id(mut self, id: StepExecutionId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> StepExecutionId {
        self.id
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    pub fn step_ref(&self) -> StepRef {
        self.step_ref
    }

    pub fn step_order(&self) -> u32 {
        self.step_order
    }

    pub fn status(&self) -> StepExecutionStatus {
        self.status
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn model_used(&self) -> Option<&str> {
        self.model_used.as_deref()
    }

    pub fn prompt_used(&self) -> Option<&str> {
        self.prompt_used.as_deref()
    }

    pub fn approved(&self) -> bool {
        self.approved
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        self.executed_at
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepExecutionStatus::Completed
    }

    /// The `content` field of the output payload, or the raw payload when it
    /// is not a JSON object carrying one
    pub fn content(&self) -> Option<String> {
        let output = self.output.as_deref()?;
        match serde_json::from_str::<Value>(output) {
            Ok(Value::Object(map)) => match map.get("content") {
                Some(Value::String(text)) => Some(text.clone()),
                Some(other) => Some(other.to_string()),
                None => Some(output.to_string()),
            },
            _ => Some(output.to_string()),
        }
    }

    pub fn start(&mut self) {
        self.status = StepExecutionStatus::Running;
        self.error_message = None;
    }

    /// Executor succeeded; the output waits for a human decision
    pub fn await_review(
        &mut self,
        output: String,
        model_used: Option<String>,
        prompt_used: Option<String>,
    ) {
        self.status = StepExecutionStatus::AwaitingReview;
        self.output = Some(output);
        self.model_used = model_used;
        self.prompt_used = prompt_used;
        self.error_message = None;
        self.executed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>, prompt_used: Option<String>) {
        self.status = StepExecutionStatus::Failed;
        self.error_message = Some(error.into());
        if prompt_used.is_some() {
            self.prompt_used = prompt_used;
        }
        self.executed_at = Some(Utc::now());
    }

    pub fn approve(&mut self) {
        self.status = StepExecutionStatus::Completed;
        self.approved = true;
    }

    /// Sends the step back for another run
    pub fn reject(&mut self) {
        self.status = StepExecutionStatus::Pending;
        self.approved = false;
    }
}

impl StorageEntity for StepExecution {
    type Key = StepExecutionId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// Input overrides supplied on a retry, kept as an audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionInputRecord {
    id: InputRecordId,
    execution_id: ExecutionId,
    inputs: HashMap<String, Value>,
    created_at: DateTime<Utc>,
}

impl ExecutionInputRecord {
    pub fn new(execution_id: ExecutionId, inputs: HashMap<String, Value>) -> Self {
        Self {
            id: InputRecordId::default(),
            execution_id,
            inputs,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: InputRecordId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> InputRecordId {
        self.id
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    pub fn inputs(&self) -> &HashMap<String, Value> {
        &self.inputs
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl StorageEntity for ExecutionInputRecord {
    type Key = InputRecordId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step_execution() -> StepExecution {
        StepExecution::new(ExecutionId::new(1), StepRef::Persisted(StepId::new(4)), 1)
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(!ExecutionStatus::Paused.is_terminal());
    }

    #[test]
    fn test_step_back_floors_at_zero() {
        let mut execution =
            WorkflowExecution::new(RecipeId::new(1), 1, ExecutionInput::default());
        execution.start_step(1);
        execution.step_back();
        execution.step_back();

        assert_eq!(execution.current_step(), 0);
    }

    #[test]
    fn test_merge_inputs_overrides_existing() {
        let mut inputs = HashMap::new();
        inputs.insert("topic".to_string(), json!("cats"));
        let mut execution =
            WorkflowExecution::new(RecipeId::new(1), 1, ExecutionInput::new(inputs));

        let mut overrides = HashMap::new();
        overrides.insert("topic".to_string(), json!("dogs"));
        overrides.insert("tone".to_string(), json!("playful"));
        execution.merge_inputs(&overrides);

        assert_eq!(execution.input().user_inputs["topic"], json!("dogs"));
        assert_eq!(execution.input().user_inputs.len(), 2);
    }

    #[test]
    fn test_step_ref_serialization() {
        let persisted = serde_json::to_value(StepRef::Persisted(StepId::new(9))).unwrap();
        assert_eq!(persisted, json!({"kind": "persisted", "value": 9}));

        let adhoc = serde_json::to_value(StepRef::Adhoc(0)).unwrap();
        assert_eq!(adhoc, json!({"kind": "adhoc", "value": 0}));
    }

    #[test]
    fn test_content_reads_payload_field() {
        let mut step = step_execution();
        step.await_review(
            json!({"content": "A summary", "model": "gpt-4o"}).to_string(),
            Some("gpt-4o".to_string()),
            None,
        );

        assert_eq!(step.status(), StepExecutionStatus::AwaitingReview);
        assert_eq!(step.content().as_deref(), Some("A summary"));
    }

    #[test]
    fn test_content_falls_back_to_raw_output() {
        let mut step = step_execution();
        step.await_review("plain text".to_string(), None, None);

        assert_eq!(step.content().as_deref(), Some("plain text"));
    }

    #[test]
    fn test_approve_and_reject() {
        let mut step = step_execution();
        step.await_review("{}".to_string(), None, None);
        step.approve();
        assert!(step.is_completed());
        assert!(step.approved());

        step.reject();
        assert_eq!(step.status(), StepExecutionStatus::Pending);
        assert!(!step.approved());
    }

    #[test]
    fn test_fail_keeps_previous_prompt_when_none_given() {
        let mut step = step_execution();
        step.await_review("{}".to_string(), None, Some("first prompt".to_string()));
        step.fail("provider down", None);

        assert_eq!(step.status(), StepExecutionStatus::Failed);
        assert_eq!(step.prompt_used(), Some("first prompt"));
        assert_eq!(step.error_message(), Some("provider down"));
    }
}
