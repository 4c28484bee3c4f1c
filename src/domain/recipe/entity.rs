//! Recipe and step definitions

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::storage::{entity_id, StorageEntity};
use crate::domain::DomainError;

entity_id!(
    /// Recipe identifier
    RecipeId
);

entity_id!(
    /// Step identifier, unique across all recipes
    StepId
);

/// Step type tag used when a step does not declare one
pub const DEFAULT_STEP_TYPE: &str = "ai";

/// Step types with a built-in executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Ai,
    Scraping,
    Script,
    Http,
    Transform,
}

impl StepType {
    pub const ALL: [StepType; 5] = [
        StepType::Ai,
        StepType::Scraping,
        StepType::Script,
        StepType::Http,
        StepType::Transform,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Ai => "ai",
            StepType::Scraping => "scraping",
            StepType::Script => "script",
            StepType::Http => "http",
            StepType::Transform => "transform",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling options forwarded to the AI model of an `ai` step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Input type for variables holding a list of URLs
pub const URL_LIST_INPUT_TYPE: &str = "url_list";

/// A value the user must (or may) provide before running a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputVariable {
    pub name: String,
    #[serde(rename = "type", default = "default_input_type")]
    pub input_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

fn default_input_type() -> String {
    "text".to_string()
}

impl InputVariable {
    pub fn new(name: impl Into<String>, input_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_type: input_type.into(),
            label: None,
            description: None,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_url_list(&self) -> bool {
        self.input_type == URL_LIST_INPUT_TYPE
    }
}

/// One stage of a recipe
///
/// Steps are immutable once stored; a recipe is edited by replacing its steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    id: StepId,
    order: u32,
    name: String,
    #[serde(default = "default_step_type")]
    step_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ai_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prompt_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_config: Option<ModelConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    executor_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_config: Option<Vec<InputVariable>>,
}

fn default_step_type() -> String {
    DEFAULT_STEP_TYPE.to_string()
}

impl Step {
    pub fn new(order: u32, name: impl Into<String>, step_type: impl Into<String>) -> Self {
        Self {
            id: StepId::default(),
            order,
            name: name.into(),
            step_type: step_type.into(),
            ai_model: None,
            prompt_template: None,
            output_format: None,
            model_config: None,
            api_config: None,
            executor_config: None,
            input_config: None,
        }
    }

    /// Convenience constructor for an `ai` step
    pub fn ai(order: u32, name: impl Into<String>, prompt_template: impl Into<String>) -> Self {
        Self::new(order, name, StepType::Ai.as_str()).with_prompt_template(prompt_template)
    }

    pub fn with_id(mut self, id: StepId) -> Self {
        self.id = id;
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_step_type(mut self, step_type: impl Into<String>) -> Self {
        self.step_type = step_type.into();
        self
    }

    pub fn with_ai_model(mut self, model: impl Into<String>) -> Self {
        self.ai_model = Some(model.into());
        self
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn with_model_config(mut self, config: ModelConfig) -> Self {
        self.model_config = Some(config);
        self
    }

    pub fn with_api_config(mut self, config: Value) -> Self {
        self.api_config = Some(config);
        self
    }

    pub fn with_executor_config(mut self, config: Value) -> Self {
        self.executor_config = Some(config);
        self
    }

    pub fn with_input_config(mut self, inputs: Vec<InputVariable>) -> Self {
        self.input_config = Some(inputs);
        self
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type tag; may name a type with no registered executor
    pub fn step_type(&self) -> &str {
        &self.step_type
    }

    pub fn ai_model(&self) -> Option<&str> {
        self.ai_model.as_deref()
    }

    pub fn prompt_template(&self) -> Option<&str> {
        self.prompt_template.as_deref()
    }

    pub fn output_format(&self) -> Option<&str> {
        self.output_format.as_deref()
    }

    pub fn model_config(&self) -> Option<&ModelConfig> {
        self.model_config.as_ref()
    }

    pub fn api_config(&self) -> Option<&Value> {
        self.api_config.as_ref()
    }

    pub fn executor_config(&self) -> Option<&Value> {
        self.executor_config.as_ref()
    }

    pub fn input_config(&self) -> &[InputVariable] {
        self.input_config.as_deref().unwrap_or_default()
    }

    /// Names of inputs this step declares as required
    pub fn required_inputs(&self) -> impl Iterator<Item = &str> {
        self.input_config()
            .iter()
            .filter(|v| v.required)
            .map(|v| v.name.as_str())
    }
}

/// A named, ordered pipeline of steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    id: RecipeId,
    user_id: i64,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    steps: Vec<Step>,
    #[serde(default)]
    is_template: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn new(user_id: i64, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecipeId::default(),
            user_id,
            name: name.into(),
            description: None,
            steps: Vec::new(),
            is_template: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: RecipeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self.steps.sort_by_key(|s| s.order);
        self
    }

    pub fn as_template(mut self, is_template: bool) -> Self {
        self.is_template = is_template;
        self
    }

    pub fn id(&self) -> RecipeId {
        self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Steps ordered by their `order`
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_template(&self) -> bool {
        self.is_template
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn step_by_id(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_by_order(&self, order: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.order == order)
    }

    /// Assigns ids to steps that have none, drawing from `next_id`
    pub(crate) fn assign_step_ids(&mut self, mut next_id: impl FnMut() -> StepId) {
        for step in self.steps.iter_mut().filter(|s| s.id == StepId::default()) {
            step.id = next_id();
        }
    }

    /// Checks that step orders run 1..=n without gaps or duplicates
    pub fn validate_step_orders(&self) -> Result<(), DomainError> {
        for (index, step) in self.steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.order != expected {
                return Err(DomainError::validation(format!(
                    "Recipe '{}' has step order {} where {} was expected",
                    self.name, step.order, expected
                )));
            }
        }
        Ok(())
    }
}

impl StorageEntity for Recipe {
    type Key = RecipeId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}
