//! Transform step executor

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::template::TemplateRenderer;
use crate::domain::executor::{
    ConfigField, ExecutionContext, ExecutorOutcome, StepExecutor, ValidationReport,
};
use crate::domain::prompt::{get_nested_field, value_to_text};
use crate::domain::recipe::Step;
use crate::domain::workflow::WorkflowError;

const DEFAULT_SEPARATOR: &str = "\n\n";

/// Text case and whitespace operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMode {
    Uppercase,
    Lowercase,
    Trim,
}

/// A transform operation with its own parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
enum TransformOperation {
    Template {
        template: String,
    },
    JsonPath {
        path: String,
    },
    RegexExtract {
        pattern: String,
        #[serde(default = "default_group")]
        group: usize,
    },
    Text {
        mode: TextMode,
    },
    Join {
        #[serde(default)]
        separator: Option<String>,
        #[serde(default)]
        steps: Option<Vec<u32>>,
    },
}

fn default_group() -> usize {
    1
}

impl TransformOperation {
    fn name(&self) -> &'static str {
        match self {
            Self::Template { .. } => "template",
            Self::JsonPath { .. } => "json_path",
            Self::RegexExtract { .. } => "regex_extract",
            Self::Text { .. } => "text",
            Self::Join { .. } => "join",
        }
    }
}

/// `executor_config` of a transform step
#[derive(Debug, Clone, Deserialize)]
struct TransformConfig {
    #[serde(flatten)]
    operation: TransformOperation,
    #[serde(default)]
    source_step: Option<u32>,
}

impl TransformConfig {
    fn parse(step: &Step) -> Result<Self, WorkflowError> {
        let raw = step
            .executor_config()
            .ok_or_else(|| WorkflowError::validation("executor_config is required"))?;

        serde_json::from_value(raw.clone())
            .map_err(|e| WorkflowError::validation(format!("Invalid executor_config: {}", e)))
    }
}

/// Reshapes earlier step outputs without calling external services
#[derive(Debug)]
pub struct TransformExecutor {
    renderer: Arc<TemplateRenderer>,
}

impl TransformExecutor {
    pub fn new(renderer: Arc<TemplateRenderer>) -> Self {
        Self { renderer }
    }

    /// Content of the chosen source step, or of the latest completed step
    fn source(config: &TransformConfig, context: &ExecutionContext) -> Result<String, WorkflowError> {
        let outputs = context.completed_outputs();

        match config.source_step {
            Some(order) => outputs
                .into_iter()
                .find(|(o, _)| *o == order)
                .map(|(_, content)| content)
                .ok_or_else(|| {
                    WorkflowError::validation(format!("Step {} has no completed output", order))
                }),
            None => outputs
                .into_iter()
                .next_back()
                .map(|(_, content)| content)
                .ok_or_else(|| WorkflowError::validation("No completed step output to transform")),
        }
    }

    async fn apply(
        &self,
        config: &TransformConfig,
        context: &ExecutionContext,
    ) -> Result<String, WorkflowError> {
        match &config.operation {
            TransformOperation::Template { template } => {
                let compiled = self.renderer.render(template, context).await?;
                if !compiled.is_fully_resolved() {
                    return Err(WorkflowError::unresolved(compiled.unresolved));
                }
                Ok(compiled.text)
            }
            TransformOperation::JsonPath { path } => {
                let source = Self::source(config, context)?;
                let document: Value = serde_json::from_str(&source).map_err(|e| {
                    WorkflowError::executor("transform", format!("Source is not JSON: {}", e))
                })?;
                let found = get_nested_field(&document, path).ok_or_else(|| {
                    WorkflowError::executor("transform", format!("Path '{}' not found", path))
                })?;

                Ok(match found {
                    Value::Object(_) | Value::Array(_) => {
                        serde_json::to_string_pretty(found).unwrap_or_else(|_| found.to_string())
                    }
                    other => value_to_text(other),
                })
            }
            TransformOperation::RegexExtract { pattern, group } => {
                let source = Self::source(config, context)?;
                let regex = Regex::new(pattern).map_err(|e| {
                    WorkflowError::validation(format!("Invalid pattern: {}", e))
                })?;

                regex
                    .captures(&source)
                    .and_then(|caps| caps.get(*group))
                    .map(|m| m.as_str().to_string())
                    .ok_or_else(|| WorkflowError::executor("transform", "Pattern did not match"))
            }
            TransformOperation::Text { mode } => {
                let source = Self::source(config, context)?;
                Ok(match mode {
                    TextMode::Uppercase => source.to_uppercase(),
                    TextMode::Lowercase => source.to_lowercase(),
                    TextMode::Trim => source.trim().to_string(),
                })
            }
            TransformOperation::Join { separator, steps } => {
                let parts: Vec<String> = context
                    .completed_outputs()
                    .into_iter()
                    .filter(|(order, _)| steps.as_ref().is_none_or(|s| s.contains(order)))
                    .map(|(_, content)| content)
                    .collect();

                if parts.is_empty() {
                    return Err(WorkflowError::validation("No completed step outputs to join"));
                }

                Ok(parts.join(separator.as_deref().unwrap_or(DEFAULT_SEPARATOR)))
            }
        }
    }
}

#[async_trait]
impl StepExecutor for TransformExecutor {
    fn step_type(&self) -> &'static str {
        "transform"
    }

    fn description(&self) -> &'static str {
        "Reshapes earlier outputs: template, json_path, regex_extract, text or join"
    }

    fn validate_config(&self, step: &Step) -> ValidationReport {
        let config = match TransformConfig::parse(step) {
            Ok(config) => config,
            Err(e) => return ValidationReport::from_errors(vec![e.to_string()]),
        };

        let mut errors = Vec::new();
        match &config.operation {
            TransformOperation::RegexExtract { pattern, .. } => {
                if let Err(e) = Regex::new(pattern) {
                    errors.push(format!("Invalid pattern: {}", e));
                }
            }
            TransformOperation::Template { template } if template.trim().is_empty() => {
                errors.push("executor_config.template is required".to_string());
            }
            _ => {}
        }
        if let Some(order) = config.source_step {
            if order >= step.order() {
                errors.push("source_step must refer to an earlier step".to_string());
            }
        }

        ValidationReport::from_errors(errors)
    }

    async fn execute(&self, step: &Step, context: &ExecutionContext) -> ExecutorOutcome {
        let config = match TransformConfig::parse(step) {
            Ok(config) => config,
            Err(e) => return ExecutorOutcome::from_error(e),
        };
        let operation = config.operation.name();
        let tool = format!("transform:{}", operation);

        debug!(step = %step.name(), operation, "Applying transform");
        match self.apply(&config, context).await {
            Ok(content) => ExecutorOutcome::ok(content)
                .with_metadata("operation", json!(operation))
                .with_model(tool),
            Err(e) => ExecutorOutcome::from_error(e).with_model(tool),
        }
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::required(
                "executor_config.operation",
                "string",
                "template, json_path, regex_extract, text or join",
            ),
            ConfigField::optional("executor_config.source_step", "integer", "Step order to read; defaults to the latest completed step"),
            ConfigField::optional("executor_config.template", "string", "Template for the template operation"),
            ConfigField::optional("executor_config.path", "string", "Dotted path for json_path"),
            ConfigField::optional("executor_config.pattern", "string", "Regex for regex_extract"),
            ConfigField::optional("executor_config.group", "integer", "Capture group for regex_extract (default 1)"),
            ConfigField::optional("executor_config.mode", "string", "uppercase, lowercase or trim for text"),
            ConfigField::optional("executor_config.separator", "string", "Separator for join"),
        ]
    }
}
