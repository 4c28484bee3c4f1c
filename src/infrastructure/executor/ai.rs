//! AI step executor

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use super::template::TemplateRenderer;
use crate::domain::ai::{AiCallConfig, AiClient};
use crate::domain::executor::{
    ConfigField, ExecutionContext, ExecutorOutcome, StepExecutor, ValidationReport,
};
use crate::domain::recipe::Step;
use crate::domain::workflow::WorkflowError;

const MAX_TEMPERATURE: f32 = 2.0;

/// Compiles the step prompt and sends it to the configured AI model
#[derive(Debug)]
pub struct AiExecutor {
    client: Arc<dyn AiClient>,
    renderer: Arc<TemplateRenderer>,
    default_model: String,
}

impl AiExecutor {
    pub fn new(
        client: Arc<dyn AiClient>,
        renderer: Arc<TemplateRenderer>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            renderer,
            default_model: default_model.into(),
        }
    }

    fn call_config(step: &Step) -> AiCallConfig {
        let mut config = AiCallConfig::new();

        if let Some(model_config) = step.model_config() {
            if let Some(temperature) = model_config.temperature {
                config = config.with_temperature(temperature);
            }
            if let Some(max_tokens) = model_config.max_tokens {
                config = config.with_max_tokens(max_tokens);
            }
            if let Some(system_prompt) = model_config.system_prompt.as_deref() {
                config = config.with_system_prompt(system_prompt);
            }
        }

        config
    }
}

#[async_trait]
impl StepExecutor for AiExecutor {
    fn step_type(&self) -> &'static str {
        "ai"
    }

    fn description(&self) -> &'static str {
        "Sends a compiled prompt to an AI model and returns its reply"
    }

    fn validate_config(&self, step: &Step) -> ValidationReport {
        let mut errors = Vec::new();

        if step
            .prompt_template()
            .is_none_or(|template| template.trim().is_empty())
        {
            errors.push("prompt_template is required".to_string());
        }

        if let Some(temperature) = step.model_config().and_then(|c| c.temperature) {
            if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
                errors.push(format!(
                    "temperature must be between 0 and {}",
                    MAX_TEMPERATURE
                ));
            }
        }

        ValidationReport::from_errors(errors)
    }

    async fn execute(&self, step: &Step, context: &ExecutionContext) -> ExecutorOutcome {
        let model = step.ai_model().unwrap_or(&self.default_model).to_string();
        let mut config = Self::call_config(step);

        let prompt = match context.prompt_override.as_deref() {
            Some(prompt) => prompt.to_string(),
            None => {
                let template = step.prompt_template().unwrap_or_default();
                let compiled = match self.renderer.render(template, context).await {
                    Ok(compiled) => compiled,
                    Err(e) => return ExecutorOutcome::from_error(e).with_model(model),
                };

                if !compiled.is_fully_resolved() {
                    debug!(
                        step = %step.name(),
                        unresolved = ?compiled.unresolved,
                        "Prompt has unresolved variables"
                    );
                    return ExecutorOutcome::from_error(WorkflowError::unresolved(
                        compiled.unresolved,
                    ))
                    .with_prompt(compiled.text)
                    .with_model(model);
                }

                config = config.with_images(compiled.images);
                compiled.text
            }
        };

        debug!(step = %step.name(), model = %model, "Calling AI model");
        let result = self.client.call_ai_by_model(&model, &prompt, config).await;

        if !result.success {
            let message = result
                .error
                .unwrap_or_else(|| "AI call returned no content".to_string());
            warn!(step = %step.name(), model = %model, error = %message, "AI call failed");
            return ExecutorOutcome::from_error(WorkflowError::executor("ai", message))
                .with_prompt(prompt)
                .with_model(model);
        }

        let used_model = if result.model.is_empty() {
            model
        } else {
            result.model
        };

        let mut outcome = ExecutorOutcome::ok(result.content)
            .with_metadata("model", json!(used_model))
            .with_prompt(prompt)
            .with_model(used_model);

        if let Some(usage) = result.usage {
            outcome = outcome.with_metadata("usage", json!(usage));
        }
        if !result.generated_images.is_empty() {
            outcome = outcome.with_metadata("generated_images", json!(result.generated_images));
        }
        if let Some(format) = step.output_format() {
            outcome = outcome.with_metadata("output_format", json!(format));
        }

        outcome
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::required("prompt_template", "string", "Prompt with {{variable}} references"),
            ConfigField::optional("ai_model", "string", "Model name; defaults to the configured model"),
            ConfigField::optional("output_format", "string", "Expected output format, e.g. markdown or json"),
            ConfigField::optional(
                "model_config",
                "object",
                "temperature, max_tokens and system_prompt passed to the model",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::super::template::test_support::{context, renderer_with};
    use super::*;
    use crate::domain::ai::MockAiClient;
    use crate::domain::recipe::ModelConfig;
    use crate::domain::standard::{CompanyStandard, StandardKind};

    fn executor(client: Arc<MockAiClient>, standards: Vec<CompanyStandard>) -> AiExecutor {
        AiExecutor::new(client, renderer_with(standards), "default-model")
    }

    #[test]
    fn test_validate_requires_prompt() {
        let executor = executor(Arc::new(MockAiClient::new()), vec![]);

        let report = executor.validate_config(&Step::new(1, "Empty", "ai"));
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["prompt_template is required"]);

        let report = executor.validate_config(&Step::ai(1, "Ok", "Write {{topic}}"));
        assert!(report.valid);
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let executor = executor(Arc::new(MockAiClient::new()), vec![]);
        let step = Step::ai(1, "Hot", "x").with_model_config(ModelConfig {
            temperature: Some(3.5),
            ..Default::default()
        });

        assert!(!executor.validate_config(&step).valid);
    }

    #[tokio::test]
    async fn test_execute_compiles_prompt_and_records_metadata() {
        let client = Arc::new(MockAiClient::new().with_reply("A short summary"));
        let executor = executor(client.clone(), vec![]);
        let step = Step::ai(1, "Summarize", "Summarize {{topic}}")
            .with_output_format("markdown")
            .with_model_config(ModelConfig {
                temperature: Some(0.2),
                max_tokens: Some(200),
                system_prompt: Some("Be brief".to_string()),
            });

        let outcome = executor
            .execute(&step, &context(&[("topic", json!("cats"))], &[]))
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.content, "A short summary");
        assert_eq!(outcome.prompt_used.as_deref(), Some("Summarize cats"));
        assert_eq!(outcome.model_used.as_deref(), Some("default-model"));
        assert_eq!(outcome.metadata["output_format"], "markdown");

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "default-model");
        assert_eq!(calls[0].system_prompt.as_deref(), Some("Be brief"));
    }

    #[tokio::test]
    async fn test_execute_uses_step_model_and_standards() {
        let client = Arc::new(MockAiClient::new());
        let executor = executor(
            client.clone(),
            vec![CompanyStandard::new(
                1,
                "House voice",
                StandardKind::Voice,
                json!({"tone": "warm"}),
            )],
        );
        let step = Step::ai(1, "Write", "{{brand_voice}}\nWrite it").with_ai_model("gpt-4o");

        let outcome = executor.execute(&step, &context(&[], &[])).await;

        assert!(outcome.success);
        assert_eq!(outcome.model_used.as_deref(), Some("gpt-4o"));
        assert!(client.calls()[0].prompt.contains("- Tone: warm"));
        assert_eq!(outcome.metadata["usage"]["total_tokens"], 15);
    }

    #[tokio::test]
    async fn test_unresolved_variables_fail_without_calling_model() {
        let client = Arc::new(MockAiClient::new());
        let executor = executor(client.clone(), vec![]);
        let step = Step::ai(1, "Summarize", "Summarize {{topic}}");

        let outcome = executor.execute(&step, &context(&[], &[])).await;

        assert!(!outcome.success);
        assert_eq!(outcome.unresolved_variables, vec!["topic"]);
        assert!(outcome.error.unwrap().contains("topic"));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_override_skips_compilation() {
        let client = Arc::new(MockAiClient::new());
        let executor = executor(client.clone(), vec![]);
        let step = Step::ai(1, "Summarize", "Summarize {{topic}}");
        let mut ctx = context(&[], &[]);
        ctx.prompt_override = Some("Summarize dogs instead".to_string());

        let outcome = executor.execute(&step, &ctx).await;

        assert!(outcome.success);
        assert_eq!(outcome.content, "echo: Summarize dogs instead");
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported() {
        let client = Arc::new(MockAiClient::new().with_failure("rate limited"));
        let executor = executor(client, vec![]);

        let outcome = executor
            .execute(&Step::ai(1, "Plain", "Hello"), &context(&[], &[]))
            .await;

        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("ai executor failed: rate limited")
        );
        assert_eq!(outcome.prompt_used.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_images_are_attached() {
        let client = Arc::new(MockAiClient::new());
        let executor = executor(client.clone(), vec![]);
        let step = Step::ai(1, "Describe", "Describe {{photo}}");
        let image = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

        let outcome = executor
            .execute(&step, &context(&[("photo", json!(image))], &[]))
            .await;

        assert!(outcome.success);
        let call = &client.calls()[0];
        assert_eq!(call.image_count, 1);
        assert_eq!(call.prompt, "Describe [Image: photo]");
    }
}
