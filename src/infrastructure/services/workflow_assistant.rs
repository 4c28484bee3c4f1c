//! Workflow assistant - turns a conversation into a recipe proposal
//!
//! A reply may ask for template details first (`template_request` fence); the
//! assistant then runs a second turn with those details before extracting the
//! workflow.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::domain::ai::{AiCallConfig, AiClient, Message, MessageRole};
use crate::domain::assistant::{
    extract_suggestions, extract_template_request, extract_workflow, merge_template_step,
    proposal_to_step, strip_structured_blocks, synthesize_input_config, GeneratedWorkflow,
    MERGEABLE_FIELDS,
};
use crate::domain::executor::{ExecutorInfo, ExecutorRegistry};
use crate::domain::recipe::{Recipe, RecipeId, RecipeRepository, Step};
use crate::domain::DomainError;

/// Model settings for assistant calls
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

/// What the assistant hands back for one conversation turn
#[derive(Debug, Clone, Serialize)]
pub struct AssistantReply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<GeneratedWorkflow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl AssistantReply {
    fn from_text(text: &str, workflow: Option<GeneratedWorkflow>) -> Self {
        Self {
            message: strip_structured_blocks(text),
            workflow,
            suggestions: extract_suggestions(text),
        }
    }
}

/// Builds workflow proposals with an AI model and saves them as recipes
#[derive(Debug)]
pub struct WorkflowAssistant {
    ai: Arc<dyn AiClient>,
    recipes: Arc<dyn RecipeRepository>,
    registry: Arc<ExecutorRegistry>,
    settings: AssistantSettings,
}

impl WorkflowAssistant {
    pub fn new(
        ai: Arc<dyn AiClient>,
        recipes: Arc<dyn RecipeRepository>,
        registry: Arc<ExecutorRegistry>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            ai,
            recipes,
            registry,
            settings,
        }
    }

    /// Runs one assistant turn over the conversation so far
    pub async fn generate_workflow(
        &self,
        messages: Vec<Message>,
        user_id: i64,
    ) -> Result<AssistantReply, DomainError> {
        let mut history = messages;
        let prompt = match history.pop() {
            Some(last) if last.role == MessageRole::User && !last.content.trim().is_empty() => {
                last.content
            }
            _ => {
                return Err(DomainError::validation(
                    "Conversation must end with a non-empty user message",
                ));
            }
        };
        history.retain(|m| m.role != MessageRole::System);

        let templates = self.recipes.list_templates(user_id).await?;
        let executors = self.registry.describe_all().await;
        let system_prompt =
            build_system_prompt(&executors, &self.ai.available_models(), &templates);

        let first = self.call(&system_prompt, history.clone(), &prompt).await?;

        if let Some(reply) = self.extract(&first) {
            return Ok(reply);
        }

        let Some(template_ids) = extract_template_request(&first) else {
            return Ok(AssistantReply::from_text(&first, None));
        };

        let details = self.template_details(&template_ids, user_id).await?;
        if details.is_empty() {
            info!(user_id, requested = template_ids.len(), "No requested template had steps");
            return Ok(AssistantReply::from_text(&first, None));
        }

        debug!(user_id, templates = details.len(), "Sending template details");
        history.push(Message::user(prompt));
        history.push(Message::assistant(first));
        let follow_up = template_follow_up(&details);
        let second = self.call(&system_prompt, history, &follow_up).await?;

        Ok(self
            .extract(&second)
            .unwrap_or_else(|| AssistantReply::from_text(&second, None)))
    }

    /// Persists a proposal as a recipe, merging template-sourced steps
    pub async fn save_workflow_as_recipe(
        &self,
        workflow: GeneratedWorkflow,
        user_id: i64,
        is_template: bool,
    ) -> Result<Recipe, DomainError> {
        if workflow.name.trim().is_empty() {
            return Err(DomainError::validation("Workflow name is required"));
        }
        if workflow.steps.is_empty() {
            return Err(DomainError::validation("Workflow has no steps"));
        }

        let mut proposals = workflow.steps.clone();
        proposals.sort_by_key(|s| s.order);

        let mut templates: HashMap<RecipeId, Option<Recipe>> = HashMap::new();
        let mut steps = Vec::with_capacity(proposals.len());

        for (index, proposal) in proposals.iter().enumerate() {
            let order = index as u32 + 1;

            let template_step = match proposal.template_source() {
                Some((template_id, step_order)) => self
                    .template(&mut templates, template_id, user_id)
                    .await?
                    .and_then(|t| t.step_by_order(step_order).cloned()),
                None => None,
            };

            let step = match template_step {
                Some(template_step) => merge_template_step(&template_step, proposal, order),
                None => {
                    if proposal.template_source().is_some() {
                        warn!(
                            step = %proposal.name,
                            "Template step not found, saving proposal as-is"
                        );
                    }
                    let step = proposal_to_step(proposal, order);
                    if step.input_config().is_empty() {
                        let inputs = synthesize_input_config(&step, &workflow.required_inputs);
                        step.with_input_config(inputs)
                    } else {
                        step
                    }
                }
            };
            steps.push(step);
        }

        let mut recipe = Recipe::new(user_id, workflow.name.trim())
            .with_steps(steps)
            .as_template(is_template);
        if let Some(description) = workflow.description.filter(|d| !d.trim().is_empty()) {
            recipe = recipe.with_description(description);
        }

        let saved = self.recipes.create(recipe).await?;
        info!(
            recipe_id = %saved.id(),
            user_id,
            steps = saved.steps().len(),
            is_template,
            "Saved generated workflow"
        );
        Ok(saved)
    }

    async fn call(
        &self,
        system_prompt: &str,
        history: Vec<Message>,
        prompt: &str,
    ) -> Result<String, DomainError> {
        let config = AiCallConfig::new()
            .with_system_prompt(system_prompt)
            .with_messages(history)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        let result = self
            .ai
            .call_ai_by_model(&self.settings.model, prompt, config)
            .await;

        if !result.success {
            let message = result
                .error
                .unwrap_or_else(|| "Assistant call failed".to_string());
            warn!(model = %self.settings.model, error = %message, "Assistant call failed");
            return Err(DomainError::provider("ai", message));
        }

        Ok(result.content)
    }

    fn extract(&self, text: &str) -> Option<AssistantReply> {
        let (workflow, strategy) = extract_workflow(text)?;
        info!(
            strategy = %strategy,
            name = %workflow.name,
            steps = workflow.steps.len(),
            "Extracted workflow from reply"
        );
        Some(AssistantReply::from_text(text, Some(workflow)))
    }

    async fn template<'a>(
        &self,
        cache: &'a mut HashMap<RecipeId, Option<Recipe>>,
        template_id: RecipeId,
        user_id: i64,
    ) -> Result<Option<&'a Recipe>, DomainError> {
        if !cache.contains_key(&template_id) {
            let recipe = self
                .recipes
                .get(template_id)
                .await?
                .filter(|r| r.user_id() == user_id || r.is_template());
            cache.insert(template_id, recipe);
        }
        Ok(cache.get(&template_id).and_then(Option::as_ref))
    }

    /// Detail documents for the requested templates that have steps
    async fn template_details(
        &self,
        template_ids: &[RecipeId],
        user_id: i64,
    ) -> Result<Vec<Value>, DomainError> {
        let mut details = Vec::new();

        for &template_id in template_ids {
            let recipe = match self.recipes.get(template_id).await? {
                Some(recipe) if recipe.user_id() == user_id || recipe.is_template() => recipe,
                _ => {
                    debug!(template_id = %template_id, "Requested template not available");
                    continue;
                }
            };
            if recipe.steps().is_empty() {
                continue;
            }

            details.push(json!({
                "template_id": recipe.id(),
                "name": recipe.name(),
                "description": recipe.description(),
                "steps": recipe.steps().iter().map(step_detail).collect::<Vec<_>>(),
            }));
        }

        Ok(details)
    }
}

/// A template step as JSON with sub-configs embedded as objects
fn step_detail(step: &Step) -> Value {
    let mut detail = serde_json::to_value(step).unwrap_or(Value::Null);

    if let Value::Object(map) = &mut detail {
        map.remove("id");
        for key in ["api_config", "executor_config", "model_config"] {
            if let Some(Value::String(text)) = map.get(key) {
                if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                    map.insert(key.to_string(), parsed);
                }
            }
        }
    }

    detail
}

fn template_follow_up(details: &[Value]) -> String {
    let body = serde_json::to_string_pretty(details).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Here are the details of the templates you requested:\n\n```json\n{}\n```\n\n\
         Now produce the complete workflow in a ```workflow fence. For steps taken from a \
         template set from_template_id and from_step_order, and list in override_fields only \
         the fields you change.",
        body
    )
}

/// The assistant's system prompt: executors, models, templates and the
/// expected reply format
pub fn build_system_prompt(
    executors: &[ExecutorInfo],
    models: &[String],
    templates: &[Recipe],
) -> String {
    let mut lines: Vec<String> = vec![
        "You help users design multi-step workflows (recipes). Each step runs one \
         executor and pauses for human review before the next step starts."
            .to_string(),
        String::new(),
        "## Step types".to_string(),
    ];

    for executor in executors {
        lines.push(format!("- `{}`: {}", executor.step_type, executor.description));
        lines.extend(executor.config_schema.iter().map(|field| {
            format!(
                "  - {} ({}{}): {}",
                field.name,
                field.field_type,
                if field.required { ", required" } else { "" },
                field.description
            )
        }));
    }

    lines.push(String::new());
    lines.push("## Available AI models".to_string());
    lines.extend(models.iter().map(|model| format!("- {}", model)));

    lines.push(String::new());
    lines.push("## Variables".to_string());
    lines.push(
        "Prompts and configs may reference `{{input_name}}` for user inputs, \
         `{{step_N_output}}` for the output of step N, and company standards such as \
         `{{brand_voice}}`, `{{platform_requirements}}` or `{{image_guidelines}}`."
            .to_string(),
    );

    lines.push(String::new());
    lines.push("## Saved templates".to_string());
    if templates.is_empty() {
        lines.push("The user has no saved templates.".to_string());
    } else {
        for template in templates {
            let types: Vec<&str> = template.steps().iter().map(Step::step_type).collect();
            lines.push(format!(
                "- id {}: {}{} [steps: {}]",
                template.id(),
                template.name(),
                template
                    .description()
                    .map(|d| format!(" - {}", d))
                    .unwrap_or_default(),
                types.join(", ")
            ));
        }
        lines.push(String::new());
        lines.push(
            "To reuse a template, first ask for its details by replying with a \
             ```template_request fence holding a JSON array of template ids. Reference \
             template steps with from_template_id and from_step_order; fields not listed \
             in override_fields are copied from the template step."
                .to_string(),
        );
        lines.push(format!("Overridable fields: {}", MERGEABLE_FIELDS.join(", ")));
    }

    lines.push(String::new());
    lines.push("## Reply format".to_string());
    lines.push(
        "Explain the workflow briefly, then give it in a ```workflow \
         fence as JSON: {\"name\", \"description\", \"steps\": [{\"order\", \"name\", \
         \"step_type\", ...config, \"from_template_id\"?, \"from_step_order\"?, \
         \"override_fields\"?}], \"required_inputs\": [{\"name\", \"type\", \
         \"description\"}]}. Use type `url_list` for inputs holding URLs. Optionally add a \
         ```suggestions fence with a JSON array of follow-up ideas."
            .to_string(),
    );

    let mut prompt = lines.join("\n");
    prompt.push('\n');
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ai::MockAiClient;
    use crate::domain::assistant::{GeneratedStep, RequiredInput};
    use crate::domain::executor::{ExecutorOutcome, MockExecutor};
    use crate::domain::recipe::{InputVariable, ModelConfig, StepType};
    use crate::infrastructure::recipe::StorageRecipeRepository;
    use crate::infrastructure::storage::InMemoryStorage;

    struct Harness {
        assistant: WorkflowAssistant,
        recipes: Arc<StorageRecipeRepository>,
        ai: Arc<MockAiClient>,
    }

    async fn harness(ai: MockAiClient) -> Harness {
        let recipes = Arc::new(StorageRecipeRepository::new(Arc::new(
            InMemoryStorage::<Recipe>::new(),
        )));
        let registry = Arc::new(ExecutorRegistry::new());
        registry
            .register(Arc::new(MockExecutor::new("ai", ExecutorOutcome::ok(""))))
            .await;
        let ai = Arc::new(ai);

        Harness {
            assistant: WorkflowAssistant::new(
                ai.clone(),
                recipes.clone(),
                registry,
                AssistantSettings::default(),
            ),
            recipes,
            ai,
        }
    }

    async fn seed_template(recipes: &StorageRecipeRepository) -> Recipe {
        recipes
            .create(
                Recipe::new(1, "Blog template")
                    .with_description("Draft and polish")
                    .with_steps(vec![
                        Step::ai(1, "Draft", "Write about {{topic}}")
                            .with_ai_model("m1")
                            .with_model_config(ModelConfig {
                                temperature: Some(0.2),
                                ..Default::default()
                            })
                            .with_input_config(vec![InputVariable::new("topic", "text").required()]),
                        Step::new(2, "Fetch", "http")
                            .with_executor_config(json!({"url": "https://api.example/{{topic}}"})),
                    ])
                    .as_template(true),
            )
            .await
            .unwrap()
    }

    const WORKFLOW_REPLY: &str = "Here is a plan.\n```workflow\n{\"name\": \"Blog\", \"steps\": [{\"order\": 1, \"name\": \"Draft\", \"prompt_template\": \"Write about {{topic}}\"}], \"required_inputs\": [{\"name\": \"topic\"}]}\n```\n```suggestions\n[\"Add an image step\"]\n```";

    #[tokio::test]
    async fn test_single_pass_extracts_workflow() {
        let h = harness(MockAiClient::new().with_reply(WORKFLOW_REPLY)).await;

        let reply = h
            .assistant
            .generate_workflow(vec![Message::user("A blog workflow please")], 1)
            .await
            .unwrap();

        let workflow = reply.workflow.unwrap();
        assert_eq!(workflow.name, "Blog");
        assert_eq!(reply.message, "Here is a plan.");
        assert_eq!(reply.suggestions, Some(vec!["Add an image step".to_string()]));
        assert_eq!(h.ai.calls().len(), 1);
        assert!(h.ai.calls()[0]
            .system_prompt
            .as_deref()
            .unwrap()
            .contains("- `ai`: Test executor"));
    }

    #[tokio::test]
    async fn test_two_pass_injects_template_details() {
        let h = harness(
            MockAiClient::new()
                .with_reply("Let me look.\n```template_request\n[1, 99]\n```")
                .with_reply(WORKFLOW_REPLY),
        )
        .await;
        seed_template(&h.recipes).await;

        let reply = h
            .assistant
            .generate_workflow(vec![Message::user("Reuse my blog template")], 1)
            .await
            .unwrap();

        assert!(reply.workflow.is_some());
        let calls = h.ai.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].system_prompt.as_deref().unwrap().contains("id 1: Blog template"));
        assert_eq!(calls[1].history.len(), 2);
        assert!(calls[1].prompt.contains("\"template_id\": 1"));
        assert!(calls[1].prompt.contains("\"url\": \"https://api.example/{{topic}}\""));
    }

    #[tokio::test]
    async fn test_template_request_without_details_returns_first_reply() {
        let h = harness(
            MockAiClient::new().with_reply("Checking.\n```template_request\n{\"template_ids\": [5]}\n```"),
        )
        .await;

        let reply = h
            .assistant
            .generate_workflow(vec![Message::user("Use template 5")], 1)
            .await
            .unwrap();

        assert!(reply.workflow.is_none());
        assert_eq!(reply.message, "Checking.");
        assert_eq!(h.ai.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_conversation_must_end_with_user() {
        let h = harness(MockAiClient::new()).await;

        let result = h
            .assistant
            .generate_workflow(vec![Message::assistant("Hi")], 1)
            .await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_provider_failure_is_an_error() {
        let h = harness(MockAiClient::new().with_failure("quota exceeded")).await;

        let result = h
            .assistant
            .generate_workflow(vec![Message::user("Anything")], 1)
            .await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_save_hybrid_merge() {
        let h = harness(MockAiClient::new()).await;
        let template = seed_template(&h.recipes).await;

        let workflow = GeneratedWorkflow {
            name: "Haiku blog".to_string(),
            description: Some("Short posts".to_string()),
            steps: vec![
                GeneratedStep {
                    order: 5,
                    name: "Scrape".to_string(),
                    step_type: Some(StepType::Scraping.as_str().to_string()),
                    api_config: Some(json!({"dataset": "gd_products"})),
                    ..Default::default()
                },
                GeneratedStep {
                    order: 2,
                    name: "Haiku".to_string(),
                    ai_model: Some("m2".to_string()),
                    prompt_template: Some("Write a haiku about {{topic}}".to_string()),
                    from_template_id: Some(template.id()),
                    from_step_order: Some(1),
                    override_fields: vec!["prompt_template".to_string()],
                    ..Default::default()
                },
                GeneratedStep {
                    order: 3,
                    name: "Orphan".to_string(),
                    prompt_template: Some("Mention {{audience}}".to_string()),
                    from_template_id: Some(RecipeId::new(42)),
                    from_step_order: Some(1),
                    ..Default::default()
                },
            ],
            required_inputs: vec![
                RequiredInput {
                    name: "audience".to_string(),
                    input_type: "text".to_string(),
                    description: "Who reads it".to_string(),
                },
                RequiredInput {
                    name: "links".to_string(),
                    input_type: "url_list".to_string(),
                    description: String::new(),
                },
            ],
        };

        let recipe = h
            .assistant
            .save_workflow_as_recipe(workflow, 1, false)
            .await
            .unwrap();

        let steps = recipe.steps();
        assert_eq!(steps.iter().map(Step::order).collect::<Vec<_>>(), vec![1, 2, 3]);

        assert_eq!(steps[0].name(), "Draft");
        assert_eq!(steps[0].ai_model(), Some("m1"));
        assert_eq!(steps[0].prompt_template(), Some("Write a haiku about {{topic}}"));
        assert_eq!(steps[0].model_config().unwrap().temperature, Some(0.2));
        assert_eq!(steps[0].input_config()[0].name, "topic");

        assert_eq!(steps[1].name(), "Orphan");
        assert_eq!(steps[1].input_config()[0].name, "audience");

        assert_eq!(steps[2].step_type(), "scraping");
        assert_eq!(steps[2].input_config()[0].name, "links");
        assert!(steps[2].input_config()[0].required);

        assert!(!recipe.is_template());
        assert_eq!(recipe.description(), Some("Short posts"));
    }

    #[tokio::test]
    async fn test_save_rejects_empty_workflow() {
        let h = harness(MockAiClient::new()).await;

        let result = h
            .assistant
            .save_workflow_as_recipe(
                GeneratedWorkflow {
                    name: "Empty".to_string(),
                    description: None,
                    steps: vec![],
                    required_inputs: vec![],
                },
                1,
                true,
            )
            .await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_step_detail_embeds_string_configs() {
        let step = Step::new(1, "Call", "http")
            .with_executor_config(Value::String("{\"url\": \"https://a\"}".to_string()));

        let detail = step_detail(&step);

        assert_eq!(detail["executor_config"]["url"], "https://a");
        assert!(detail.get("id").is_none());
    }

    #[test]
    fn test_system_prompt_lists_executors_models_and_templates() {
        let executors = vec![ExecutorInfo {
            step_type: "http".to_string(),
            description: "Calls an HTTP endpoint".to_string(),
            config_schema: vec![
                crate::domain::executor::ConfigField::required("url", "string", "Target URL"),
                crate::domain::executor::ConfigField::optional("method", "string", "Verb"),
            ],
        }];
        let template = Recipe::new(1, "Blog post")
            .with_id(RecipeId::new(7))
            .with_description("Outline then draft")
            .with_steps(vec![Step::ai(1, "Outline", "Outline {{topic}}")])
            .as_template(true);

        let prompt = build_system_prompt(&executors, &["gpt-4o".to_string()], &[template]);

        assert!(prompt.contains("- `http`: Calls an HTTP endpoint\n"));
        assert!(prompt.contains("  - url (string, required): Target URL\n"));
        assert!(prompt.contains("  - method (string): Verb\n"));
        assert!(prompt.contains("## Available AI models\n- gpt-4o\n"));
        assert!(prompt.contains("- id 7: Blog post - Outline then draft [steps: ai]"));
        assert!(prompt.contains("Overridable fields: "));
        assert!(prompt.ends_with("follow-up ideas.\n"));

        let empty = build_system_prompt(&executors, &[], &[]);
        assert!(empty.contains("The user has no saved templates."));
        assert!(!empty.contains("template_request"));
    }
}
