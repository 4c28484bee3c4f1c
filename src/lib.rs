//! PMP Recipe Runner
//!
//! Runs multi-step recipes (AI calls, scraping, scripts, HTTP requests and
//! transforms) as workflow executions that pause for human review after every
//! step, plus an assistant that drafts new recipes from a conversation.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use api::state::AppState;
use domain::ai::AiClient;
use domain::execution::{ExecutionInputRecord, StepExecution, WorkflowExecution};
use domain::executor::ExecutorRegistry;
use domain::recipe::{InputVariable, Recipe, RecipeRepository, Step};
use domain::scraping::ScrapingClient;
use domain::standard::{CompanyStandard, StandardKind, StandardRepository};
use domain::PromptCompiler;
use infrastructure::execution::{
    StorageExecutionInputRepository, StorageExecutionRepository, StorageStepExecutionRepository,
};
use infrastructure::executor::BuiltinExecutors;
use infrastructure::llm::{HttpClient, OpenAiClient};
use infrastructure::recipe::StorageRecipeRepository;
use infrastructure::scraping::HttpScrapingClient;
use infrastructure::services::{AssistantSettings, WorkflowAssistant};
use infrastructure::standard::StorageStandardRepository;
use infrastructure::storage::{StorageFactory, StorageType};
use infrastructure::workflow::{EngineConfig, EngineRepositories, WorkflowEngine};

/// Owner of the sample recipes and standards
const SAMPLE_USER_ID: i64 = 1;

/// Create the application state with all services initialized
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage_type = StorageType::from_str(&config.storage.backend).ok_or_else(|| {
        anyhow::anyhow!("Unknown storage backend '{}'", config.storage.backend)
    })?;
    info!(backend = ?storage_type, "Opening storage");
    let backend = StorageFactory::connect(&storage_type, &config.storage.postgres()).await?;

    let recipes: Arc<dyn RecipeRepository> = Arc::new(StorageRecipeRepository::new(
        StorageFactory::create::<Recipe>(&backend, "recipes").await?,
    ));
    let standards: Arc<dyn StandardRepository> = Arc::new(StorageStandardRepository::new(
        StorageFactory::create::<CompanyStandard>(&backend, "company_standards").await?,
    ));
    let repos = EngineRepositories {
        recipes: recipes.clone(),
        executions: Arc::new(StorageExecutionRepository::new(
            StorageFactory::create::<WorkflowExecution>(&backend, "workflow_executions").await?,
        )),
        step_executions: Arc::new(StorageStepExecutionRepository::new(
            StorageFactory::create::<StepExecution>(&backend, "step_executions").await?,
        )),
        input_records: Arc::new(StorageExecutionInputRepository::new(
            StorageFactory::create::<ExecutionInputRecord>(&backend, "execution_inputs").await?,
        )),
    };

    if config.storage.seed_sample_data {
        seed_sample_data(recipes.as_ref(), standards.as_ref()).await?;
    }

    let ai_client = create_ai_client(config)?;
    let scraping_client = create_scraping_client(config)?;
    let compiler = PromptCompiler::default();

    let registry = Arc::new(ExecutorRegistry::new());
    BuiltinExecutors {
        ai_client: ai_client.clone(),
        scraping_client,
        standards,
        compiler: compiler.clone(),
        default_model: config.ai.default_model.clone(),
        script_runtime: config.executors.script_runtime(),
        http_timeout: config.executors.http_timeout(),
    }
    .register_all(&registry)
    .await;

    let engine = Arc::new(WorkflowEngine::new(
        repos,
        registry.clone(),
        compiler,
        EngineConfig {
            unresolved_variable_policy: config.engine.unresolved_variable_policy,
        },
    ));

    let assistant = Arc::new(WorkflowAssistant::new(
        ai_client,
        recipes.clone(),
        registry,
        AssistantSettings {
            model: config.assistant_model().to_string(),
            temperature: config.assistant.temperature,
            max_tokens: config.assistant.max_tokens,
        },
    ));

    info!(
        default_model = %config.ai.default_model,
        policy = ?config.engine.unresolved_variable_policy,
        "Application state ready"
    );

    Ok(AppState::new(engine, assistant, recipes))
}

fn create_ai_client(config: &AppConfig) -> anyhow::Result<Arc<dyn AiClient>> {
    let api_key = config.ai.api_key().unwrap_or_else(|| {
        warn!(
            env = %config.ai.api_key_env,
            "AI API key not set; AI steps will fail until it is configured"
        );
        String::new()
    });

    let mut client = OpenAiClient::with_base_url(
        HttpClient::with_timeout(config.ai.timeout())?,
        api_key,
        &config.ai.base_url,
    );
    if !config.ai.models.is_empty() {
        client = client.with_models(config.ai.models.clone());
    }

    Ok(Arc::new(client))
}

fn create_scraping_client(config: &AppConfig) -> anyhow::Result<Arc<dyn ScrapingClient>> {
    let token = config.scraping.token().unwrap_or_else(|| {
        warn!(
            env = %config.scraping.token_env,
            "Scraping token not set; scraping steps will fail until it is configured"
        );
        String::new()
    });

    Ok(Arc::new(HttpScrapingClient::new(
        HttpClient::with_timeout(Duration::from_secs(config.scraping.timeout_seconds))?,
        &config.scraping.base_url,
        token,
        config.scraping.poll(),
    )))
}

/// Seeds sample templates and standards unless the sample user already has recipes
async fn seed_sample_data(
    recipes: &dyn RecipeRepository,
    standards: &dyn StandardRepository,
) -> anyhow::Result<()> {
    if !recipes.list_by_user(SAMPLE_USER_ID).await?.is_empty() {
        return Ok(());
    }

    for recipe in sample_recipes() {
        recipes.create(recipe).await?;
    }
    for standard in sample_standards() {
        standards.create(standard).await?;
    }

    info!(user_id = SAMPLE_USER_ID, "Seeded sample recipes and standards");
    Ok(())
}

fn sample_recipes() -> Vec<Recipe> {
    vec![
        Recipe::new(SAMPLE_USER_ID, "Product listing from competitor pages")
            .with_description("Scrape product pages, then draft a marketplace listing")
            .with_steps(vec![
                Step::new(1, "Scrape products", "scraping")
                    .with_api_config(json!({
                        "dataset": "gd_l7q7dkf244hwjntr0",
                        "url_input": "product_urls"
                    }))
                    .with_input_config(vec![
                        InputVariable::new("product_urls", "url_list")
                            .with_description("Product pages to learn from")
                            .required(),
                    ]),
                Step::ai(
                    2,
                    "Write listing",
                    "Using the product data below, write a listing for our own product.\n\n\
                     {{step_1_output}}\n\n{{brand_voice}}\n\n{{amazon_requirements}}",
                ),
                Step::new(3, "Tidy", "transform")
                    .with_executor_config(json!({"operation": "text", "mode": "trim"})),
            ])
            .as_template(true),
        Recipe::new(SAMPLE_USER_ID, "Blog post")
            .with_description("Outline, then draft a post in the brand voice")
            .with_steps(vec![
                Step::ai(1, "Outline", "Outline a blog post about {{topic}}.\n\n{{brand_voice}}")
                    .with_input_config(vec![InputVariable::new("topic", "text").required()]),
                Step::ai(
                    2,
                    "Draft",
                    "Write the full post from this outline:\n\n{{step_1_output}}",
                ),
            ])
            .as_template(true),
    ]
}

fn sample_standards() -> Vec<CompanyStandard> {
    vec![
        CompanyStandard::new(
            SAMPLE_USER_ID,
            "Brand voice",
            StandardKind::Voice,
            json!({
                "tone": "Friendly and confident",
                "do": ["Use short sentences", "Speak to the reader directly"],
                "dont": ["Use jargon", "Overpromise"]
            }),
        ),
        CompanyStandard::new(
            SAMPLE_USER_ID,
            "Amazon listing rules",
            StandardKind::Platform,
            json!({
                "platform": "Amazon",
                "title_max_length": 200,
                "bullet_points": 5,
                "forbidden": ["Prices in the title", "Promotional claims"]
            }),
        ),
        CompanyStandard::new(
            SAMPLE_USER_ID,
            "Product photos",
            StandardKind::Image,
            json!({"background": "Pure white", "dimensions": "2000x2000"}),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_app_state_in_memory() {
        let state = create_app_state(&AppConfig::default()).await.unwrap();

        let tags: Vec<String> = state
            .registry
            .describe_all()
            .await
            .into_iter()
            .map(|e| e.step_type)
            .collect();
        assert_eq!(tags, vec!["ai", "http", "scraping", "script", "transform"]);

        let templates = state.recipes.list_templates(SAMPLE_USER_ID).await.unwrap();
        assert_eq!(templates.len(), 2);
    }

    #[test]
    fn test_sample_recipes_are_valid() {
        for recipe in sample_recipes() {
            recipe.validate_step_orders().unwrap();
            assert!(recipe.is_template());
        }
    }

    #[tokio::test]
    async fn test_unknown_backend_is_rejected() {
        let mut config = AppConfig::default();
        config.storage.backend = "sqlite".to_string();

        assert!(create_app_state(&config).await.is_err());
    }
}
