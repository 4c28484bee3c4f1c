//! Scraping step executor

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::executor::{
    ConfigField, ExecutionContext, ExecutorOutcome, StepExecutor, ValidationReport,
};
use crate::domain::prompt::is_blank;
use crate::domain::recipe::Step;
use crate::domain::scraping::{ScrapeRequest, ScrapingClient};
use crate::domain::workflow::WorkflowError;

/// `api_config` of a scraping step
#[derive(Debug, Clone, Default, Deserialize)]
struct ScrapingStepConfig {
    #[serde(default, alias = "collector", alias = "dataset_id")]
    dataset: Option<String>,
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    url_input: Option<String>,
    #[serde(default)]
    params: Option<Value>,
}

impl ScrapingStepConfig {
    fn parse(step: &Step) -> Result<Self, WorkflowError> {
        let raw = step
            .api_config()
            .ok_or_else(|| WorkflowError::validation("api_config is required"))?;

        serde_json::from_value(raw.clone())
            .map_err(|e| WorkflowError::validation(format!("Invalid api_config: {}", e)))
    }

    fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref().filter(|d| !d.trim().is_empty())
    }
}

/// Splits a URL list input: an array of strings, or newline/comma separated text
pub fn parse_url_list(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Value::String(text) => text
            .split(['\n', ','])
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    items
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

/// Runs a provider scraping job for the configured dataset
#[derive(Debug)]
pub struct ScrapingExecutor {
    client: Arc<dyn ScrapingClient>,
}

impl ScrapingExecutor {
    pub fn new(client: Arc<dyn ScrapingClient>) -> Self {
        Self { client }
    }

    fn collect_urls(
        config: &ScrapingStepConfig,
        context: &ExecutionContext,
    ) -> Result<Vec<String>, WorkflowError> {
        let mut urls: Vec<String> = config
            .urls
            .iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();

        if let Some(input) = config.url_input.as_deref() {
            match context.user_inputs.get(input) {
                Some(value) if !is_blank(value) => {
                    for url in parse_url_list(value) {
                        if !urls.contains(&url) {
                            urls.push(url);
                        }
                    }
                }
                _ => return Err(WorkflowError::unresolved(vec![input.to_string()])),
            }
        }

        if urls.is_empty() {
            return Err(WorkflowError::validation("No URLs to scrape"));
        }

        Ok(urls)
    }
}

#[async_trait]
impl StepExecutor for ScrapingExecutor {
    fn step_type(&self) -> &'static str {
        "scraping"
    }

    fn description(&self) -> &'static str {
        "Collects structured data from web pages through the scraping provider"
    }

    fn validate_config(&self, step: &Step) -> ValidationReport {
        let config = match ScrapingStepConfig::parse(step) {
            Ok(config) => config,
            Err(e) => return ValidationReport::from_errors(vec![e.to_string()]),
        };

        let mut errors = Vec::new();
        if config.dataset().is_none() {
            errors.push("api_config.dataset is required".to_string());
        }
        if config.urls.is_empty() && config.url_input.is_none() {
            errors.push("api_config needs urls or url_input".to_string());
        }
        if config.params.as_ref().is_some_and(|p| !p.is_object()) {
            errors.push("api_config.params must be an object".to_string());
        }

        ValidationReport::from_errors(errors)
    }

    async fn execute(&self, step: &Step, context: &ExecutionContext) -> ExecutorOutcome {
        let config = match ScrapingStepConfig::parse(step) {
            Ok(config) => config,
            Err(e) => return ExecutorOutcome::from_error(e),
        };
        let Some(dataset) = config.dataset().map(str::to_string) else {
            return ExecutorOutcome::from_error(WorkflowError::validation(
                "api_config.dataset is required",
            ));
        };
        let tool = format!("scraping:{}", dataset);

        let urls = match Self::collect_urls(&config, context) {
            Ok(urls) => urls,
            Err(e) => return ExecutorOutcome::from_error(e).with_model(tool),
        };
        let url_count = urls.len();

        let mut request = ScrapeRequest::new(dataset.clone(), urls);
        if let Some(params) = config.params.clone() {
            request = request.with_params(params);
        }

        debug!(step = %step.name(), dataset = %dataset, urls = url_count, "Starting scrape");
        let result = self.client.scrape(request).await;

        if !result.success {
            let message = result
                .error
                .unwrap_or_else(|| "Scrape returned no data".to_string());
            warn!(step = %step.name(), dataset = %dataset, error = %message, "Scrape failed");
            return ExecutorOutcome::from_error(WorkflowError::executor("scraping", message))
                .with_model(tool);
        }

        let data = result.data.unwrap_or(Value::Null);
        let content = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());

        let mut outcome = ExecutorOutcome::ok(content)
            .with_metadata("dataset", json!(dataset))
            .with_metadata("url_count", json!(url_count))
            .with_model(tool);
        if let Some(usage) = result.usage {
            outcome = outcome.with_metadata("usage", usage);
        }

        outcome
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::required("api_config.dataset", "string", "Provider dataset or collector id"),
            ConfigField::optional("api_config.urls", "array", "Literal URLs to scrape"),
            ConfigField::optional(
                "api_config.url_input",
                "string",
                "Name of a user input holding a URL list",
            ),
            ConfigField::optional("api_config.params", "object", "Extra provider parameters per URL"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::super::template::test_support::context;
    use super::*;
    use crate::domain::scraping::mock::MockScrapingClient;
    use crate::domain::scraping::ScrapeResult;

    fn step(api_config: Value) -> Step {
        Step::new(1, "Scrape", "scraping").with_api_config(api_config)
    }

    #[test]
    fn test_parse_url_list() {
        assert_eq!(
            parse_url_list(&json!("https://a.example\nhttps://b.example, https://c.example")),
            vec!["https://a.example", "https://b.example", "https://c.example"]
        );
        assert_eq!(
            parse_url_list(&json!(["https://a.example", " ", 5])),
            vec!["https://a.example"]
        );
        assert!(parse_url_list(&json!(42)).is_empty());
    }

    #[test]
    fn test_validate_config() {
        let executor = ScrapingExecutor::new(Arc::new(MockScrapingClient::returning(
            ScrapeResult::ok(json!([])),
        )));

        assert!(!executor.validate_config(&Step::new(1, "Bare", "scraping")).valid);

        let report = executor.validate_config(&step(json!({"urls": []})));
        assert_eq!(
            report.errors,
            vec![
                "api_config.dataset is required",
                "api_config needs urls or url_input"
            ]
        );

        assert!(executor
            .validate_config(&step(json!({"collector": "gd_1", "url_input": "links"})))
            .valid);
    }

    #[tokio::test]
    async fn test_execute_merges_literal_and_input_urls() {
        let client = Arc::new(MockScrapingClient::returning(
            ScrapeResult::ok(json!([{"title": "Mug"}])).with_usage(json!({"records": 1})),
        ));
        let executor = ScrapingExecutor::new(client.clone());
        let step = step(json!({
            "dataset": "gd_products",
            "urls": ["https://a.example"],
            "url_input": "product_urls",
            "params": {"country": "us"}
        }));
        let ctx = context(
            &[("product_urls", json!("https://a.example\nhttps://b.example"))],
            &[],
        );

        let outcome = executor.execute(&step, &ctx).await;

        assert!(outcome.success);
        assert!(outcome.content.contains("\"title\": \"Mug\""));
        assert_eq!(outcome.metadata["usage"]["records"], 1);
        assert_eq!(outcome.metadata["url_count"], 2);
        assert_eq!(outcome.model_used.as_deref(), Some("scraping:gd_products"));

        let requests = client.requests();
        assert_eq!(requests[0].urls, vec!["https://a.example", "https://b.example"]);
        assert_eq!(requests[0].params["country"], "us");
    }

    #[tokio::test]
    async fn test_missing_url_input_is_unresolved() {
        let client = Arc::new(MockScrapingClient::returning(ScrapeResult::ok(json!([]))));
        let executor = ScrapingExecutor::new(client.clone());

        let outcome = executor
            .execute(
                &step(json!({"dataset": "gd_products", "url_input": "product_urls"})),
                &context(&[], &[]),
            )
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.unresolved_variables, vec!["product_urls"]);
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure() {
        let client = Arc::new(MockScrapingClient::returning(ScrapeResult::failed(
            "snapshot failed",
        )));
        let executor = ScrapingExecutor::new(client);

        let outcome = executor
            .execute(
                &step(json!({"dataset": "gd_products", "urls": ["https://a.example"]})),
                &context(&[], &[]),
            )
            .await;

        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("scraping executor failed: snapshot failed")
        );
    }
}
