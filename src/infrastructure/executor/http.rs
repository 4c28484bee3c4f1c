//! HTTP step executor

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::template::TemplateRenderer;
use crate::domain::executor::{
    ConfigField, ExecutionContext, ExecutorOutcome, StepExecutor, ValidationReport,
};
use crate::domain::recipe::Step;
use crate::domain::workflow::WorkflowError;

/// Longest response body quoted in a failure message
const MAX_ERROR_BODY_LEN: usize = 500;

/// HTTP method of a request step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    GET,
    #[serde(alias = "post")]
    POST,
    #[serde(alias = "put")]
    PUT,
    #[serde(alias = "patch")]
    PATCH,
    #[serde(alias = "delete")]
    DELETE,
    #[serde(alias = "head")]
    HEAD,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::GET => Method::GET,
            HttpMethod::POST => Method::POST,
            HttpMethod::PUT => Method::PUT,
            HttpMethod::PATCH => Method::PATCH,
            HttpMethod::DELETE => Method::DELETE,
            HttpMethod::HEAD => Method::HEAD,
        }
    }
}

/// `executor_config` of an http step
#[derive(Debug, Clone, Deserialize)]
struct HttpStepConfig {
    url: String,
    #[serde(default)]
    method: HttpMethod,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

impl HttpStepConfig {
    fn parse(step: &Step) -> Result<Self, WorkflowError> {
        let raw = step
            .executor_config()
            .ok_or_else(|| WorkflowError::validation("executor_config is required"))?;

        serde_json::from_value(raw.clone())
            .map_err(|e| WorkflowError::validation(format!("Invalid executor_config: {}", e)))
    }
}

/// Sends an HTTP request built from compiled templates
#[derive(Debug)]
pub struct HttpExecutor {
    client: reqwest::Client,
    renderer: Arc<TemplateRenderer>,
    default_timeout: Duration,
}

impl HttpExecutor {
    pub fn new(renderer: Arc<TemplateRenderer>, default_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            renderer,
            default_timeout,
        }
    }

    /// Compiles url, header values and body, failing on any unresolved name
    async fn render(
        &self,
        mut config: HttpStepConfig,
        context: &ExecutionContext,
    ) -> Result<HttpStepConfig, WorkflowError> {
        let header_names: Vec<String> = config.headers.keys().cloned().collect();
        let mut templates: Vec<&str> = vec![config.url.as_str()];
        templates.extend(header_names.iter().filter_map(|k| config.headers.get(k).map(String::as_str)));

        let compiled = self.renderer.render_all(&templates, context).await?;
        let mut unresolved: Vec<String> = Vec::new();
        let mut texts = Vec::with_capacity(compiled.len());
        for prompt in compiled {
            for name in prompt.unresolved {
                if !unresolved.contains(&name) {
                    unresolved.push(name);
                }
            }
            texts.push(prompt.text);
        }

        let mut texts = texts.into_iter();
        config.url = texts.next().unwrap_or_default();
        for (name, text) in header_names.into_iter().zip(texts) {
            config.headers.insert(name, text);
        }

        if let Some(body) = config.body.as_mut() {
            for name in self.renderer.render_value(body, context).await? {
                if !unresolved.contains(&name) {
                    unresolved.push(name);
                }
            }
        }

        if !unresolved.is_empty() {
            return Err(WorkflowError::unresolved(unresolved));
        }

        Ok(config)
    }

    async fn send(&self, config: &HttpStepConfig) -> Result<(u16, String), WorkflowError> {
        let limit = config
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let mut request = self
            .client
            .request(config.method.into(), &config.url)
            .timeout(limit);
        for (name, value) in &config.headers {
            request = request.header(name, value);
        }
        request = match &config.body {
            Some(Value::String(text)) => request.body(text.clone()),
            Some(body) => request.json(body),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                WorkflowError::timeout("HTTP request", limit.as_secs())
            } else {
                WorkflowError::executor("http", format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WorkflowError::executor("http", format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            let snippet: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
            return Err(WorkflowError::executor(
                "http",
                format!("HTTP {}: {}", status.as_u16(), snippet),
            ));
        }

        Ok((status.as_u16(), body))
    }
}

/// Pretty-prints JSON bodies, leaving other text untouched
fn format_body(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl StepExecutor for HttpExecutor {
    fn step_type(&self) -> &'static str {
        "http"
    }

    fn description(&self) -> &'static str {
        "Calls an HTTP endpoint; url, headers and body accept {{variables}}"
    }

    fn validate_config(&self, step: &Step) -> ValidationReport {
        match HttpStepConfig::parse(step) {
            Ok(config) if config.url.trim().is_empty() => {
                ValidationReport::from_errors(vec!["executor_config.url is required".to_string()])
            }
            Ok(config)
                if !config.url.starts_with("http://")
                    && !config.url.starts_with("https://")
                    && !config.url.starts_with("{{") =>
            {
                ValidationReport::from_errors(vec![
                    "executor_config.url must be an http(s) URL".to_string(),
                ])
            }
            Ok(_) => ValidationReport::ok(),
            Err(e) => ValidationReport::from_errors(vec![e.to_string()]),
        }
    }

    async fn execute(&self, step: &Step, context: &ExecutionContext) -> ExecutorOutcome {
        let config = match HttpStepConfig::parse(step) {
            Ok(config) => config,
            Err(e) => return ExecutorOutcome::from_error(e),
        };
        let config = match self.render(config, context).await {
            Ok(config) => config,
            Err(e) => return ExecutorOutcome::from_error(e).with_model("http"),
        };
        let method = Method::from(config.method);

        debug!(step = %step.name(), method = %method, url = %config.url, "Sending HTTP request");
        match self.send(&config).await {
            Ok((status, body)) => ExecutorOutcome::ok(format_body(&body))
                .with_metadata("status", json!(status))
                .with_metadata("url", json!(config.url))
                .with_metadata("method", json!(method.as_str()))
                .with_prompt(format!("{} {}", method, config.url))
                .with_model("http"),
            Err(e) => {
                warn!(step = %step.name(), url = %config.url, error = %e, "HTTP step failed");
                ExecutorOutcome::from_error(e)
                    .with_prompt(format!("{} {}", method, config.url))
                    .with_model("http")
            }
        }
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::required("executor_config.url", "string", "Request URL; may contain {{variables}}"),
            ConfigField::optional("executor_config.method", "string", "GET, POST, PUT, PATCH, DELETE or HEAD"),
            ConfigField::optional("executor_config.headers", "object", "Header values; may contain {{variables}}"),
            ConfigField::optional("executor_config.body", "any", "Text or JSON body; string leaves are compiled"),
            ConfigField::optional("executor_config.timeout_seconds", "integer", "Request timeout"),
        ]
    }
}
