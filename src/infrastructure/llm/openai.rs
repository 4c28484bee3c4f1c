use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::http_client::HttpClientTrait;
use crate::domain::ai::{AiCallConfig, AiCallResult, AiClient, Message, MessageRole, Usage};
use crate::domain::DomainError;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible chat completions client
#[derive(Debug)]
pub struct OpenAiClient<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    models: Vec<String>,
}

impl<C: HttpClientTrait> OpenAiClient<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
            models: vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
        }
    }

    /// Replaces the advertised model list
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, model: &str, prompt: &str, config: &AiCallConfig) -> serde_json::Value {
        let mut messages: Vec<serde_json::Value> = Vec::new();

        if let Some(system) = &config.system_prompt {
            messages.push(json!(OpenAiMessage::from_domain(&Message::system(system.clone()))));
        }

        for message in &config.messages {
            messages.push(json!(OpenAiMessage::from_domain(message)));
        }

        if config.images.is_empty() {
            messages.push(json!({"role": "user", "content": prompt}));
        } else {
            let mut parts = vec![json!({"type": "text", "text": prompt})];
            for image in &config.images {
                parts.push(json!({
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:{};base64,{}", image.media_type, image.data)
                    }
                }));
            }
            messages.push(json!({"role": "user", "content": parts}));
        }

        let mut body = json!({
            "model": model,
            "messages": messages,
            "stream": false,
        });

        if let Some(temp) = config.temperature {
            body["temperature"] = json!(temp);
        }

        if let Some(max_tokens) = config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<AiCallResult, DomainError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("openai", format!("Failed to parse response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider("openai", "No choices in response"))?;

        let mut result =
            AiCallResult::ok(response.model, choice.message.content.unwrap_or_default());

        if let Some(usage) = response.usage {
            result = result.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
        }

        Ok(result)
    }

    async fn chat(
        &self,
        model: &str,
        prompt: &str,
        config: &AiCallConfig,
    ) -> Result<AiCallResult, DomainError> {
        let url = self.chat_completions_url();
        let body = self.build_request(model, prompt, config);
        let response = self.client.post_json(&url, self.headers(), &body).await?;

        self.parse_response(response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> AiClient for OpenAiClient<C> {
    async fn call_ai_by_model(
        &self,
        model: &str,
        prompt: &str,
        config: AiCallConfig,
    ) -> AiCallResult {
        debug!(model = %model, images = config.images.len(), "Calling AI model");

        match self.chat(model, prompt, &config).await {
            Ok(result) => result,
            Err(e) => {
                warn!(model = %model, error = %e, "AI call failed");
                AiCallResult::failed(model, e.to_string())
            }
        }
    }

    fn available_models(&self) -> Vec<String> {
        self.models.clone()
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

impl OpenAiMessage {
    fn from_domain(message: &Message) -> Self {
        let role = match message.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };

        Self {
            role: role.to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
