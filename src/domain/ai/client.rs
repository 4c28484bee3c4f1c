use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Message, PromptImage};

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Per-call options for an AI model invocation
#[derive(Debug, Clone, Default)]
pub struct AiCallConfig {
    pub system_prompt: Option<String>,
    /// Earlier conversation turns sent before the prompt
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub images: Vec<PromptImage>,
}

impl AiCallConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_images(mut self, images: Vec<PromptImage>) -> Self {
        self.images = images;
        self
    }
}

/// Outcome of an AI model invocation
///
/// Provider failures are reported through `success = false` rather than an
/// error so callers can record them against the step that triggered the call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiCallResult {
    pub success: bool,
    pub content: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generated_images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AiCallResult {
    pub fn ok(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn failed(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            model: model.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Calls an AI model by name
#[async_trait]
pub trait AiClient: Send + Sync + Debug {
    async fn call_ai_by_model(&self, model: &str, prompt: &str, config: AiCallConfig)
    -> AiCallResult;

    /// Models the client can route to, in preference order
    fn available_models(&self) -> Vec<String>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A recorded call made against the mock client
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub model: String,
        pub prompt: String,
        pub system_prompt: Option<String>,
        pub history: Vec<Message>,
        pub image_count: usize,
    }

    /// Mock AI client returning queued replies, or echoing the prompt when empty
    #[derive(Debug, Default)]
    pub struct MockAiClient {
        replies: Mutex<VecDeque<AiCallResult>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockAiClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_reply(self, content: impl Into<String>) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(AiCallResult::ok("mock-model", content));
            self
        }

        pub fn with_failure(self, error: impl Into<String>) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(AiCallResult::failed("mock-model", error));
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AiClient for MockAiClient {
        async fn call_ai_by_model(
            &self,
            model: &str,
            prompt: &str,
            config: AiCallConfig,
        ) -> AiCallResult {
            self.calls.lock().unwrap().push(RecordedCall {
                model: model.to_string(),
                prompt: prompt.to_string(),
                system_prompt: config.system_prompt.clone(),
                history: config.messages.clone(),
                image_count: config.images.len(),
            });

            let queued = self.replies.lock().unwrap().pop_front();
            match queued {
                Some(mut reply) => {
                    reply.model = model.to_string();
                    reply
                }
                None => AiCallResult::ok(model, format!("echo: {}", prompt))
                    .with_usage(Usage::new(10, 5)),
            }
        }

        fn available_models(&self) -> Vec<String> {
            vec!["mock-model".to_string(), "mock-model-large".to_string()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_total() {
        let usage = Usage::new(12, 30);
        assert_eq!(usage.total_tokens, 42);
    }

    #[test]
    fn test_call_config_builder() {
        let config = AiCallConfig::new()
            .with_system_prompt("be brief")
            .with_temperature(0.2)
            .with_max_tokens(256);

        assert_eq!(config.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, Some(256));
        assert!(config.images.is_empty());
    }

    #[test]
    fn test_failed_result_skips_empty_fields() {
        let result = AiCallResult::failed("gpt-4o", "rate limited");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "rate limited");
        assert!(json.get("usage").is_none());
        assert!(json.get("generated_images").is_none());
    }
}
