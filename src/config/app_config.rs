use std::time::Duration;

use serde::Deserialize;

use crate::domain::UnresolvedVariablePolicy;
use crate::infrastructure::executor::ScriptRuntime;
use crate::infrastructure::scraping::ScrapingPollConfig;
use crate::infrastructure::storage::PostgresConfig;

/// Application configuration
///
/// Every section has defaults so the binary runs without a config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub scraping: ScrapingConfig,
    pub executors: ExecutorsConfig,
    pub engine: EngineSettings,
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `memory` or `postgres`
    pub backend: String,
    pub database_url: String,
    pub max_connections: u32,
    /// Seed a sample template recipe and standards for user 1
    pub seed_sample_data: bool,
}

impl StorageConfig {
    pub fn postgres(&self) -> PostgresConfig {
        PostgresConfig {
            url: self.database_url.clone(),
            max_connections: self.max_connections,
            ..PostgresConfig::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub default_model: String,
    pub models: Vec<String>,
    pub timeout_seconds: u64,
}

impl AiConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub base_url: String,
    /// Name of the environment variable holding the provider token
    pub token_env: String,
    pub poll_interval_seconds: u64,
    pub max_poll_attempts: u32,
    pub timeout_seconds: u64,
}

impl ScrapingConfig {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }

    pub fn poll(&self) -> ScrapingPollConfig {
        ScrapingPollConfig {
            interval: Duration::from_secs(self.poll_interval_seconds),
            max_attempts: self.max_poll_attempts,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorsConfig {
    pub script_timeout_seconds: u64,
    pub script_max_timeout_seconds: u64,
    pub python: String,
    pub node: String,
    pub bash: String,
    pub http_timeout_seconds: u64,
}

impl ExecutorsConfig {
    pub fn script_runtime(&self) -> ScriptRuntime {
        ScriptRuntime {
            python: self.python.clone(),
            node: self.node.clone(),
            bash: self.bash.clone(),
            default_timeout_seconds: self.script_timeout_seconds,
            max_timeout_seconds: self.script_max_timeout_seconds,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub unresolved_variable_policy: UnresolvedVariablePolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Falls back to `ai.default_model` when empty
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            database_url: "postgres://localhost/recipes".to_string(),
            max_connections: 10,
            seed_sample_data: true,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            default_model: "gpt-4o-mini".to_string(),
            models: vec!["gpt-4o-mini".to_string(), "gpt-4o".to_string()],
            timeout_seconds: 120,
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        let poll = ScrapingPollConfig::default();
        Self {
            base_url: "https://api.brightdata.com".to_string(),
            token_env: "SCRAPING_API_TOKEN".to_string(),
            poll_interval_seconds: poll.interval.as_secs(),
            max_poll_attempts: poll.max_attempts,
            timeout_seconds: 60,
        }
    }
}

impl Default for ExecutorsConfig {
    fn default() -> Self {
        let runtime = ScriptRuntime::default();
        Self {
            script_timeout_seconds: runtime.default_timeout_seconds,
            script_max_timeout_seconds: runtime.max_timeout_seconds,
            python: runtime.python,
            node: runtime.node,
            bash: runtime.bash,
            http_timeout_seconds: 30,
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("ai.models")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Model used by the workflow assistant
    pub fn assistant_model(&self) -> &str {
        if self.assistant.model.is_empty() {
            &self.ai.default_model
        } else {
            &self.assistant.model
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(
            config.engine.unresolved_variable_policy,
            UnresolvedVariablePolicy::FailExecution
        );
        assert_eq!(config.assistant_model(), "gpt-4o-mini");
        assert_eq!(config.executors.script_runtime().bash, "bash");
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "server": {"port": 9000},
            "engine": {"unresolved_variable_policy": "pause_execution"},
            "assistant": {"model": "gpt-4o"}
        }))
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(
            config.engine.unresolved_variable_policy,
            UnresolvedVariablePolicy::PauseExecution
        );
        assert_eq!(config.assistant_model(), "gpt-4o");
        assert_eq!(config.ai.timeout(), Duration::from_secs(120));
    }
}
