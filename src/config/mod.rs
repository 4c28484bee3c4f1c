//! Application configuration

mod app_config;

pub use app_config::{
    AiConfig, AppConfig, AssistantConfig, EngineSettings, ExecutorsConfig, LogFormat,
    LoggingConfig, ScrapingConfig, ServerConfig, StorageConfig,
};
