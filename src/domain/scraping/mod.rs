//! Scraping provider contract

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A scraping job request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    /// Provider dataset or collector identifier
    pub dataset: String,
    pub urls: Vec<String>,
    /// Provider-specific parameters forwarded untouched
    #[serde(default)]
    pub params: Value,
}

impl ScrapeRequest {
    pub fn new(dataset: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            dataset: dataset.into(),
            urls,
            params: Value::Null,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// Outcome of a scraping job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: Value) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Runs a scraping job to completion (trigger, wait, download)
#[async_trait]
pub trait ScrapingClient: Send + Sync + Debug {
    async fn scrape(&self, request: ScrapeRequest) -> ScrapeResult;
}
