//! Scraping provider adapter
//!
//! Jobs follow a trigger / poll / download protocol:
//! - `POST {base}/datasets/v3/trigger?dataset_id=..` returns a `snapshot_id`
//! - `GET {base}/datasets/v3/progress/{snapshot_id}` reports `status`
//! - `GET {base}/datasets/v3/snapshot/{snapshot_id}?format=json` returns the data

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::domain::scraping::{ScrapeRequest, ScrapeResult, ScrapingClient};
use crate::domain::DomainError;
use crate::infrastructure::llm::HttpClientTrait;

/// Polling behaviour while waiting for a snapshot
#[derive(Debug, Clone)]
pub struct ScrapingPollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ScrapingPollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// HTTP implementation of the scraping contract
#[derive(Debug)]
pub struct HttpScrapingClient<C: HttpClientTrait> {
    client: C,
    base_url: String,
    auth_header: String,
    poll: ScrapingPollConfig,
}

impl<C: HttpClientTrait> HttpScrapingClient<C> {
    pub fn new(
        client: C,
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        poll: ScrapingPollConfig,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {}", api_token.into()),
            poll,
        }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    async fn trigger(&self, request: &ScrapeRequest) -> Result<String, DomainError> {
        let url = format!(
            "{}/datasets/v3/trigger?dataset_id={}",
            self.base_url, request.dataset
        );

        let mut inputs: Vec<Value> = Vec::with_capacity(request.urls.len());
        for target in &request.urls {
            let mut input = json!({ "url": target });
            if let (Value::Object(extra), Some(map)) = (&request.params, input.as_object_mut()) {
                for (key, value) in extra {
                    map.insert(key.clone(), value.clone());
                }
            }
            inputs.push(input);
        }

        let response = self
            .client
            .post_json(&url, self.headers(), &Value::Array(inputs))
            .await?;

        response
            .get("snapshot_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DomainError::provider("scraping", "Trigger response has no snapshot_id"))
    }

    async fn wait_until_ready(&self, snapshot_id: &str) -> Result<(), DomainError> {
        let url = format!("{}/datasets/v3/progress/{}", self.base_url, snapshot_id);

        for attempt in 1..=self.poll.max_attempts {
            let progress = self.client.get_json(&url, self.headers()).await?;
            let status = progress
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown");

            debug!(snapshot_id = %snapshot_id, attempt, status = %status, "Polled scraping job");

            match status {
                "ready" => return Ok(()),
                "failed" => {
                    return Err(DomainError::provider(
                        "scraping",
                        format!("Snapshot {} failed", snapshot_id),
                    ));
                }
                _ => tokio::time::sleep(self.poll.interval).await,
            }
        }

        Err(DomainError::provider(
            "scraping",
            format!(
                "Snapshot {} not ready after {} attempts",
                snapshot_id, self.poll.max_attempts
            ),
        ))
    }

    async fn download(&self, snapshot_id: &str) -> Result<Value, DomainError> {
        let url = format!(
            "{}/datasets/v3/snapshot/{}?format=json",
            self.base_url, snapshot_id
        );
        self.client.get_json(&url, self.headers()).await
    }

    async fn run(&self, request: &ScrapeRequest) -> Result<ScrapeResult, DomainError> {
        let snapshot_id = self.trigger(request).await?;
        info!(snapshot_id = %snapshot_id, dataset = %request.dataset, "Scraping job triggered");

        self.wait_until_ready(&snapshot_id).await?;
        let data = self.download(&snapshot_id).await?;

        let records = data.as_array().map(Vec::len).unwrap_or(1);
        let usage = json!({
            "snapshot_id": snapshot_id,
            "urls": request.urls.len(),
            "records": records,
        });

        Ok(ScrapeResult::ok(data).with_usage(usage))
    }
}

#[async_trait]
impl<C: HttpClientTrait> ScrapingClient for HttpScrapingClient<C> {
    async fn scrape(&self, request: ScrapeRequest) -> ScrapeResult {
        match self.run(&request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(dataset = %request.dataset, error = %e, "Scraping job failed");
                ScrapeResult::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const BASE: &str = "https://scraper.test";

    fn fast_poll(max_attempts: u32) -> ScrapingPollConfig {
        ScrapingPollConfig {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_trigger_poll_download() {
        let http = MockHttpClient::new()
            .with_response(
                format!("{}/datasets/v3/trigger?dataset_id=gd_1", BASE),
                json!({"snapshot_id": "s_1"}),
            )
            .with_response(
                format!("{}/datasets/v3/progress/s_1", BASE),
                json!({"status": "running"}),
            )
            .with_response(
                format!("{}/datasets/v3/progress/s_1", BASE),
                json!({"status": "ready"}),
            )
            .with_response(
                format!("{}/datasets/v3/snapshot/s_1?format=json", BASE),
                json!([{"title": "Mug"}, {"title": "Cup"}]),
            );

        let client = HttpScrapingClient::new(http, BASE, "token", fast_poll(5));
        let request = ScrapeRequest::new("gd_1", vec!["https://shop.test/mug".to_string()])
            .with_params(json!({"country": "us"}));

        let result = client.scrape(request).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.data.unwrap()[1]["title"], "Cup");
        assert_eq!(result.usage.unwrap()["records"], 2);
    }

    #[tokio::test]
    async fn test_trigger_body_merges_params() {
        let trigger_url = format!("{}/datasets/v3/trigger?dataset_id=gd_1", BASE);
        let http = MockHttpClient::new()
            .with_response(trigger_url.clone(), json!({"snapshot_id": "s_2"}))
            .with_response(
                format!("{}/datasets/v3/progress/s_2", BASE),
                json!({"status": "ready"}),
            )
            .with_response(
                format!("{}/datasets/v3/snapshot/s_2?format=json", BASE),
                json!([]),
            );
        let client = HttpScrapingClient::new(http, BASE, "token", fast_poll(1));

        let request = ScrapeRequest::new("gd_1", vec!["https://a.test".to_string()])
            .with_params(json!({"zipcode": "10001"}));
        let trigger = client.trigger(&request).await.unwrap();
        assert_eq!(trigger, "s_2");

        let (url, body) = client.client.requests()[0].clone();
        assert_eq!(url, trigger_url);
        assert_eq!(
            body.unwrap(),
            json!([{"url": "https://a.test", "zipcode": "10001"}])
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let http = MockHttpClient::new()
            .with_response(
                format!("{}/datasets/v3/trigger?dataset_id=gd_1", BASE),
                json!({"snapshot_id": "s_3"}),
            )
            .with_response(
                format!("{}/datasets/v3/progress/s_3", BASE),
                json!({"status": "running"}),
            );
        let client = HttpScrapingClient::new(http, BASE, "token", fast_poll(3));

        let result = client
            .scrape(ScrapeRequest::new("gd_1", vec!["https://a.test".to_string()]))
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("not ready after 3 attempts"));
    }

    #[tokio::test]
    async fn test_failed_snapshot() {
        let http = MockHttpClient::new()
            .with_response(
                format!("{}/datasets/v3/trigger?dataset_id=gd_1", BASE),
                json!({"snapshot_id": "s_4"}),
            )
            .with_response(
                format!("{}/datasets/v3/progress/s_4", BASE),
                json!({"status": "failed"}),
            );
        let client = HttpScrapingClient::new(http, BASE, "token", fast_poll(3));

        let result = client
            .scrape(ScrapeRequest::new("gd_1", vec!["https://a.test".to_string()]))
            .await;

        assert!(result.error.unwrap().contains("Snapshot s_4 failed"));
    }
}
