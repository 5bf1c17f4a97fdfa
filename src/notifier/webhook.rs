//! Webhook notifier
//!
//! Posts release announcements as JSON payloads via HTTP POST.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::Notifier;
use crate::config::NotifierConfig;
use crate::error::{Error, Result};

/// Webhook notifier configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Webhook URL endpoint
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retry attempts on failure
    pub max_retries: u32,
}

impl WebhookConfig {
    /// Create a new webhook configuration
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: 10,
            max_retries: 3,
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::config("webhook URL cannot be empty"));
        }

        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(Error::config(
                "webhook URL must start with http:// or https://",
            ));
        }

        if self.timeout_secs == 0 {
            return Err(Error::config("webhook timeout must be greater than 0"));
        }

        Ok(())
    }
}

impl From<&NotifierConfig> for WebhookConfig {
    fn from(config: &NotifierConfig) -> Self {
        Self {
            url: config.webhook_url.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        }
    }
}

/// Webhook notification channel
///
/// Sends release announcements in the following JSON format:
///
/// ```json
/// {
///   "playlist": "Mixtape Vol. 3",
///   "representative": "dQw4w9WgXcQ",
///   "item_count": 7
/// }
/// ```
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    /// Create a new webhook notifier
    pub fn new(config: WebhookConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Create a simple webhook notifier with just a URL
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        Self::new(WebhookConfig::new(url))
    }

    /// Get the webhook URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn build_payload(
        playlist_name: &str,
        representative: Option<&str>,
        item_count: usize,
    ) -> serde_json::Value {
        serde_json::json!({
            "playlist": playlist_name,
            "representative": representative,
            "item_count": item_count,
        })
    }

    /// Send the request with retry logic (announcements are idempotent
    /// on the receiving end, so retrying is safe)
    async fn send_with_retry(&self, payload: &serde_json::Value) -> Result<()> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s...
                let delay = Duration::from_secs(2_u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
                tracing::debug!(
                    attempt = attempt + 1,
                    max = self.config.max_retries + 1,
                    "retrying webhook announcement"
                );
            }

            match self.client.post(&self.config.url).json(payload).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        tracing::info!(url = %self.config.url, status = %status, "announcement delivered");
                        return Ok(());
                    }

                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| String::from("unable to read response body"));
                    last_error = Some(Error::publish_unavailable(format!(
                        "HTTP {status}: {body}"
                    )));

                    // Don't retry on client errors (4xx)
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) => {
                    last_error = Some(Error::Http(e));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::publish_unavailable("announcement delivery failed")))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn announce(
        &self,
        playlist_name: &str,
        representative: Option<&str>,
        item_count: usize,
    ) -> Result<()> {
        let payload = Self::build_payload(playlist_name, representative, item_count);
        self.send_with_retry(&payload).await
    }
}
