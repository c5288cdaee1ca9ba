//! Page fetching over HTTP.
//!
//! Plain GET requests with a bounded timeout, retry on 5xx and transport
//! errors, and backoff on 429. Anything that still fails, or any non-success
//! status, surfaces as [`PollError::Fetch`].

use std::time::Duration;

use async_trait::async_trait;

use crate::types::{PollError, PollResult};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

const MAX_RETRIES: u32 = 2;

/// Anything that can turn a URL into an HTML document.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> PollResult<String>;
}

/// HTTP client used against the live forum.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    backoff_base_ms: u64,
}

impl HttpClient {
    /// Create a client whose every request is capped at `timeout_ms`.
    pub fn new(timeout_ms: u64) -> PollResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PollError::fetch("<client>", e))?;

        Ok(Self {
            client,
            backoff_base_ms: 500,
        })
    }

    /// Override the base delay between retries.
    pub fn with_backoff_base(mut self, ms: u64) -> Self {
        self.backoff_base_ms = ms;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms * 2u64.pow(attempt - 1))
    }

    /// GET `url` and return the body of a successful response.
    pub async fn get(&self, url: &str) -> PollResult<String> {
        let mut retries = 0u32;

        loop {
            match self.client.get(url).send().await {
                Ok(r) => {
                    let status = r.status();

                    if status.is_server_error() && retries < MAX_RETRIES {
                        retries += 1;
                        tracing::debug!(url, %status, retries, "retrying after server error");
                        tokio::time::sleep(self.backoff(retries)).await;
                        continue;
                    }

                    if status.as_u16() == 429 && retries < MAX_RETRIES {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        tracing::debug!(url, retry_after, "rate limited");
                        tokio::time::sleep(Duration::from_secs(retry_after.min(10))).await;
                        continue;
                    }

                    if !status.is_success() {
                        return Err(PollError::fetch(url, format!("HTTP {status}")));
                    }

                    return r.text().await.map_err(|e| PollError::fetch(url, e));
                }
                Err(e) => {
                    if retries < MAX_RETRIES && !e.is_builder() {
                        retries += 1;
                        tracing::debug!(url, error = %e, retries, "retrying after transport error");
                        tokio::time::sleep(self.backoff(retries)).await;
                        continue;
                    }
                    let reason = if e.is_timeout() {
                        "request timed out".to_string()
                    } else {
                        e.to_string()
                    };
                    return Err(PollError::fetch(url, reason));
                }
            }
        }
    }
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch(&self, url: &str) -> PollResult<String> {
        self.get(url).await
    }
}
