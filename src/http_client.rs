use anyhow::Context;
use reqwest::{Client, Request, Response};
use serde::de::DeserializeOwned;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::time::Duration;

use crate::error::{Result, SyncError};

/// HTTP client for the intra API with retry logic
pub struct IntraHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// API host, without trailing slash
    base_url: String,

    /// Total attempts for retryable failures
    max_attempts: u32,

    /// Base delay for exponential backoff (milliseconds)
    base_delay_ms: u64,
}

impl IntraHttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, request_timeout: u64, max_attempts: u32) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(request_timeout.min(10)))
            .timeout(Duration::from_secs(request_timeout))
            .user_agent(concat!("intra-progress/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_attempts: max_attempts.max(1),
            base_delay_ms: 1000, // 1 second base delay
        })
    }

    /// Override the backoff base delay
    pub fn with_base_delay(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET a JSON document with a bearer token
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<T> {
        let request = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .query(query)
            .build()
            .context("Failed to build GET request")?;

        let response = self.send_with_retry(request).await?;
        let body = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))?;
        Ok(body)
    }

    /// POST a form-encoded body and parse the JSON answer
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        let request = self
            .client
            .post(self.url(path))
            .form(form)
            .build()
            .context("Failed to build POST request")?;

        let response = self.send_with_retry(request).await?;
        let body = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))?;
        Ok(body)
    }

    /// Execute a request, retrying 429, 5xx and connection failures
    /// with exponential backoff. Other non-2xx statuses fail immediately.
    pub async fn send_with_retry(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();
        let mut attempt: u32 = 1;

        tracing::debug!(method = %method, url = %url, "Sending HTTP request");

        loop {
            let req = request.try_clone().ok_or_else(|| {
                SyncError::Internal(anyhow::anyhow!("Request body is not cloneable"))
            })?;

            let error_message = match self.client.execute(req).await {
                Ok(response) => {
                    let status = response.status();
                    tracing::debug!(status = %status, attempt, "Received HTTP response");

                    if status.is_success() {
                        return Ok(response);
                    }

                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    let error_text = response.text().await.unwrap_or_default();

                    if !retryable {
                        tracing::error!(
                            status = status.as_u16(),
                            url = %url,
                            response_body = %error_text,
                            "HTTP request failed with error response"
                        );
                        return Err(SyncError::Api {
                            status: status.as_u16(),
                            message: error_text,
                        });
                    }

                    format!("{} {}", status, error_text)
                }
                Err(e) => {
                    let error_kind = if e.is_timeout() {
                        "timeout"
                    } else if e.is_connect() {
                        "connection_failed"
                    } else if e.is_request() {
                        "request_error"
                    } else {
                        "unknown"
                    };

                    tracing::warn!(
                        error_kind = error_kind,
                        error = %e,
                        url = %url,
                        attempt,
                        "HTTP request error"
                    );
                    format!("{} (kind: {})", e, error_kind)
                }
            };

            if attempt >= self.max_attempts {
                tracing::error!(
                    url = %url,
                    total_attempts = attempt,
                    "HTTP request failed after all retries"
                );
                return Err(SyncError::Transient {
                    attempts: attempt,
                    message: error_message,
                });
            }

            let delay = self.calculate_backoff_delay(attempt - 1);
            tracing::warn!(
                "{} {} failed ({}), retrying after {}ms (attempt {}/{})",
                method,
                url,
                error_message,
                delay,
                attempt,
                self.max_attempts
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
            attempt += 1;
        }
    }

    /// Calculate exponential backoff delay: base * 2^retry plus up to 10% jitter
    fn calculate_backoff_delay(&self, retry: u32) -> u64 {
        let delay = self.base_delay_ms.saturating_mul(2_u64.saturating_pow(retry));
        let jitter_permille = RandomState::new().build_hasher().finish() % 100;
        delay + delay * jitter_permille / 1000
    }
}
