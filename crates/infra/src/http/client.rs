//! Retrying HTTP client shared by the oracle and sync adapters.
//!
//! Transport failures, 5xx and 429 answers are retried under a
//! [`RetryPolicy`]; any other status goes straight back to the caller. A 429
//! carrying `Retry-After` (in seconds) waits that long, capped by the policy.

use std::time::Duration;

use focusledger_domain::LedgerError;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::errors::InfraError;

const USER_AGENT: &str = concat!("focusledger/", env!("CARGO_PKG_VERSION"));

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Never below 1.
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Wait before attempt `failed + 1`: doubling from `base_backoff`, or the
    /// server's hint when it gave one, never above `max_backoff`.
    pub fn delay_after(&self, failed: usize, server_hint: Option<Duration>) -> Duration {
        let doubling = failed.saturating_sub(1).min(16) as u32;
        let computed = self.base_backoff.saturating_mul(1u32 << doubling);
        server_hint.unwrap_or(computed).min(self.max_backoff)
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    policy: RetryPolicy,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn request<U: reqwest::IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Sends `builder`, retrying under the policy. The last response is
    /// returned whatever its status; only transport failures become errors.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, LedgerError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| LedgerError::Internal("streaming bodies cannot be retried".into()))?
                .build()
                .map_err(|err| LedgerError::from(InfraError::from(err)))?;
            let url = request.url().clone();
            let last = attempt >= attempts;

            let hint = match self.client.execute(request).await {
                Ok(response) if last || !is_retryable_status(response.status()) => {
                    debug!(attempt, %url, status = %response.status(), "HTTP response");
                    return Ok(response);
                }
                Ok(response) => {
                    warn!(attempt, %url, status = %response.status(), "retryable HTTP status");
                    retry_after(&response)
                }
                Err(err) if last || !is_retryable_error(&err) => {
                    return Err(InfraError::from(err).into());
                }
                Err(err) => {
                    warn!(attempt, %url, error = %err, "HTTP transport failure; retrying");
                    None
                }
            };

            let delay = self.policy.delay_after(attempt, hint);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}

#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    timeout: Option<Duration>,
    policy: RetryPolicy,
}

impl HttpClientBuilder {
    /// Per-attempt timeout. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.policy.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.policy.base_backoff = backoff;
        self
    }

    pub fn build(self) -> Result<HttpClient, LedgerError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(30)))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| LedgerError::from(InfraError::from(err)))?;
        Ok(HttpClient { client, policy: self.policy })
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

fn retry_after(response: &Response) -> Option<Duration> {
    let seconds = response.headers().get(RETRY_AFTER)?.to_str().ok()?.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}
