//! HTTP delivery of tracked intervals to a remote FocusLedger backend.
//!
//! Each interval is POSTed as JSON with an `Idempotency-Key` header equal to
//! the interval id, so redelivery after a partial sync is safe on the
//! receiving side.

use std::time::Duration;

use async_trait::async_trait;
use focusledger_core::RemoteIntervalSink;
use focusledger_domain::{LedgerError, Result as DomainResult, SyncConfig, TrackedInterval};
use reqwest::{Method, StatusCode};
use tracing::{debug, instrument};

use crate::errors::InfraError;
use crate::http::HttpClient;

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// [`RemoteIntervalSink`] that POSTs each interval to `endpoint`.
pub struct HttpIntervalSink {
    http_client: HttpClient,
    endpoint: String,
    api_token: Option<String>,
}

impl HttpIntervalSink {
    pub fn new(endpoint: impl Into<String>, http_client: HttpClient) -> Self {
        Self { http_client, endpoint: endpoint.into(), api_token: None }
    }

    /// Sink for `sync.endpoint`, or `None` when no endpoint is configured.
    pub fn from_config(config: &SyncConfig) -> DomainResult<Option<Self>> {
        let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) else {
            return Ok(None);
        };
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(LedgerError::Config(format!("sync endpoint must be http(s): {endpoint}")));
        }

        let http_client = HttpClient::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Some(Self::new(endpoint, http_client)))
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteIntervalSink for HttpIntervalSink {
    #[instrument(skip(self, interval), fields(interval_id = %interval.id))]
    async fn transmit(&self, interval: &TrackedInterval) -> DomainResult<()> {
        let mut request = self
            .http_client
            .request(Method::POST, &self.endpoint)
            .header(IDEMPOTENCY_HEADER, interval.id.to_string())
            .json(interval);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = self.http_client.send(request).await?;
        let status = response.status();

        // 409: the backend already has this idempotency key.
        if status == StatusCode::CONFLICT {
            debug!("interval already delivered");
            return Ok(());
        }

        response.error_for_status().map_err(|err| LedgerError::from(InfraError::from(err)))?;
        debug!(%status, "interval delivered");
        Ok(())
    }
}
