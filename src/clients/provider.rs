//! Client for the PropertyData sales-search API.

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::constants::provider::{INCLUDE_FIELDS, REQUEST_TIMEOUT_SECONDS};
use crate::models::LookupRequest;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request timed out")]
    Timeout,

    #[error("provider returned status {status}")]
    Status { status: u16, body: String },

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("invalid provider configuration: {0}")]
    Configuration(String),
}

/// Upstream source of sold-property data.
///
/// The gateway talks to this seam rather than to a concrete client, so tests
/// can substitute a scripted source.
#[async_trait::async_trait]
pub trait PropertySource: Send + Sync {
    /// Issue exactly one search call for a validated request. No retries.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Timeout`] when the call exceeds the
    /// configured deadline, [`ProviderError::Status`] with the raw body for
    /// any non-success response, and [`ProviderError::Transport`] when the
    /// request never completes.
    async fn search_sales(&self, request: &LookupRequest) -> Result<Value, ProviderError>;
}

/// HTTP client for the hosted PropertyData API.
pub struct PropertyDataClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl PropertyDataClient {
    /// Create a client with its own connection pool and the default
    /// deadline.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let timeout = Duration::from_secs(REQUEST_TIMEOUT_SECONDS);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Soldwatch/1.0")
            .build()
            .expect("Failed to create PropertyData HTTP client");

        Self::with_shared_client(client, base_url, api_key, timeout)
    }

    /// Create a client that reuses an existing HTTP client's connection
    /// pool. Preferred when the application already holds a shared client.
    #[must_use]
    pub fn with_shared_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout,
        }
    }

    fn endpoint(&self, request: &LookupRequest) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!(
            "{}/sales/search",
            self.base_url.trim_end_matches('/')
        ))
        .map_err(|e| ProviderError::Configuration(format!("invalid base URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("postcode", &request.postcode)
                .append_pair("limit", &request.limit.to_string())
                .append_pair("period", request.timeframe.provider_period())
                .append_pair("include", INCLUDE_FIELDS);

            if let Some(min) = request.price_min {
                pairs.append_pair("price_min", &min.to_string());
            }
            if let Some(max) = request.price_max {
                pairs.append_pair("price_max", &max.to_string());
            }
        }

        Ok(url)
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(err.to_string())
    }
}

#[async_trait::async_trait]
impl PropertySource for PropertyDataClient {
    async fn search_sales(&self, request: &LookupRequest) -> Result<Value, ProviderError> {
        let url = self.endpoint(request)?;

        let send = self.client.get(url).bearer_auth(&self.api_key).send();

        // The client carries its own deadline; the outer timeout also covers
        // time spent queueing for a pooled connection.
        let response = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(transport_error(err)),
            Err(_) => return Err(ProviderError::Timeout),
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        response.json::<Value>().await.map_err(transport_error)
    }
}
