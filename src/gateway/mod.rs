//! The sold-property lookup pipeline.
//!
//! One call to [`GatewayService::lookup`] runs validation, rate limiting,
//! the cache check, the provider call, normalization and insight
//! aggregation, in that order. The service owns all of its state; nothing
//! here is global.

pub mod cache;
pub mod insights;
pub mod rate_limit;
pub mod transform;
pub mod validate;

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::clients::provider::{ProviderError, PropertySource};
use crate::clock::Clock;
use crate::constants;
use crate::models::{LookupResult, Timeframe};
use cache::ResponseCache;
use rate_limit::{Admission, FixedWindowLimiter};
use validate::{FieldError, RawLookupRequest};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("provider request timed out")]
    UpstreamTimeout,

    #[error("provider returned status {status}")]
    Upstream { status: u16, body: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Unknown(String),
}

impl From<ProviderError> for GatewayError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout => Self::UpstreamTimeout,
            ProviderError::Status { status, body } => Self::Upstream { status, body },
            ProviderError::Configuration(message) => Self::Configuration(message),
            ProviderError::Transport(message) => Self::Unknown(message),
        }
    }
}

/// Tunables for one gateway instance.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub rate_limit_window_seconds: u32,
    pub rate_limit_max_requests: u32,
    pub cache_ttl_seconds: u32,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            rate_limit_window_seconds: constants::gateway::RATE_LIMIT_WINDOW_SECONDS,
            rate_limit_max_requests: constants::gateway::RATE_LIMIT_MAX_REQUESTS,
            cache_ttl_seconds: constants::gateway::CACHE_TTL_SECONDS,
        }
    }
}

/// Static contract of the lookup endpoint, served by the describe operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointMetadata {
    pub version: String,
    pub rate_limit: RateLimitInfo,
    pub cache_duration_seconds: u32,
    pub timeframes: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub max_requests: u32,
    pub window_seconds: u32,
}

/// The lookup pipeline with its owned limiter and cache state.
pub struct GatewayService {
    source: Arc<dyn PropertySource>,
    limiter: FixedWindowLimiter,
    cache: ResponseCache,
    clock: Arc<dyn Clock>,
    settings: GatewaySettings,
}

impl GatewayService {
    #[must_use]
    pub fn new(
        source: Arc<dyn PropertySource>,
        clock: Arc<dyn Clock>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            limiter: FixedWindowLimiter::new(
                settings.rate_limit_window_seconds,
                settings.rate_limit_max_requests,
                clock.clone(),
            ),
            cache: ResponseCache::new(settings.cache_ttl_seconds, clock.clone()),
            source,
            clock,
            settings,
        }
    }

    /// Run the full pipeline for one client request.
    ///
    /// Rate limiting comes before the cache check, so a hammering client is
    /// rejected even when every answer could have been served from cache. A
    /// cache hit is returned as a clone with `cached` set and a fresh
    /// timestamp; the stored entry is never touched.
    ///
    /// # Errors
    ///
    /// Any stage can fail: see [`GatewayError`] for the taxonomy.
    pub async fn lookup(
        &self,
        client_key: &str,
        raw: &RawLookupRequest,
    ) -> Result<LookupResult, GatewayError> {
        let request = validate::validate(raw).map_err(GatewayError::Validation)?;

        if let Admission::Rejected { retry_after_secs } = self.limiter.admit(client_key).await {
            metrics::counter!("lookup_rate_limited_total").increment(1);
            debug!(client = %client_key, "rate limit exceeded");
            return Err(GatewayError::RateLimited { retry_after_secs });
        }

        let key = request.cache_key();
        if let Some(mut hit) = self.cache.get(&key).await {
            metrics::counter!("lookup_cache_hits_total").increment(1);
            debug!(postcode = %request.postcode, "serving lookup from cache");
            hit.cached = true;
            hit.timestamp = self.clock.now();
            return Ok(hit);
        }
        metrics::counter!("lookup_cache_misses_total").increment(1);

        let payload = self.source.search_sales(&request).await?;

        let properties = transform::transform_payload(&payload, &request.postcode, self.clock.now());
        if properties.is_empty() {
            debug!(postcode = %request.postcode, "provider payload contained no usable records");
        }
        let insights = insights::compute_insights(&properties);

        let result = LookupResult {
            success: true,
            total: properties.len(),
            postcode: request.postcode.clone(),
            source: constants::provider::SOURCE_NAME.to_string(),
            timestamp: self.clock.now(),
            cached: false,
            properties,
            insights,
        };

        self.cache.put(key, result.clone()).await;
        Ok(result)
    }

    /// Static metadata describing the endpoint contract.
    #[must_use]
    pub fn describe(&self) -> EndpointMetadata {
        EndpointMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            rate_limit: RateLimitInfo {
                max_requests: self.settings.rate_limit_max_requests,
                window_seconds: self.settings.rate_limit_window_seconds,
            },
            cache_duration_seconds: self.settings.cache_ttl_seconds,
            timeframes: Timeframe::ALL.iter().map(|t| t.as_str()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::LookupRequest;
    use chrono::{Duration, Utc};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        payload: Value,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(payload: Value) -> Arc<Self> {
            Arc::new(Self {
                payload,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl PropertySource for StubSource {
        async fn search_sales(&self, _request: &LookupRequest) -> Result<Value, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
    }

    struct FailingSource;

    #[async_trait::async_trait]
    impl PropertySource for FailingSource {
        async fn search_sales(&self, _request: &LookupRequest) -> Result<Value, ProviderError> {
            Err(ProviderError::Timeout)
        }
    }

    fn service(source: Arc<dyn PropertySource>, clock: Arc<ManualClock>) -> GatewayService {
        GatewayService::new(source, clock, GatewaySettings::default())
    }

    fn raw_request(postcode: &str) -> RawLookupRequest {
        RawLookupRequest {
            postcode: Some(postcode.to_string()),
            ..RawLookupRequest::default()
        }
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_the_source() {
        let source = StubSource::new(json!({"data": []}));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gateway = service(source.clone(), clock);

        let err = gateway
            .lookup("client", &raw_request("junk"))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Validation(ref errors) if errors.len() == 1));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_repeat_lookup_is_served_from_cache() {
        let source = StubSource::new(json!({"data": [{"sold_price": 250_000}]}));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gateway = service(source.clone(), clock.clone());

        let first = gateway.lookup("client", &raw_request("SW1A 1AA")).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.total, 1);

        clock.advance(Duration::seconds(10));
        let second = gateway.lookup("client", &raw_request("sw1a1aa")).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.properties[0].sold_price, 250_000.0);
        assert!(second.timestamp > first.timestamp);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_mutate_stored_entry() {
        let source = StubSource::new(json!({"data": [{"sold_price": 250_000}]}));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gateway = service(source.clone(), clock.clone());

        gateway.lookup("a", &raw_request("SW1A 1AA")).await.unwrap();
        clock.advance(Duration::seconds(5));
        gateway.lookup("b", &raw_request("SW1A 1AA")).await.unwrap();
        clock.advance(Duration::seconds(5));

        // A hit after a hit still reports cached; the stored entry kept its
        // original cached=false payload rather than the flipped clone.
        let third = gateway.lookup("c", &raw_request("SW1A 1AA")).await.unwrap();
        assert!(third.cached);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_expires_after_ttl() {
        let source = StubSource::new(json!({"data": []}));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gateway = service(source.clone(), clock.clone());

        gateway.lookup("client", &raw_request("SW1A 1AA")).await.unwrap();
        clock.advance(Duration::seconds(301));

        let result = gateway.lookup("client", &raw_request("SW1A 1AA")).await.unwrap();
        assert!(!result.cached);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_applies_before_cache() {
        let source = StubSource::new(json!({"data": []}));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gateway = service(source.clone(), clock);

        for _ in 0..10 {
            gateway.lookup("client", &raw_request("SW1A 1AA")).await.unwrap();
        }

        // The answer sits in cache, but the eleventh call is still rejected.
        let err = gateway
            .lookup("client", &raw_request("SW1A 1AA"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::RateLimited { .. }));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_distinct_requests_get_distinct_cache_entries() {
        let source = StubSource::new(json!({"data": []}));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gateway = service(source.clone(), clock);

        gateway.lookup("client", &raw_request("SW1A 1AA")).await.unwrap();

        let mut narrower = raw_request("SW1A 1AA");
        narrower.limit = Some(serde_json::Number::from(5));
        let result = gateway.lookup("client", &narrower).await.unwrap();

        assert!(!result.cached);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_provider_timeout_surfaces_as_upstream_timeout() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gateway = service(Arc::new(FailingSource), clock);

        let err = gateway
            .lookup("client", &raw_request("SW1A 1AA"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamTimeout));
    }

    #[tokio::test]
    async fn test_describe_reports_contract() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gateway = service(StubSource::new(json!({})), clock);

        let metadata = gateway.describe();
        assert_eq!(metadata.rate_limit.max_requests, 10);
        assert_eq!(metadata.rate_limit.window_seconds, 60);
        assert_eq!(metadata.cache_duration_seconds, 300);
        assert_eq!(
            metadata.timeframes,
            vec!["24hours", "7days", "30days", "90days"]
        );
    }
}
