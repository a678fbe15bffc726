use std::sync::Arc;
use std::time::Duration;

use crate::clients::provider::{PropertyDataClient, PropertySource};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::gateway::{GatewayService, GatewaySettings};

/// Build a shared HTTP client with reasonable defaults for API calls.
/// Reusing one client keeps connection pooling effective and avoids socket
/// exhaustion.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent("Soldwatch/1.0")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Config,

    pub gateway: Arc<GatewayService>,
}

impl SharedState {
    /// Wire up the live gateway: real provider client, system clock.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_overrides(config, None, Arc::new(SystemClock))
    }

    /// Construction seam for tests: substitute the upstream source and the
    /// clock while keeping the rest of the wiring identical.
    pub fn with_overrides(
        config: Config,
        source: Option<Arc<dyn PropertySource>>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let source = match source {
            Some(source) => source,
            None => {
                let timeout_seconds = config.provider.request_timeout_seconds;
                let http_client = build_shared_http_client(timeout_seconds)?;
                Arc::new(PropertyDataClient::with_shared_client(
                    http_client,
                    config.provider.base_url.clone(),
                    config.provider.api_key.clone(),
                    Duration::from_secs(timeout_seconds),
                )) as Arc<dyn PropertySource>
            }
        };

        let settings = GatewaySettings {
            rate_limit_window_seconds: config.gateway.rate_limit_window_seconds,
            rate_limit_max_requests: config.gateway.rate_limit_max_requests,
            cache_ttl_seconds: config.gateway.cache_ttl_seconds,
        };

        let gateway = Arc::new(GatewayService::new(source, clock, settings));

        Ok(Self { config, gateway })
    }
}
