use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub provider: ProviderConfig,

    pub gateway: GatewayConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    #[serde(default)]
    pub suppress_connection_errors: bool,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            suppress_connection_errors: false,
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Trusted proxy IP addresses allowed to provide forwarded client IP headers.
    ///
    /// When empty, forwarded headers are ignored for rate-limiting identity and
    /// the socket peer address is used.
    pub trusted_proxy_ips: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7070,
            cors_allowed_origins: vec![
                "http://localhost:7070".to_string(),
                "http://127.0.0.1:7070".to_string(),
            ],
            trusted_proxy_ips: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,

    /// Bearer credential for the PropertyData API. Usually supplied via the
    /// `PROPERTYDATA_API_KEY` environment variable rather than this file.
    pub api_key: String,

    /// Hard deadline for one provider call in seconds (default: 10)
    pub request_timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.propertydata.co.uk/v1".to_string(),
            api_key: String::new(),
            request_timeout_seconds: constants::provider::REQUEST_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Requests admitted per client within one rate-limit window (default: 10)
    pub rate_limit_max_requests: u32,

    /// Length of the fixed rate-limit window in seconds (default: 60)
    pub rate_limit_window_seconds: u32,

    /// How long a lookup result stays servable from cache in seconds (default: 300)
    pub cache_ttl_seconds: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rate_limit_max_requests: constants::gateway::RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window_seconds: constants::gateway::RATE_LIMIT_WINDOW_SECONDS,
            cache_ttl_seconds: constants::gateway::CACHE_TTL_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "soldwatch".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            gateway: GatewayConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment wins over file values for the provider credential.
    fn apply_env_overrides(&mut self) {
        if let Ok(api_key) = std::env::var("PROPERTYDATA_API_KEY")
            && !api_key.trim().is_empty()
        {
            self.provider.api_key = api_key;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("soldwatch").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".soldwatch").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider.api_key.trim().is_empty() {
            anyhow::bail!(
                "Provider API key is not set. Set PROPERTYDATA_API_KEY or provider.api_key in config.toml"
            );
        }

        if self.provider.base_url.trim().is_empty() {
            anyhow::bail!("Provider base URL cannot be empty");
        }

        if self.provider.request_timeout_seconds == 0 {
            anyhow::bail!("Provider request timeout must be > 0");
        }

        if self.gateway.rate_limit_max_requests == 0 || self.gateway.rate_limit_window_seconds == 0
        {
            anyhow::bail!("Rate limit threshold and window must both be > 0");
        }

        if self.gateway.cache_ttl_seconds == 0 {
            anyhow::bail!("Cache TTL must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 7070);
        assert_eq!(config.gateway.rate_limit_max_requests, 10);
        assert_eq!(config.gateway.rate_limit_window_seconds, 60);
        assert_eq!(config.gateway.cache_ttl_seconds, 300);
        assert_eq!(config.provider.request_timeout_seconds, 10);
        assert!(config.provider.api_key.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[provider]"));
        assert!(toml_str.contains("[gateway]"));
        assert!(toml_str.contains("[observability]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [provider]
            api_key = "pk_live_123"

            [gateway]
            cache_ttl_seconds = 60
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.api_key, "pk_live_123");
        assert_eq!(config.gateway.cache_ttl_seconds, 60);
        // Untouched sections keep their defaults.
        assert_eq!(config.gateway.rate_limit_max_requests, 10);
        assert_eq!(config.server.port, 7070);
    }

    #[test]
    fn test_config_round_trips_through_file() {
        let path =
            std::env::temp_dir().join(format!("soldwatch-config-{}.toml", std::process::id()));

        let mut config = Config::default();
        config.provider.api_key = "pk_test_456".to_string();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.provider.api_key, "pk_test_456");
        assert_eq!(loaded.server.port, 7070);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("API key"));

        let mut config = Config::default();
        config.provider.api_key = "pk_live_123".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_tunables() {
        let mut config = Config::default();
        config.provider.api_key = "pk_live_123".to_string();
        config.gateway.rate_limit_window_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.provider.api_key = "pk_live_123".to_string();
        config.gateway.cache_ttl_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.provider.api_key = "pk_live_123".to_string();
        config.provider.request_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }
}
