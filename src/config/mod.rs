use anyhow::{Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub plex: PlexConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL for addon responses (behind a tunnel or reverse proxy)
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// Separate base for proxied stream URLs; falls back to `public_base_url`
    #[serde(default)]
    pub public_streaming_base_url: Option<String>,
    /// Allowed CORS origins; any origin when unset
    #[serde(default)]
    pub cors_origin_regex: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlexConfig {
    /// Total timeout for metadata calls against the origin
    #[serde(default = "default_request_timeout", with = "duration_serde::duration")]
    pub request_timeout: Duration,
    /// Base of the metadata-matching service
    #[serde(default = "default_matching_url")]
    pub matching_url: String,
    /// Dedicated credential for the matching service; the addon access token
    /// is used when absent
    #[serde(default)]
    pub matching_token: Option<String>,
    /// Read-idle timeout for proxied transfers (no total timeout applies)
    #[serde(
        default = "default_proxy_read_timeout",
        with = "duration_serde::duration"
    )]
    pub proxy_read_timeout: Duration,
    /// Page size used when scanning library sections
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Maximum entries held by the in-memory backend
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub redis_url: Option<String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
}

fn default_proxy_read_timeout() -> Duration {
    Duration::from_secs(DEFAULT_PROXY_READ_TIMEOUT_SECS)
}

fn default_matching_url() -> String {
    DEFAULT_MATCHING_URL.to_string()
}

fn default_scan_page_size() -> u32 {
    DEFAULT_SCAN_PAGE_SIZE
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
            public_streaming_base_url: None,
            cors_origin_regex: None,
        }
    }
}

impl Default for PlexConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            matching_url: default_matching_url(),
            matching_token: None,
            proxy_read_timeout: default_proxy_read_timeout(),
            scan_page_size: default_scan_page_size(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            capacity: default_cache_capacity(),
            redis_url: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    /// Defaults, then the TOML file (when present), then `PLEXIO_*` variables.
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if Path::new(config_file).exists() {
            info!("Loading configuration from: {}", config_file);
        } else {
            info!("Config file {} not found, using defaults and environment", config_file);
        }

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: Config = figment.extract()?;
        config.apply_legacy_env();
        config.validate()?;
        Ok(config)
    }

    /// Honour the unprefixed public URL variables older deployments set.
    fn apply_legacy_env(&mut self) {
        if self.web.public_base_url.is_none() {
            self.web.public_base_url = non_empty_env(ENV_PUBLIC_BASE_URL);
        }
        if self.web.public_streaming_base_url.is_none() {
            self.web.public_streaming_base_url = non_empty_env(ENV_PUBLIC_STREAMING_BASE_URL);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.backend == CacheBackend::Redis && self.cache.redis_url.is_none() {
            bail!("cache.backend = \"redis\" requires cache.redis_url");
        }
        if self.cache.capacity == 0 {
            bail!("cache.capacity must be greater than zero");
        }
        if self.plex.scan_page_size == 0 {
            bail!("plex.scan_page_size must be greater than zero");
        }
        if let Some(pattern) = &self.web.cors_origin_regex {
            if let Err(e) = regex::Regex::new(pattern) {
                bail!("web.cors_origin_regex is not a valid pattern: {}", e);
            }
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}
