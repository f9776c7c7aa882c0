//! Configuration default values
//!
//! All default values for configuration options live here so they can be
//! changed in one place.

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

// Origin defaults
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROXY_READ_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_MATCHING_URL: &str = "https://metadata.provider.plex.tv";
pub const DEFAULT_SCAN_PAGE_SIZE: u32 = 100;

// Cache defaults
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

// Environment
pub const ENV_PREFIX: &str = "PLEXIO_";
pub const ENV_PUBLIC_BASE_URL: &str = "PUBLIC_BASE_URL";
pub const ENV_PUBLIC_STREAMING_BASE_URL: &str = "PUBLIC_STREAMING_BASE_URL";
