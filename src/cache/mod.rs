//! Resolved-identifier cache
//!
//! Maps an external id (`tt0903747:2:5`) to the origin id it resolved to.
//! Entries have no TTL; only successful resolutions are ever written.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::{CacheBackend, CacheConfig};
use crate::errors::{AppError, AppResult};

pub mod memory;
#[cfg(feature = "redis-cache")]
pub mod redis;

pub use memory::MemoryCache;
#[cfg(feature = "redis-cache")]
pub use self::redis::RedisCache;

/// Key-value store for resolved identifiers
#[async_trait]
pub trait IdCache: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Store a resolution. Empty values are ignored so an entry is never
    /// replaced by a null result.
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    async fn close(&self) -> AppResult<()>;
}

/// Build the configured cache backend
pub async fn build_cache(config: &CacheConfig) -> AppResult<Arc<dyn IdCache>> {
    match config.backend {
        CacheBackend::Memory => {
            info!("Using in-memory id cache (capacity {})", config.capacity);
            Ok(Arc::new(MemoryCache::new(config.capacity)))
        }
        #[cfg(feature = "redis-cache")]
        CacheBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| AppError::configuration("cache.redis_url is not set"))?;
            let cache = RedisCache::connect(url).await?;
            info!("Using redis id cache");
            Ok(Arc::new(cache))
        }
        #[cfg(not(feature = "redis-cache"))]
        CacheBackend::Redis => Err(AppError::configuration(
            "redis cache backend requires the `redis-cache` feature",
        )),
    }
}
