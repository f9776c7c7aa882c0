use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::IdCache;
use crate::errors::{AppError, AppResult};

const KEY_PREFIX: &str = "plexio:id:";

/// Shared cache backed by a redis server
pub struct RedisCache {
    redis: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AppError::configuration(format!("Invalid redis url: {e}")))?;
        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::cache(format!("Failed to connect to redis: {e}")))?;
        Ok(Self { redis })
    }

    fn key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

#[async_trait]
impl IdCache for RedisCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn
            .get(Self::key(key))
            .await
            .map_err(|e| AppError::cache(format!("redis GET failed: {e}")))?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        if value.is_empty() {
            return Ok(());
        }
        let mut conn = self.redis.clone();
        let _: () = conn
            .set(Self::key(key), value)
            .await
            .map_err(|e| AppError::cache(format!("redis SET failed: {e}")))?;
        debug!(key = %key, "Cached resolution in redis");
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        info!("Releasing redis id cache");
        Ok(())
    }
}
