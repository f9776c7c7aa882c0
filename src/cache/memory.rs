use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;

use super::IdCache;
use crate::errors::AppResult;

/// Bounded in-process cache, least recently used entries evicted first
pub struct MemoryCache {
    entries: Mutex<LruCache<String, String>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl IdCache for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        if value.is_empty() {
            return Ok(());
        }
        self.entries
            .lock()
            .await
            .put(key.to_string(), value.to_string());
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        self.entries.lock().await.clear();
        Ok(())
    }
}
