//! Process-wide resources: origin client pools and the id cache
//!
//! Created once at startup and closed once after the HTTP server stops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::cache::{IdCache, build_cache};
use crate::config::Config;
use crate::errors::AppResult;
use crate::plex::{OriginApi, PlexClient};
use crate::streaming::{HttpTransport, ProxyTransport};
use crate::web::AppState;

pub struct AppResources {
    config: Arc<Config>,
    origin: Arc<dyn OriginApi>,
    cache: Arc<dyn IdCache>,
    transport: Arc<dyn ProxyTransport>,
    closed: AtomicBool,
}

impl AppResources {
    pub async fn startup(config: &Config) -> AppResult<Self> {
        let client = PlexClient::new(&config.plex)?;
        let transport: Arc<dyn ProxyTransport> =
            Arc::new(HttpTransport::new(client.streaming_client()));
        let cache = build_cache(&config.cache).await?;
        info!("Origin client pools and id cache ready");

        Ok(Self::from_parts(
            config.clone(),
            Arc::new(client),
            cache,
            transport,
        ))
    }

    /// Assemble from already-built parts
    pub fn from_parts(
        config: Config,
        origin: Arc<dyn OriginApi>,
        cache: Arc<dyn IdCache>,
        transport: Arc<dyn ProxyTransport>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            origin,
            cache,
            transport,
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.config.clone(),
            self.origin.clone(),
            self.cache.clone(),
            self.transport.clone(),
        )
    }

    /// Close the cache; later calls are no-ops
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.cache.close().await {
            Ok(()) => info!("Id cache closed"),
            Err(e) => warn!("Failed to close id cache: {}", e),
        }
    }
}
