//! Web layer module
//!
//! This module provides the HTTP interface of the gateway: the Stremio addon
//! routes, the stream proxy and the configuration-page helpers.
//!
//! # Architecture
//!
//! - **Handlers**: HTTP request handlers organized by surface
//! - **Extractors**: decoding of the per-installation path prefix
//! - **Responses**: error to JSON mapping
//!
//! Handlers stay thin: identifier resolution lives in [`crate::plex`],
//! playback URLs and proxying in [`crate::streaming`].

use anyhow::Result;
use axum::{
    Router,
    http::{HeaderValue, request::Parts},
    routing::get,
};
use regex::Regex;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::cache::IdCache;
use crate::config::{Config, WebConfig};
use crate::plex::{OriginApi, Resolver};
use crate::streaming::{ProxyTransport, StreamProxy};

pub mod extractors;
pub mod handlers;
pub mod responses;

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &Config, state: AppState) -> Result<Self> {
        let app = Self::create_router(state);
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        let cors = cors_layer(&state.config.web);

        Router::new()
            .route("/health", get(handlers::health::health_check))
            .nest("/api/v1", Self::api_v1_routes())
            // Stremio addon protocol
            .route("/manifest.json", get(handlers::addon::manifest))
            .route(
                "/{installation_id}/{cfg}/manifest.json",
                get(handlers::addon::installation_manifest),
            )
            .route(
                "/{installation_id}/{cfg}/catalog/{media_type}/{*rest}",
                get(handlers::addon::catalog),
            )
            .route(
                "/{installation_id}/{cfg}/meta/{media_type}/{*id}",
                get(handlers::addon::meta),
            )
            .route(
                "/{installation_id}/{cfg}/stream/{media_type}/{*id}",
                get(handlers::addon::streams),
            )
            // Stream proxy
            .route(
                "/{installation_id}/{cfg}/proxy",
                get(handlers::proxy::proxy_stream).head(handlers::proxy::proxy_stream),
            )
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(state)
    }

    fn api_v1_routes() -> Router<AppState> {
        Router::new()
            .route(
                "/test-connection",
                get(handlers::configuration::test_connection),
            )
            .route("/sections", get(handlers::configuration::sections))
    }

    /// Start the web server
    pub async fn serve(self) -> Result<()> {
        let (ready_tx, _ready_rx) = tokio::sync::oneshot::channel();
        self.serve_with_signal(ready_tx).await
    }

    /// Serve until Ctrl-C or SIGTERM, notifying once the listener is bound
    /// (or failed to bind)
    pub async fn serve_with_signal(
        self,
        ready_signal: tokio::sync::oneshot::Sender<Result<()>>,
    ) -> Result<()> {
        match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => {
                let _ = ready_signal.send(Ok(()));
                axum::serve(listener, self.app)
                    .with_graceful_shutdown(shutdown_signal())
                    .await?;
                info!("Web server stopped");
                Ok(())
            }
            Err(bind_error) => {
                let bind_err_msg = format!("Failed to bind to {}: {}", self.addr, bind_error);
                let _ = ready_signal.send(Err(anyhow::anyhow!("{}", bind_err_msg)));
                Err(anyhow::anyhow!("{}", bind_err_msg))
            }
        }
    }

    /// Get the host address
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down gracefully"),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully"),
    }
}

/// Origins matching `cors_origin_regex` are mirrored with credentials
/// allowed; without a pattern any origin is accepted
fn cors_layer(web: &WebConfig) -> CorsLayer {
    let pattern = web
        .cors_origin_regex
        .as_deref()
        .and_then(|p| match Regex::new(p) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!("Ignoring invalid cors_origin_regex {}: {}", p, e);
                None
            }
        });

    match pattern {
        Some(regex) => CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &Parts| {
                    origin.to_str().is_ok_and(|o| regex.is_match(o))
                },
            ))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true),
        None => CorsLayer::permissive(),
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub origin: Arc<dyn OriginApi>,
    pub resolver: Resolver,
    pub proxy: StreamProxy,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        origin: Arc<dyn OriginApi>,
        cache: Arc<dyn IdCache>,
        transport: Arc<dyn ProxyTransport>,
    ) -> Self {
        let resolver = Resolver::new(origin.clone(), cache, &config.plex);
        Self {
            config,
            origin,
            resolver,
            proxy: StreamProxy::new(transport),
        }
    }
}
