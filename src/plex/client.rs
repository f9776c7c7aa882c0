//! HTTP adapter for the origin media server and the matching service
//!
//! All metadata calls go through [`PlexClient::get_json`], which owns the
//! error classification: 401/403 become [`PlexError::Unauthorized`], other
//! statuses >= 400 carry a truncated body, and blank or undecodable bodies are
//! reported separately from transport failures.

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::PlexConfig;
use crate::errors::{PlexError, PlexResult};
use crate::models::{LibraryDirectory, MediaContainer, PlexMediaType, PlexMetadata, PlexResponse};
use crate::utils::url::{TOKEN_PARAM, UrlUtils};

/// Extras accepted by catalog listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    pub skip: u32,
    pub search: Option<String>,
    /// Origin sort key (already mapped from the display label)
    pub sort: Option<String>,
}

/// Calls the gateway makes against the origin and the matching service.
///
/// `base` is always the origin base URL from the addon configuration and
/// `token` the access token that goes with it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OriginApi: Send + Sync {
    /// Ask the matching service for the origin GUID of an external id.
    /// `Ok(None)` means the service answered but had no match.
    async fn match_external(
        &self,
        external_id: &str,
        media_type: PlexMediaType,
        token: &str,
    ) -> PlexResult<Option<String>>;

    /// Exact server-side GUID query (`/library/all?guid=`)
    async fn find_by_guid(&self, base: &str, token: &str, guid: &str)
    -> PlexResult<Vec<PlexMetadata>>;

    async fn list_sections(&self, base: &str, token: &str) -> PlexResult<Vec<LibraryDirectory>>;

    /// One page of a section listing, secondary guids included
    async fn section_page(
        &self,
        base: &str,
        token: &str,
        section: &str,
        start: u32,
        size: u32,
    ) -> PlexResult<MediaContainer>;

    /// Full metadata (stream tracks included) for a rating key
    async fn metadata(
        &self,
        base: &str,
        token: &str,
        rating_key: &str,
    ) -> PlexResult<Option<PlexMetadata>>;

    /// Flattened episode list of a series, given the series key
    async fn all_episodes(&self, base: &str, token: &str, key: &str)
    -> PlexResult<Vec<PlexMetadata>>;

    async fn section_media(
        &self,
        base: &str,
        token: &str,
        section: &str,
        query: &CatalogQuery,
    ) -> PlexResult<Vec<PlexMetadata>>;

    /// Whether the origin answers 200 for this base and token
    async fn check_connection(&self, base: &str, token: &str) -> bool;
}

/// Process-wide origin client with its connection pools
#[derive(Clone)]
pub struct PlexClient {
    http: Client,
    matching: Client,
    streaming: Client,
    matching_url: String,
    page_size: u32,
}

impl PlexClient {
    pub fn new(config: &PlexConfig) -> PlexResult<Self> {
        let user_agent = format!("plexio/{}", env!("CARGO_PKG_VERSION"));

        let http = Client::builder()
            .user_agent(&user_agent)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PlexError::Request(e.to_string()))?;

        // TLS verification is relaxed for the matching service only
        let matching = Client::builder()
            .user_agent(&user_agent)
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| PlexError::Request(e.to_string()))?;

        let streaming = Client::builder()
            .user_agent(&user_agent)
            .connect_timeout(config.request_timeout)
            .read_timeout(config.proxy_read_timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| PlexError::Request(e.to_string()))?;

        Ok(Self {
            http,
            matching,
            streaming,
            matching_url: config.matching_url.trim_end_matches('/').to_string(),
            page_size: config.scan_page_size,
        })
    }

    /// Pool used by the stream proxy: no total timeout, read-idle bound only
    pub fn streaming_client(&self) -> Client {
        self.streaming.clone()
    }

    /// GET `url` with `params` and decode the JSON envelope
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> PlexResult<T> {
        Self::fetch_json(&self.http, url, params).await
    }

    async fn fetch_json<T: DeserializeOwned>(
        client: &Client,
        url: &str,
        params: &[(&str, String)],
    ) -> PlexResult<T> {
        let log_url = UrlUtils::obfuscate_token(&UrlUtils::with_query(url, params));
        debug!("GET {}", log_url);

        let response = client
            .get(url)
            .query(params)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                let err = PlexError::from_reqwest(e);
                error!("Plex request failed for {}: {}", log_url, err);
                err
            })?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            error!("Plex rejected credentials ({}) for {}", status, log_url);
            return Err(PlexError::Unauthorized { status });
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let err = PlexError::from_status(status, &body);
            if let PlexError::UpstreamStatus { body, .. } = &err {
                error!("Plex server error: {} for {}, response: {}", status, log_url, body);
            }
            return Err(err);
        }

        let bytes = response.bytes().await.map_err(PlexError::from_reqwest)?;
        let text = String::from_utf8_lossy(&bytes);
        if text.trim().is_empty() {
            error!("Empty response from {}", log_url);
            return Err(PlexError::EmptyBody);
        }

        serde_json::from_str(&text).map_err(|e| {
            let err = PlexError::malformed_json(&e, &text);
            if let PlexError::MalformedJson { raw, .. } = &err {
                error!("JSON decode error for {}: {}, response: {}", log_url, e, raw);
            }
            err
        })
    }

    async fn container(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> PlexResult<MediaContainer> {
        let response: PlexResponse = self.get_json(url, params).await?;
        Ok(response.media_container)
    }

    fn page_params(token: &str, start: u32, size: u32) -> Vec<(&'static str, String)> {
        vec![
            ("includeGuids", "1".to_string()),
            ("X-Plex-Container-Start", start.to_string()),
            ("X-Plex-Container-Size", size.to_string()),
            (TOKEN_PARAM, token.to_string()),
        ]
    }
}

/// Episode listing URL for a series key (`/children` keys are flattened)
pub(crate) fn episodes_url(base: &str, key: &str) -> String {
    let url = UrlUtils::join(base, key);
    if url.contains("/children") {
        url.replace("/children", "/allLeaves")
    } else if url.ends_with("/allLeaves") {
        url
    } else {
        format!("{}/allLeaves", url.trim_end_matches('/'))
    }
}

/// Episodes without an index take their position in the listing. A missing
/// season index stays unset so it never matches a requested season.
pub(crate) fn number_episodes(episodes: &mut [PlexMetadata]) {
    for (position, episode) in episodes.iter_mut().enumerate() {
        if episode.index.is_none() {
            episode.index = u32::try_from(position).ok();
        }
    }
}

#[async_trait]
impl OriginApi for PlexClient {
    async fn match_external(
        &self,
        external_id: &str,
        media_type: PlexMediaType,
        token: &str,
    ) -> PlexResult<Option<String>> {
        let url = format!("{}/library/metadata/matches", self.matching_url);
        let params = [
            (TOKEN_PARAM, token.to_string()),
            ("type", media_type.matching_type_code().to_string()),
            ("title", format!("imdb-{external_id}")),
            (
                "guid",
                format!("com.plexapp.agents.imdb://{external_id}?lang=en"),
            ),
        ];
        let response: PlexResponse = Self::fetch_json(&self.matching, &url, &params).await?;
        let container = response.media_container;
        if container.total_size.unwrap_or(0) == 0 {
            return Ok(None);
        }
        Ok(container
            .metadata
            .into_iter()
            .next()
            .map(|item| item.guid)
            .filter(|guid| !guid.is_empty()))
    }

    async fn find_by_guid(
        &self,
        base: &str,
        token: &str,
        guid: &str,
    ) -> PlexResult<Vec<PlexMetadata>> {
        let url = UrlUtils::join(base, "library/all");
        let params = [("guid", guid.to_string()), (TOKEN_PARAM, token.to_string())];
        Ok(self.container(&url, &params).await?.metadata)
    }

    async fn list_sections(&self, base: &str, token: &str) -> PlexResult<Vec<LibraryDirectory>> {
        let url = UrlUtils::join(base, "library/sections");
        let params = [(TOKEN_PARAM, token.to_string())];
        Ok(self.container(&url, &params).await?.directory)
    }

    async fn section_page(
        &self,
        base: &str,
        token: &str,
        section: &str,
        start: u32,
        size: u32,
    ) -> PlexResult<MediaContainer> {
        let url = UrlUtils::join(base, &format!("library/sections/{section}/all"));
        self.container(&url, &Self::page_params(token, start, size))
            .await
    }

    async fn metadata(
        &self,
        base: &str,
        token: &str,
        rating_key: &str,
    ) -> PlexResult<Option<PlexMetadata>> {
        let url = UrlUtils::join(base, &format!("library/metadata/{rating_key}"));
        let params = [
            (TOKEN_PARAM, token.to_string()),
            ("includeElements", "Stream".to_string()),
        ];
        Ok(self.container(&url, &params).await?.metadata.into_iter().next())
    }

    async fn all_episodes(
        &self,
        base: &str,
        token: &str,
        key: &str,
    ) -> PlexResult<Vec<PlexMetadata>> {
        let url = episodes_url(base, key);
        let params = [(TOKEN_PARAM, token.to_string())];
        let mut episodes = self.container(&url, &params).await?.metadata;
        number_episodes(&mut episodes);
        Ok(episodes)
    }

    async fn section_media(
        &self,
        base: &str,
        token: &str,
        section: &str,
        query: &CatalogQuery,
    ) -> PlexResult<Vec<PlexMetadata>> {
        let url = UrlUtils::join(base, &format!("library/sections/{section}/all"));
        let mut params = Self::page_params(token, query.skip, self.page_size);
        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("title", search.to_string()));
        }
        if let Some(sort) = query.sort.as_deref() {
            params.push(("sort", sort.to_string()));
        }
        Ok(self.container(&url, &params).await?.metadata)
    }

    async fn check_connection(&self, base: &str, token: &str) -> bool {
        let result = self
            .http
            .get(base)
            .query(&[(TOKEN_PARAM, token)])
            .header(header::ACCEPT, "application/json")
            .send()
            .await;
        match result {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!(
                    "Connection check failed for {}: {}",
                    UrlUtils::obfuscate_token(base),
                    e.without_url()
                );
                false
            }
        }
    }
}
