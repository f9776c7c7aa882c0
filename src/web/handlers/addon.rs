//! Stremio addon protocol handlers: manifest, catalog, meta and streams

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult, PlexError};
use crate::models::{
    CatalogManifest, CatalogResponse, Manifest, ManifestBehaviorHints, MediaIdentifier, Meta,
    MetaPreview, MetaResponse, StreamsResponse, StremioMediaType, VideoMeta, plexio_id_to_guid,
};
use crate::plex::CatalogQuery;
use crate::plex::library::{self, DEFAULT_SORT, sort_key, sort_labels};
use crate::streaming::{UrlRewrite, public_streaming_base_url, streams_for};
use crate::web::AppState;
use crate::web::extractors::{CatalogPath, Installation, ResourcePath};

pub const ADDON_ID: &str = "com.stremio.plexio";
const ADDON_DESCRIPTION: &str = "Play movies and series from plex.tv.";
const CONTACT_EMAIL: &str = "support@plexio.stream";

/// Manifest for an installation, or the unconfigured one when `None`
pub fn build_manifest(installation: Option<&Installation>) -> Manifest {
    let mut description = ADDON_DESCRIPTION.to_string();
    let mut catalogs = Vec::new();
    let name = match installation {
        Some(installation) => {
            let config = &installation.config;
            catalogs = config
                .sections
                .iter()
                .map(|section| CatalogManifest {
                    id: section.key.clone(),
                    media_type: StremioMediaType::from_plex(section.section_type),
                    name: config.catalog_name(section),
                    extra: vec![
                        json!({"name": "skip", "isRequired": false}),
                        json!({"name": "search", "isRequired": false}),
                        json!({"name": "sort", "options": sort_labels()}),
                    ],
                })
                .collect();
            description.push_str(&format!(" Your installation ID: {}", installation.id));
            config.display_name()
        }
        None => "Plexio".to_string(),
    };

    Manifest {
        id: ADDON_ID.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        name,
        description,
        resources: vec![
            json!("stream"),
            json!("catalog"),
            json!({
                "name": "meta",
                "types": ["movie", "series"],
                "idPrefixes": ["plexio"],
            }),
        ],
        types: vec![StremioMediaType::Movie, StremioMediaType::Series],
        catalogs,
        id_prefixes: vec!["tt".to_string(), "plexio".to_string()],
        behavior_hints: ManifestBehaviorHints {
            configurable: true,
            configuration_required: installation.is_none(),
        },
        contact_email: CONTACT_EMAIL.to_string(),
    }
}

pub async fn manifest() -> Json<Manifest> {
    Json(build_manifest(None))
}

pub async fn installation_manifest(installation: Installation) -> Json<Manifest> {
    Json(build_manifest(Some(&installation)))
}

/// Rejected credentials mean the installation must be reconfigured
fn note_rejected_token(error: &PlexError) {
    if error.is_unauthorized() {
        warn!("Origin rejected the access token; reinstall the addon with fresh credentials");
    }
}

/// Catalog extras from the `search=…&skip=…&sort=…` path segment
fn catalog_query(extra: &str) -> CatalogQuery {
    let mut query = CatalogQuery::default();
    let mut sort_label = DEFAULT_SORT.to_string();

    for (key, value) in url::form_urlencoded::parse(extra.as_bytes()) {
        match key.as_ref() {
            "skip" => query.skip = value.parse().unwrap_or(0),
            "search" => query.search = Some(value.into_owned()).filter(|s| !s.is_empty()),
            "sort" => sort_label = value.into_owned(),
            other => debug!("Ignoring catalog extra {}", other),
        }
    }

    query.sort = sort_key(&sort_label).map(str::to_string);
    query
}

pub async fn catalog(
    State(state): State<AppState>,
    installation: Installation,
    Path(path): Path<CatalogPath>,
) -> AppResult<Json<CatalogResponse>> {
    path.stremio_type()?;
    let (catalog_id, extra) = path.catalog_and_extra();
    let query = catalog_query(extra);
    let config = &installation.config;

    let items = state
        .origin
        .section_media(
            config.discovery_base(),
            &config.access_token,
            catalog_id,
            &query,
        )
        .await
        .inspect_err(note_rejected_token)?;

    Ok(Json(CatalogResponse {
        metas: items
            .iter()
            .map(|item| MetaPreview::from_plex(item, config))
            .collect(),
    }))
}

pub async fn meta(
    State(state): State<AppState>,
    installation: Installation,
    Path(path): Path<ResourcePath>,
) -> AppResult<Json<MetaResponse>> {
    let stremio_type = path.stremio_type()?;
    let id = path.resource_id();
    let guid = plexio_id_to_guid(id).ok_or_else(|| AppError::not_found("meta", id))?;
    let config = &installation.config;
    let base = config.discovery_base();
    let token = config.access_token.as_str();

    let item = library::get_media(state.origin.as_ref(), base, token, &guid, true)
        .await
        .inspect_err(note_rejected_token)?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::not_found("meta", id))?;

    let mut meta = Meta::from_plex(&item, config);
    if stremio_type == StremioMediaType::Series {
        let episodes = match item.key.as_deref() {
            Some(key) => state
                .origin
                .all_episodes(base, token, key)
                .await
                .inspect_err(note_rejected_token)?,
            None => Vec::new(),
        };
        meta.videos = Some(
            episodes
                .iter()
                .map(|episode| VideoMeta::from_episode(episode, config))
                .collect(),
        );
    }

    Ok(Json(MetaResponse { meta }))
}

pub async fn streams(
    State(state): State<AppState>,
    installation: Installation,
    Path(path): Path<ResourcePath>,
    headers: HeaderMap,
) -> AppResult<Json<StreamsResponse>> {
    let media_type = path.stremio_type()?.to_plex();
    let request_id = path.resource_id();
    let config = &installation.config;
    let base = config.discovery_base();
    let token = config.access_token.as_str();

    let guid = match MediaIdentifier::from_request_id(request_id, media_type) {
        Some(MediaIdentifier::External(_)) => {
            match state
                .resolver
                .resolve(base, token, request_id, media_type)
                .await
                .inspect_err(note_rejected_token)?
            {
                Some(guid) => guid,
                None => {
                    info!("No origin id found for {}", request_id);
                    return Ok(Json(StreamsResponse::default()));
                }
            }
        }
        Some(MediaIdentifier::Origin(guid)) => guid,
        None => {
            debug!("Unparseable stream id {}", request_id);
            return Ok(Json(StreamsResponse::default()));
        }
    };

    let media = library::get_media(state.origin.as_ref(), base, token, &guid, false)
        .await
        .inspect_err(note_rejected_token)?;
    if media.is_empty() {
        info!("No media found for {}", guid);
        return Ok(Json(StreamsResponse::default()));
    }

    let rewrite = UrlRewrite::new(
        public_streaming_base_url(&headers, &state.config.web),
        Some(installation.proxy_prefix()),
    );
    let streams: Vec<_> = media
        .iter()
        .flat_map(|item| streams_for(item, config, &rewrite))
        .collect();
    debug!(
        "Built {} streams for {} ({} media items, proxied: {})",
        streams.len(),
        guid,
        media.len(),
        rewrite.is_active()
    );

    Ok(Json(StreamsResponse { streams }))
}
