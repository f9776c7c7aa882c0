//! Stremio addon protocol response shapes

use serde::Serialize;
use serde_json::Value;

use super::{AddonConfiguration, PlexMetadata, StremioMediaType, guid_to_plexio_id};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub resources: Vec<Value>,
    pub types: Vec<StremioMediaType>,
    pub catalogs: Vec<CatalogManifest>,
    pub id_prefixes: Vec<String>,
    pub behavior_hints: ManifestBehaviorHints,
    pub contact_email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestBehaviorHints {
    pub configurable: bool,
    pub configuration_required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogManifest {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: StremioMediaType,
    pub name: String,
    pub extra: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaPreview {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: StremioMediaType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<f64>,
    pub description: String,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: StremioMediaType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<f64>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<VideoMeta>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoMeta {
    pub id: String,
    pub title: String,
    pub released: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub episode: u32,
    pub season: u32,
    pub overview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subtitle {
    pub id: String,
    pub lang: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamBehaviorHints {
    pub binge_group: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtitles: Vec<Subtitle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior_hints: Option<StreamBehaviorHints>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamsResponse {
    pub streams: Vec<Stream>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogResponse {
    pub metas: Vec<MetaPreview>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetaResponse {
    pub meta: Meta,
}

impl MetaPreview {
    /// Catalog entry; items carrying an IMDB guid are listed under that id
    /// so other addons can serve them too.
    pub fn from_plex(item: &PlexMetadata, config: &AddonConfiguration) -> Self {
        let id = match item.imdb_id() {
            Some(imdb) => imdb.to_string(),
            None if item.guid.contains("://") => guid_to_plexio_id(&item.guid),
            None => item.guid.clone(),
        };

        Self {
            id,
            media_type: StremioMediaType::from_plex(item.media_type),
            name: item.title.clone(),
            release_info: item.year.map(|y| y.to_string()),
            poster: item.thumb.as_deref().map(|t| config.artwork_url(t)),
            imdb_rating: item.audience_rating,
            description: item.summary.clone(),
            genres: genre_names(item),
        }
    }
}

impl Meta {
    pub fn from_plex(item: &PlexMetadata, config: &AddonConfiguration) -> Self {
        Self {
            id: guid_to_plexio_id(&item.guid),
            media_type: StremioMediaType::from_plex(item.media_type),
            name: item.title.clone(),
            release_info: Some(item.display_year()),
            imdb_rating: item.audience_rating,
            description: item.summary.clone(),
            poster: item.thumb.as_deref().map(|t| config.artwork_url(t)),
            background: item
                .art
                .as_deref()
                .or(item.thumb.as_deref())
                .map(|a| config.artwork_url(a)),
            genres: genre_names(item),
            videos: None,
        }
    }
}

impl VideoMeta {
    pub fn from_episode(episode: &PlexMetadata, config: &AddonConfiguration) -> Self {
        let released = match episode.originally_available_at.as_deref() {
            Some(date) if !date.is_empty() => format!("{date}T00:00:00.000Z"),
            _ => chrono::DateTime::from_timestamp(episode.added_at, 0)
                .unwrap_or_default()
                .format("%Y-%m-%dT%H:%M:%S%.6fZ")
                .to_string(),
        };

        Self {
            id: guid_to_plexio_id(&episode.guid),
            title: episode.title.clone(),
            released,
            thumbnail: episode.thumb.as_deref().map(|t| config.artwork_url(t)),
            episode: episode.index.unwrap_or(0),
            season: episode.parent_index.unwrap_or(0),
            overview: episode.summary.clone(),
        }
    }
}

fn genre_names(item: &PlexMetadata) -> Vec<String> {
    item.genres.iter().map(|g| g.tag.clone()).collect()
}
