//! Plex JSON envelope types
//!
//! Every origin endpoint answers `{"MediaContainer": {...}}`; only the fields
//! the gateway reads are modelled. Unknown fields are ignored.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::PlexMediaType;

// Plex is inconsistent about quoting numeric ids
fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(serde::de::Error::custom("expected string or number")),
    }
}

fn deserialize_lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlexResponse {
    #[serde(rename = "MediaContainer", default)]
    pub media_container: MediaContainer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaContainer {
    #[serde(default)]
    pub total_size: Option<u64>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<PlexMetadata>,
    #[serde(rename = "Directory", default)]
    pub directory: Vec<LibraryDirectory>,
}

/// Library section as listed by `/library/sections`
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq)]
pub struct LibraryDirectory {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: PlexMediaType,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GuidRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Tag {
    pub tag: String,
}

/// A single item from `Metadata[]`: movie, show, episode (or anything else the
/// origin lists, which callers skip).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlexMetadata {
    #[serde(default)]
    pub guid: String,
    #[serde(rename = "type", default)]
    pub media_type: PlexMediaType,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    pub rating_key: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub library_section_title: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub added_at: i64,
    #[serde(default)]
    pub audience_rating: Option<f64>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub art: Option<String>,
    #[serde(default)]
    pub originally_available_at: Option<String>,
    #[serde(default)]
    pub grandparent_title: Option<String>,
    #[serde(default)]
    pub parent_title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_u32")]
    pub index: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_lenient_u32")]
    pub parent_index: Option<u32>,
    #[serde(rename = "Guid", default)]
    pub guids: Vec<GuidRef>,
    #[serde(rename = "Genre", default)]
    pub genres: Vec<Tag>,
    #[serde(rename = "Media", default)]
    pub media: Vec<PlexMedia>,
}

/// One encoding of an item (a movie can have several versions)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlexMedia {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    pub video_resolution: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(rename = "Part", default)]
    pub parts: Vec<PlexPart>,
}

/// Physical file backing a media version
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlexPart {
    pub key: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(rename = "Stream", default)]
    pub streams: Vec<PlexStream>,
}

pub const STREAM_TYPE_AUDIO: u8 = 2;
pub const STREAM_TYPE_SUBTITLE: u8 = 3;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlexStream {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub stream_type: u8,
    #[serde(default)]
    pub language_tag: Option<String>,
    #[serde(default)]
    pub display_title: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

impl PlexMetadata {
    /// Secondary identifiers (`imdb://tt…`, `tmdb://…`)
    pub fn has_guid(&self, id: &str) -> bool {
        self.guids.iter().any(|g| g.id == id)
    }

    /// Primary identifier, falling back to the item key when the origin
    /// omits the guid
    pub fn primary_id(&self) -> Option<String> {
        if !self.guid.is_empty() {
            Some(self.guid.clone())
        } else {
            self.key.clone().filter(|k| !k.is_empty())
        }
    }

    /// Last `imdb://` secondary guid, without the scheme
    pub fn imdb_id(&self) -> Option<&str> {
        self.guids
            .iter()
            .rev()
            .find_map(|g| g.id.strip_prefix("imdb://"))
    }

    /// Release year, falling back to the year the item was added
    pub fn display_year(&self) -> String {
        match self.year {
            Some(year) => year.to_string(),
            None => chrono::DateTime::from_timestamp(self.added_at, 0)
                .map(|dt| dt.format("%Y").to_string())
                .unwrap_or_default(),
        }
    }
}

impl PlexMedia {
    pub fn first_part(&self) -> Option<&PlexPart> {
        self.parts.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_envelope_with_mixed_id_types() {
        let json = r#"{
            "MediaContainer": {
                "totalSize": 2,
                "Metadata": [
                    {
                        "guid": "plex://movie/5d776",
                        "type": "movie",
                        "title": "Heat",
                        "ratingKey": 1234,
                        "Guid": [{"id": "imdb://tt0113277"}, {"id": "tmdb://949"}],
                        "Media": [{
                            "videoResolution": 1080,
                            "width": 1920,
                            "Part": [{"key": "/library/parts/1/file.mkv", "file": "/data/Heat.mkv", "size": 1024}]
                        }]
                    },
                    {"guid": "plex://artist/1", "type": "artist", "title": "Band"}
                ]
            }
        }"#;

        let response: PlexResponse = serde_json::from_str(json).unwrap();
        let container = response.media_container;
        assert_eq!(container.total_size, Some(2));
        assert_eq!(container.metadata.len(), 2);

        let movie = &container.metadata[0];
        assert_eq!(movie.media_type, PlexMediaType::Movie);
        assert_eq!(movie.rating_key.as_deref(), Some("1234"));
        assert_eq!(movie.imdb_id(), Some("tt0113277"));
        assert!(movie.has_guid("tmdb://949"));
        assert_eq!(movie.media[0].video_resolution.as_deref(), Some("1080"));

        assert_eq!(container.metadata[1].media_type, PlexMediaType::Other);
    }

    #[test]
    fn test_empty_container_defaults() {
        let response: PlexResponse = serde_json::from_str(r#"{"MediaContainer": {}}"#).unwrap();
        assert!(response.media_container.metadata.is_empty());
        assert!(response.media_container.directory.is_empty());
        assert_eq!(response.media_container.total_size, None);
    }

    #[test]
    fn test_primary_id_falls_back_to_key() {
        let item = PlexMetadata {
            key: Some("/library/metadata/7".to_string()),
            ..Default::default()
        };
        assert_eq!(item.primary_id().as_deref(), Some("/library/metadata/7"));
    }

    #[test]
    fn test_display_year_from_added_at() {
        let item = PlexMetadata {
            added_at: 1_577_836_800, // 2020-01-01
            ..Default::default()
        };
        assert_eq!(item.display_year(), "2020");
    }
}
