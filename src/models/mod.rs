//! Domain types shared across the gateway
//!
//! - [`plex`]: the origin's JSON envelope
//! - [`addon`]: per-installation addon configuration and the transcode table
//! - [`stremio`]: response shapes served to Stremio clients
//!
//! The identifier types here are the seam between the two worlds: a
//! [`MediaIdentifier`] is either an external catalog id (IMDB-style, optionally
//! with season/episode) or an opaque origin GUID.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod addon;
pub mod plex;
pub mod stremio;

pub use addon::*;
pub use plex::*;
pub use stremio::*;

/// Prefix of ids minted by this addon for origin items
pub const PLEXIO_ID_PREFIX: &str = "plexio:";

/// Item type as the origin names it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlexMediaType {
    Movie,
    Show,
    Episode,
    /// Seasons, artists, photos: listed by the origin, never served
    #[default]
    #[serde(other)]
    Other,
}

impl PlexMediaType {
    /// Numeric type code used by the matching service
    pub fn matching_type_code(self) -> u8 {
        match self {
            Self::Movie => 1,
            _ => 2,
        }
    }

    /// Whether items of this type can be turned into streams
    pub fn is_playable_kind(self) -> bool {
        matches!(self, Self::Movie | Self::Show | Self::Episode)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Show => "show",
            Self::Episode => "episode",
            Self::Other => "other",
        }
    }
}

/// Item type as Stremio names it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StremioMediaType {
    Movie,
    Series,
}

impl StremioMediaType {
    pub fn to_plex(self) -> PlexMediaType {
        match self {
            Self::Movie => PlexMediaType::Movie,
            Self::Series => PlexMediaType::Show,
        }
    }

    pub fn from_plex(media_type: PlexMediaType) -> Self {
        match media_type {
            PlexMediaType::Movie => Self::Movie,
            _ => Self::Series,
        }
    }
}

impl std::str::FromStr for StremioMediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            "series" => Ok(Self::Series),
            other => Err(format!("unknown stremio type: {other}")),
        }
    }
}

/// Season/episode coordinates within a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EpisodeRef {
    pub season: u32,
    pub episode: u32,
}

/// External catalog id (`tt0903747` or `tt0903747:2:5`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalId {
    pub id: String,
    pub episode: Option<EpisodeRef>,
}

impl ExternalId {
    /// Parse a raw external id for the requested media type.
    ///
    /// Shows must be exactly `id:season:episode`; every other arity (and
    /// non-numeric season/episode) is rejected. Movies take the whole string.
    pub fn parse(raw: &str, media_type: PlexMediaType) -> Option<Self> {
        match media_type {
            PlexMediaType::Show => {
                let parts: Vec<&str> = raw.split(':').collect();
                let [id, season, episode] = parts.as_slice() else {
                    return None;
                };
                if id.is_empty() {
                    return None;
                }
                Some(Self {
                    id: (*id).to_string(),
                    episode: Some(EpisodeRef {
                        season: season.trim().parse().ok()?,
                        episode: episode.trim().parse().ok()?,
                    }),
                })
            }
            _ => (!raw.is_empty()).then(|| Self {
                id: raw.to_string(),
                episode: None,
            }),
        }
    }

    /// Candidate origin GUID encodings, in lookup order
    pub fn guid_candidates(&self) -> [String; 3] {
        [
            format!("com.plexapp.agents.imdb://{}?lang=en", self.id),
            format!("imdb://{}", self.id),
            format!("imdb-{}", self.id),
        ]
    }

    /// Secondary-identifier form stored on origin items
    pub fn secondary_guid(&self) -> String {
        format!("imdb://{}", self.id)
    }
}

/// Either side of the id mapping
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaIdentifier {
    External(ExternalId),
    Origin(String),
}

impl MediaIdentifier {
    /// Classify a Stremio request id.
    ///
    /// `tt…` ids are external (and may fail to parse for shows); `plexio:` ids
    /// carry an origin GUID; anything else is passed to the origin as-is.
    pub fn from_request_id(raw: &str, media_type: PlexMediaType) -> Option<Self> {
        if raw.starts_with("tt") {
            ExternalId::parse(raw, media_type).map(Self::External)
        } else if let Some(guid) = plexio_id_to_guid(raw) {
            Some(Self::Origin(guid))
        } else {
            Some(Self::Origin(raw.to_string()))
        }
    }
}

impl fmt::Display for MediaIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External(ext) => match ext.episode {
                Some(ep) => write!(f, "{}:{}:{}", ext.id, ep.season, ep.episode),
                None => write!(f, "{}", ext.id),
            },
            Self::Origin(guid) => write!(f, "{guid}"),
        }
    }
}

/// Media descriptor kind with the data each variant needs for presentation
#[derive(Debug, Clone, PartialEq)]
pub enum MediaKind {
    Movie,
    Show,
    Episode {
        series_title: Option<String>,
        season: Option<u32>,
        episode: Option<u32>,
    },
}

impl MediaKind {
    pub fn of(meta: &PlexMetadata) -> Option<Self> {
        match meta.media_type {
            PlexMediaType::Movie => Some(Self::Movie),
            PlexMediaType::Show => Some(Self::Show),
            PlexMediaType::Episode => Some(Self::Episode {
                series_title: meta.grandparent_title.clone(),
                season: meta.parent_index,
                episode: meta.index,
            }),
            PlexMediaType::Other => None,
        }
    }
}

pub fn guid_to_plexio_id(guid: &str) -> String {
    format!("{PLEXIO_ID_PREFIX}{guid}")
}

pub fn plexio_id_to_guid(id: &str) -> Option<String> {
    id.strip_prefix(PLEXIO_ID_PREFIX)
        .filter(|guid| !guid.is_empty())
        .map(str::to_string)
}
