//! Per-installation addon configuration
//!
//! The configuration travels inside every addon URL as base64-encoded JSON,
//! so each request carries its own origin base URLs and access token. Nothing
//! here is process-wide.

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use serde::{Deserialize, Serialize};

use super::PlexMediaType;
use crate::errors::{AppError, AppResult};
use crate::utils::url::{TOKEN_PARAM, UrlUtils};

/// Target resolutions offered for transcode-down candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "480p")]
    R480,
    #[serde(rename = "720p")]
    R720,
    #[serde(rename = "1080p")]
    R1080,
}

/// Transcoder arguments for one target resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityParams {
    pub name: &'static str,
    /// Source must be strictly wider than this to offer the resolution
    pub min_width: u32,
    pub video_quality: u32,
    /// Mbit/s
    pub max_video_bitrate: f32,
    pub video_resolution: &'static str,
}

impl Resolution {
    pub fn params(self) -> QualityParams {
        match self {
            Self::R1080 => QualityParams {
                name: "1080p",
                min_width: 1920,
                video_quality: 100,
                max_video_bitrate: 10.0,
                video_resolution: "1920x1080",
            },
            Self::R720 => QualityParams {
                name: "720p",
                min_width: 1280,
                video_quality: 100,
                max_video_bitrate: 6.5,
                video_resolution: "1280x720",
            },
            Self::R480 => QualityParams {
                name: "480p",
                min_width: 640,
                video_quality: 100,
                max_video_bitrate: 3.5,
                video_resolution: "640x480",
            },
        }
    }
}

impl QualityParams {
    /// Query arguments appended to the transcode URL
    pub fn transcode_args(&self) -> Vec<(&'static str, String)> {
        vec![
            ("videoQuality", self.video_quality.to_string()),
            ("maxVideoBitrate", self.max_video_bitrate.to_string()),
            ("videoResolution", self.video_resolution.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySection {
    pub key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: PlexMediaType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonConfiguration {
    pub access_token: String,
    /// Origin base used for metadata calls
    pub discovery_url: String,
    /// Origin base used for media bytes (may differ, e.g. a LAN address)
    pub streaming_url: String,
    pub server_name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub sections: Vec<LibrarySection>,
    #[serde(default)]
    pub include_transcode_original: bool,
    #[serde(default)]
    pub include_transcode_down: bool,
    #[serde(default)]
    pub transcode_down_qualities: Vec<Resolution>,
    #[serde(default)]
    pub include_plex_tv: bool,
    #[serde(default)]
    pub custom_name: Option<String>,
    #[serde(default)]
    pub stream_name: Option<String>,
    #[serde(default)]
    pub show_library_name: bool,
    #[serde(default)]
    pub catalog_name_movies: Option<String>,
    #[serde(default)]
    pub catalog_name_tv_shows: Option<String>,
}

fn default_version() -> String {
    "0.0.1".to_string()
}

impl AddonConfiguration {
    /// Decode the base64 JSON blob from an addon URL path segment
    pub fn from_base64(encoded: &str) -> AppResult<Self> {
        let decoded = STANDARD
            .decode(encoded)
            .or_else(|_| URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')))
            .map_err(|e| AppError::validation(format!("Invalid configuration encoding: {e}")))?;
        serde_json::from_slice(&decoded)
            .map_err(|e| AppError::validation(format!("Invalid configuration: {e}")))
    }

    pub fn to_base64(&self) -> AppResult<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| AppError::internal(format!("Failed to encode configuration: {e}")))?;
        Ok(STANDARD.encode(json))
    }

    /// Discovery base without a trailing slash
    pub fn discovery_base(&self) -> &str {
        self.discovery_url.trim_end_matches('/')
    }

    /// Streaming base without a trailing slash
    pub fn streaming_base(&self) -> &str {
        self.streaming_url.trim_end_matches('/')
    }

    /// Poster/thumbnail URL on the streaming base, token embedded
    pub fn artwork_url(&self, path: &str) -> String {
        UrlUtils::with_query(
            &UrlUtils::join(self.streaming_base(), path),
            &[(TOKEN_PARAM, self.access_token.as_str())],
        )
    }

    /// Addon display name in the manifest
    pub fn display_name(&self) -> String {
        match self.custom_name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => format!("Plexio ({})", self.server_name),
        }
    }

    /// Catalog name for a configured section
    pub fn catalog_name(&self, section: &LibrarySection) -> String {
        let custom = match section.section_type {
            PlexMediaType::Movie => self.catalog_name_movies.as_deref(),
            PlexMediaType::Show => self.catalog_name_tv_shows.as_deref(),
            _ => None,
        };
        match custom.filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => format!("{} | {}", section.title, self.server_name),
        }
    }
}
