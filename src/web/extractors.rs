//! Request extractors
//!
//! Addon routes carry the installation id and the base64 configuration blob
//! as their first two path segments; [`Installation`] decodes them once so
//! handlers receive a typed [`AddonConfiguration`].

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{AddonConfiguration, StremioMediaType};

/// Decoded `/{installation_id}/{cfg}` prefix
#[derive(Debug, Clone)]
pub struct Installation {
    pub id: String,
    /// The blob exactly as it appeared in the path
    pub raw_config: String,
    pub config: AddonConfiguration,
}

impl Installation {
    /// Path of the stream proxy for this installation
    pub fn proxy_prefix(&self) -> String {
        format!("/{}/{}/proxy", self.id, self.raw_config)
    }
}

impl<S> FromRequestParts<S> for Installation
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params): Path<HashMap<String, String>> =
            Path::from_request_parts(parts, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;

        let id = params
            .get("installation_id")
            .cloned()
            .ok_or_else(|| AppError::validation("Missing installation id"))?;
        let raw_config = params
            .get("cfg")
            .cloned()
            .ok_or_else(|| AppError::validation("Missing addon configuration"))?;
        let config = AddonConfiguration::from_base64(&raw_config)?;

        Ok(Self {
            id,
            raw_config,
            config,
        })
    }
}

/// `{type}` and `{*id}` of meta and stream routes
#[derive(Debug, Deserialize)]
pub struct ResourcePath {
    pub media_type: String,
    pub id: String,
}

impl ResourcePath {
    pub fn stremio_type(&self) -> Result<StremioMediaType, AppError> {
        parse_type(&self.media_type)
    }

    /// Request id without the `.json` suffix
    pub fn resource_id(&self) -> &str {
        strip_json(&self.id)
    }
}

/// `{type}` and `{*rest}` of catalog routes, where rest is
/// `catalog_id.json` or `catalog_id/extra.json`
#[derive(Debug, Deserialize)]
pub struct CatalogPath {
    pub media_type: String,
    pub rest: String,
}

impl CatalogPath {
    pub fn stremio_type(&self) -> Result<StremioMediaType, AppError> {
        parse_type(&self.media_type)
    }

    pub fn catalog_and_extra(&self) -> (&str, &str) {
        let rest = strip_json(&self.rest);
        rest.split_once('/').unwrap_or((rest, ""))
    }
}

fn parse_type(raw: &str) -> Result<StremioMediaType, AppError> {
    raw.parse().map_err(AppError::validation)
}

fn strip_json(raw: &str) -> &str {
    let raw = raw.trim_start_matches('/');
    raw.strip_suffix(".json").unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_path_split() {
        let plain = CatalogPath {
            media_type: "movie".to_string(),
            rest: "1.json".to_string(),
        };
        assert_eq!(plain.catalog_and_extra(), ("1", ""));

        let with_extra = CatalogPath {
            media_type: "series".to_string(),
            rest: "2/search=wire&skip=100.json".to_string(),
        };
        assert_eq!(with_extra.catalog_and_extra(), ("2", "search=wire&skip=100"));
        assert_eq!(with_extra.stremio_type().unwrap(), StremioMediaType::Series);
    }

    #[test]
    fn test_resource_path_strips_suffix() {
        let path = ResourcePath {
            media_type: "tv".to_string(),
            id: "plexio:plex://movie/5d77.json".to_string(),
        };
        assert_eq!(path.resource_id(), "plexio:plex://movie/5d77");
        assert!(matches!(
            path.stremio_type(),
            Err(AppError::Validation { .. })
        ));
    }
}
