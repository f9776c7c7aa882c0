//! External id resolution
//!
//! Resolution is an ordered pipeline of lookup steps. Each step yields a
//! found id, nothing, or an error; the next step runs only when the previous
//! one found nothing. The matching service step swallows its own failures
//! (it is an optional accelerator), the local steps do not.
//!
//! ```text
//! cache ─hit─▶ done
//!   │ miss
//!   ▼
//! matching service ─▶ guid candidates (3 encodings) ─▶ section scan
//!   │ found                                              │
//!   ▼                                                    ▼
//! episode lookup (shows only) ─▶ cache write ─▶ done   not found
//! ```

use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::OriginApi;
use crate::cache::IdCache;
use crate::config::PlexConfig;
use crate::errors::PlexResult;
use crate::models::{EpisodeRef, ExternalId, PlexMediaType};

type Step<'a> = (&'static str, BoxFuture<'a, PlexResult<Option<String>>>);

/// Run steps in order until one finds an id; errors stop the pipeline
async fn first_found(steps: Vec<Step<'_>>) -> PlexResult<Option<String>> {
    for (name, step) in steps {
        if let Some(id) = step.await? {
            debug!("Resolved by {}", name);
            return Ok(Some(id));
        }
        debug!("{} found nothing", name);
    }
    Ok(None)
}

/// Maps external catalog ids to origin ids
#[derive(Clone)]
pub struct Resolver {
    origin: Arc<dyn OriginApi>,
    cache: Arc<dyn IdCache>,
    matching_token: Option<String>,
    page_size: u32,
}

impl Resolver {
    pub fn new(origin: Arc<dyn OriginApi>, cache: Arc<dyn IdCache>, config: &PlexConfig) -> Self {
        Self {
            origin,
            cache,
            matching_token: config.matching_token.clone().filter(|t| !t.is_empty()),
            page_size: config.scan_page_size.max(1),
        }
    }

    /// Matching-service credential, falling back to the addon access token
    fn matching_token<'a>(&'a self, access_token: &'a str) -> &'a str {
        self.matching_token.as_deref().unwrap_or(access_token)
    }

    /// Resolve `external_id` (`tt…`, or `tt…:season:episode` for shows) to an
    /// origin id. `Ok(None)` covers both malformed ids and ids the origin
    /// does not have.
    pub async fn resolve(
        &self,
        base: &str,
        token: &str,
        external_id: &str,
        media_type: PlexMediaType,
    ) -> PlexResult<Option<String>> {
        match self.cache.get(external_id).await {
            Ok(Some(cached)) => {
                debug!("Cache hit for {}", external_id);
                return Ok(Some(cached));
            }
            Ok(None) => {}
            Err(e) => warn!("Cache lookup failed for {}: {}", external_id, e),
        }

        let Some(parsed) = ExternalId::parse(external_id, media_type) else {
            warn!("Malformed {} id: {}", media_type.as_str(), external_id);
            return Ok(None);
        };

        let Some(found) = self.find_title(base, token, &parsed, media_type).await? else {
            info!("Could not find origin id for {}", parsed.id);
            return Ok(None);
        };

        let resolved = match parsed.episode {
            Some(episode) => self.find_episode(base, token, &found, episode).await?,
            None => Some(found),
        };

        match resolved {
            Some(origin_id) => {
                info!("Resolved {} to {}", external_id, origin_id);
                if let Err(e) = self.cache.set(external_id, &origin_id).await {
                    warn!("Failed to cache {}: {}", external_id, e);
                }
                Ok(Some(origin_id))
            }
            None => {
                info!("No matching episode for {}", external_id);
                Ok(None)
            }
        }
    }

    /// Movie or series lookup: matching service, then the local steps
    async fn find_title(
        &self,
        base: &str,
        token: &str,
        ext: &ExternalId,
        media_type: PlexMediaType,
    ) -> PlexResult<Option<String>> {
        let mut steps: Vec<Step<'_>> = vec![(
            "matching service",
            self.match_remote(ext, media_type, token).boxed(),
        )];
        for candidate in ext.guid_candidates() {
            steps.push(("guid lookup", self.match_guid(base, token, candidate).boxed()));
        }
        steps.push((
            "section scan",
            self.scan_sections(base, token, ext, media_type).boxed(),
        ));
        first_found(steps).await
    }

    async fn match_remote(
        &self,
        ext: &ExternalId,
        media_type: PlexMediaType,
        access_token: &str,
    ) -> PlexResult<Option<String>> {
        let token = self.matching_token(access_token);
        if token.is_empty() {
            return Ok(None);
        }
        match self.origin.match_external(&ext.id, media_type, token).await {
            Ok(found) => {
                if let Some(guid) = &found {
                    info!("Found {} via matching service: {}", ext.id, guid);
                }
                Ok(found)
            }
            Err(e) => {
                warn!("Matching service lookup failed for {}: {}", ext.id, e);
                Ok(None)
            }
        }
    }

    async fn match_guid(
        &self,
        base: &str,
        token: &str,
        candidate: String,
    ) -> PlexResult<Option<String>> {
        debug!("Searching origin for guid {}", candidate);
        let items = self.origin.find_by_guid(base, token, &candidate).await?;
        Ok(items
            .into_iter()
            .filter(|item| item.media_type.is_playable_kind())
            .find_map(|item| item.primary_id()))
    }

    /// Page through every section of the requested type looking for an item
    /// carrying the external id as a secondary guid
    async fn scan_sections(
        &self,
        base: &str,
        token: &str,
        ext: &ExternalId,
        media_type: PlexMediaType,
    ) -> PlexResult<Option<String>> {
        let wanted = ext.secondary_guid();
        let sections = self.origin.list_sections(base, token).await?;

        for section in sections.iter().filter(|s| s.section_type == media_type) {
            let mut start = 0u32;
            loop {
                let page = self
                    .origin
                    .section_page(base, token, &section.key, start, self.page_size)
                    .await?;
                if page.metadata.is_empty() {
                    break;
                }
                if let Some(found) = page
                    .metadata
                    .iter()
                    .find(|item| item.has_guid(&wanted))
                    .and_then(|item| item.primary_id())
                {
                    info!("Found {} by scanning section {}", ext.id, section.key);
                    return Ok(Some(found));
                }

                let seen = u64::from(start) + page.metadata.len() as u64;
                if seen >= page.total_size.unwrap_or(0) {
                    break;
                }
                start = start.saturating_add(self.page_size);
            }
        }
        Ok(None)
    }

    /// Locate season/episode within the series resolved for `series_guid`
    async fn find_episode(
        &self,
        base: &str,
        token: &str,
        series_guid: &str,
        wanted: EpisodeRef,
    ) -> PlexResult<Option<String>> {
        let series = self.origin.find_by_guid(base, token, series_guid).await?;

        for item in series.iter().filter(|i| i.media_type.is_playable_kind()) {
            let Some(key) = item.key.as_deref() else {
                continue;
            };
            let episodes = self.origin.all_episodes(base, token, key).await?;
            let found = episodes.into_iter().find(|ep| {
                ep.parent_index == Some(wanted.season) && ep.index == Some(wanted.episode)
            });
            if let Some(episode) = found.and_then(|ep| ep.primary_id()) {
                return Ok(Some(episode));
            }
        }
        Ok(None)
    }
}
