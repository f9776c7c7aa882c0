//! Library helpers built on [`OriginApi`]

use tracing::debug;

use super::OriginApi;
use crate::errors::PlexResult;
use crate::models::PlexMetadata;

/// Catalog sort labels offered to clients and the origin sort key for each
pub const SORT_OPTIONS: &[(&str, &str)] = &[
    ("Title", "title"),
    ("Title (desc)", "title:desc"),
    ("Year", "year"),
    ("Year (desc)", "year:desc"),
    ("Release Date", "originallyAvailableAt"),
    ("Release Date (desc)", "originallyAvailableAt:desc"),
    ("Critic Rating", "rating"),
    ("Critic Rating (desc)", "rating:desc"),
    ("Audience Rating", "audienceRating"),
    ("Audience Rating (desc)", "audienceRating:desc"),
    ("Rating", "userRating"),
    ("Rating (desc)", "userRating:desc"),
    ("Content Rating", "contentRating"),
    ("Content Rating (desc)", "contentRating:desc"),
    ("Duration", "duration"),
    ("Duration (desc)", "duration:desc"),
    ("Progress", "viewOffset"),
    ("Progress (desc)", "viewOffset:desc"),
    ("Plays", "viewCount"),
    ("Plays (desc)", "viewCount:desc"),
    ("Date Added", "addedAt"),
    ("Date Added (desc)", "addedAt:desc"),
    ("Date Viewed", "lastViewedAt"),
    ("Date Viewed (desc)", "lastViewedAt:desc"),
    ("ResolutionSelected", "mediaHeight"),
    ("ResolutionSelected (desc)", "mediaHeight:desc"),
    ("Bitrate", "mediaBitrate"),
    ("Bitrate (desc)", "mediaBitrate:desc"),
    ("Randomly", "random"),
];

pub const DEFAULT_SORT: &str = "Title";

pub fn sort_labels() -> Vec<&'static str> {
    SORT_OPTIONS.iter().map(|(label, _)| *label).collect()
}

/// Origin sort key for a display label
pub fn sort_key(label: &str) -> Option<&'static str> {
    SORT_OPTIONS
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, key)| *key)
}

/// Media items for an origin GUID, each re-fetched with its stream tracks.
///
/// Only movies, shows and episodes are returned; other item kinds listed
/// under the same GUID are skipped.
pub async fn get_media(
    origin: &dyn OriginApi,
    base: &str,
    token: &str,
    guid: &str,
    first_only: bool,
) -> PlexResult<Vec<PlexMetadata>> {
    let listed = origin.find_by_guid(base, token, guid).await?;
    let mut media = Vec::new();

    for item in listed {
        if !item.media_type.is_playable_kind() {
            debug!("Skipping {} item for guid {}", item.media_type.as_str(), guid);
            continue;
        }
        let Some(rating_key) = item.rating_key.as_deref() else {
            continue;
        };
        if let Some(full) = origin.metadata(base, token, rating_key).await? {
            media.push(full);
            if first_only {
                break;
            }
        }
    }
    Ok(media)
}
