//! Playback candidate construction
//!
//! Every media version yields a direct-play candidate, optionally a
//! transcode at source quality, transcodes down to configured resolutions the
//! source is wider than, and an external link for provider-catalogued items.
//! Origin URLs are rewritten through the stream proxy when the request came in
//! over a public address; otherwise they are returned with the token embedded.

use crate::models::{AddonConfiguration, PlexMedia, PlexMetadata, Resolution};
use crate::utils::url::{TOKEN_PARAM, UrlUtils};

const TRANSCODE_PATH: &str = "/video/:/transcode/universal/start.m3u8";
const ORIGINAL_VIDEO_QUALITY: u32 = 100;
const PROVIDER_GUID_PREFIX: &str = "plex:";
const PROVIDER_DETAILS_URL: &str =
    "https://app.plex.tv/#!/provider/tv.plex.provider.metadata/details?key=/library/metadata/";

/// An origin URL kept in parts so it can be rendered either way
#[derive(Debug, Clone, PartialEq)]
pub struct OriginUrl {
    base: String,
    path: String,
    query: Vec<(String, String)>,
}

impl OriginUrl {
    pub fn new(base: &str, path: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            path: format!("/{}", path.trim_start_matches('/')),
            query: Vec::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_token(self, token: &str) -> Self {
        self.with(TOKEN_PARAM, token)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query pairs excluding the token
    pub fn public_query(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .filter(|(k, _)| !UrlUtils::is_token_param(k))
            .cloned()
            .collect()
    }

    /// Absolute origin URL, token included
    pub fn direct(&self) -> String {
        UrlUtils::with_query(&format!("{}{}", self.base, self.path), &self.query)
    }

    /// Path and query relative to the base, token stripped
    pub fn relative_without_token(&self) -> String {
        UrlUtils::with_query(&self.path, &self.public_query())
    }
}

/// Where proxied URLs point; inactive unless both parts are non-empty
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlRewrite {
    pub public_streaming_base: Option<String>,
    pub proxy_prefix: Option<String>,
}

impl UrlRewrite {
    pub fn new(public_streaming_base: Option<String>, proxy_prefix: Option<String>) -> Self {
        Self {
            public_streaming_base,
            proxy_prefix,
        }
    }

    /// Local mode: origin URLs go out as-is
    pub fn direct() -> Self {
        Self::default()
    }

    fn parts(&self) -> Option<(&str, &str)> {
        let base = self
            .public_streaming_base
            .as_deref()
            .map(|b| b.trim_end_matches('/'))
            .filter(|b| !b.is_empty())?;
        let prefix = self.proxy_prefix.as_deref().filter(|p| !p.is_empty())?;
        Some((base, prefix))
    }

    pub fn is_active(&self) -> bool {
        self.parts().is_some()
    }

    /// Render an origin URL, through the proxy when active
    pub fn render(&self, url: &OriginUrl) -> String {
        match self.parts() {
            Some((base, prefix)) => format!(
                "{base}{prefix}?q={}",
                urlencoding::encode(&url.relative_without_token())
            ),
            None => url.direct(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Direct,
    TranscodeOriginal,
    TranscodeDown(Resolution),
    ExternalLink,
}

/// One playback option for one media version
#[derive(Debug, Clone, PartialEq)]
pub struct StreamCandidate {
    /// Position of the media version within the item
    pub media_index: usize,
    pub kind: CandidateKind,
    pub url: String,
    pub proxied: bool,
}

/// Transcoder URL shared by the transcode candidates of one media version
fn transcode_url(
    config: &AddonConfiguration,
    item_key: &str,
    media_index: usize,
) -> OriginUrl {
    OriginUrl::new(config.streaming_base(), TRANSCODE_PATH)
        .with("path", item_key)
        .with("mediaIndex", media_index)
        .with("protocol", "hls")
        .with("fastSeek", 1)
        .with("copyts", 1)
        .with("autoAdjustQuality", 0)
        .with("X-Plex-Platform", "Chrome")
        .with_token(&config.access_token)
}

fn external_link(guid: &str) -> Option<String> {
    if !guid.starts_with(PROVIDER_GUID_PREFIX) {
        return None;
    }
    let id = guid.rsplit('/').next().filter(|id| !id.is_empty())?;
    Some(format!("{PROVIDER_DETAILS_URL}{id}"))
}

/// Candidates for a single media version, in presentation order
pub fn media_candidates(
    item: &PlexMetadata,
    media: &PlexMedia,
    media_index: usize,
    config: &AddonConfiguration,
    rewrite: &UrlRewrite,
) -> Vec<StreamCandidate> {
    let mut candidates = Vec::new();
    let proxied = rewrite.is_active();
    let mut push = |kind, url: &OriginUrl| {
        candidates.push(StreamCandidate {
            media_index,
            kind,
            url: rewrite.render(url),
            proxied,
        })
    };

    if let Some(part) = media.first_part() {
        let direct = OriginUrl::new(config.streaming_base(), &part.key)
            .with_token(&config.access_token);
        push(CandidateKind::Direct, &direct);
    }

    if let Some(item_key) = item.key.as_deref() {
        let transcode = transcode_url(config, item_key, media_index);

        if config.include_transcode_original {
            let original = transcode.clone().with("videoQuality", ORIGINAL_VIDEO_QUALITY);
            push(CandidateKind::TranscodeOriginal, &original);
        }

        if config.include_transcode_down {
            let source_width = media.width.unwrap_or(0);
            for resolution in &config.transcode_down_qualities {
                let params = resolution.params();
                if source_width <= params.min_width {
                    continue;
                }
                let down = params
                    .transcode_args()
                    .into_iter()
                    .fold(transcode.clone(), |url, (k, v)| url.with(k, v));
                push(CandidateKind::TranscodeDown(*resolution), &down);
            }
        }
    }

    if config.include_plex_tv {
        if let Some(url) = external_link(&item.guid) {
            candidates.push(StreamCandidate {
                media_index,
                kind: CandidateKind::ExternalLink,
                url,
                proxied: false,
            });
        }
    }

    candidates
}

/// Ordered candidates for every media version of `item`
pub fn build(
    item: &PlexMetadata,
    config: &AddonConfiguration,
    rewrite: &UrlRewrite,
) -> Vec<StreamCandidate> {
    item.media
        .iter()
        .enumerate()
        .flat_map(|(i, media)| media_candidates(item, media, i, config, rewrite))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::addon::tests::sample_configuration;
    use crate::models::{PlexMediaType, PlexPart};
    use crate::streaming::proxy::{flatten_query, target_url};

    fn movie(width: u32) -> PlexMetadata {
        PlexMetadata {
            guid: "plex://movie/5d776825880197001ec967c1".to_string(),
            media_type: PlexMediaType::Movie,
            title: "Heat".to_string(),
            key: Some("/library/metadata/1234".to_string()),
            media: vec![PlexMedia {
                video_resolution: Some("1080".to_string()),
                width: Some(width),
                height: Some(1080),
                parts: vec![PlexPart {
                    key: "/library/parts/1/1700000000/file.mkv".to_string(),
                    file: "/data/Heat (1995).mkv".to_string(),
                    size: Some(4_500_000_000),
                    streams: vec![],
                }],
            }],
            ..Default::default()
        }
    }

    fn public() -> UrlRewrite {
        UrlRewrite::new(
            Some("https://plexio.example.com".to_string()),
            Some("/inst/cfg/proxy".to_string()),
        )
    }

    fn q_of(url: &str) -> String {
        let parsed = url::Url::parse(url).unwrap();
        parsed
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn test_direct_only_by_default() {
        let config = sample_configuration();
        let candidates = build(&movie(1920), &config, &UrlRewrite::direct());

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, CandidateKind::Direct);
        assert!(!candidates[0].proxied);
        assert_eq!(
            candidates[0].url,
            "http://plex.local:32400/library/parts/1/1700000000/file.mkv?X-Plex-Token=secret-token"
        );
    }

    #[test]
    fn test_transcode_down_uses_strict_width_boundary() {
        let mut config = sample_configuration();
        config.include_transcode_down = true;
        config.transcode_down_qualities = vec![Resolution::R720, Resolution::R1080];

        let kinds: Vec<CandidateKind> = build(&movie(1920), &config, &UrlRewrite::direct())
            .into_iter()
            .map(|c| c.kind)
            .collect();

        assert_eq!(
            kinds,
            vec![
                CandidateKind::Direct,
                CandidateKind::TranscodeDown(Resolution::R720)
            ]
        );
    }

    #[test]
    fn test_missing_width_offers_no_transcode_down() {
        let mut config = sample_configuration();
        config.include_transcode_down = true;
        config.transcode_down_qualities = vec![Resolution::R480];
        let mut item = movie(1920);
        item.media[0].width = None;

        assert_eq!(build(&item, &config, &UrlRewrite::direct()).len(), 1);
    }

    #[test]
    fn test_transcode_urls_carry_quality_arguments() {
        let mut config = sample_configuration();
        config.include_transcode_original = true;
        config.include_transcode_down = true;
        config.transcode_down_qualities = vec![Resolution::R720];

        let candidates = build(&movie(3840), &config, &UrlRewrite::direct());
        assert_eq!(candidates.len(), 3);

        let original = url::Url::parse(&candidates[1].url).unwrap();
        assert_eq!(original.path(), "/video/:/transcode/universal/start.m3u8");
        let pairs: Vec<(String, String)> = original.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("path".to_string(), "/library/metadata/1234".to_string())));
        assert!(pairs.contains(&("mediaIndex".to_string(), "0".to_string())));
        assert!(pairs.contains(&("videoQuality".to_string(), "100".to_string())));
        assert!(pairs.contains(&("X-Plex-Token".to_string(), "secret-token".to_string())));

        let down = url::Url::parse(&candidates[2].url).unwrap();
        let pairs: Vec<(String, String)> = down.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("maxVideoBitrate".to_string(), "6.5".to_string())));
        assert!(pairs.contains(&("videoResolution".to_string(), "1280x720".to_string())));
    }

    #[test]
    fn test_external_link_only_for_provider_guids() {
        let mut config = sample_configuration();
        config.include_plex_tv = true;

        let candidates = build(&movie(1920), &config, &public());
        let link = candidates.last().unwrap();
        assert_eq!(link.kind, CandidateKind::ExternalLink);
        assert!(!link.proxied);
        assert_eq!(
            link.url,
            "https://app.plex.tv/#!/provider/tv.plex.provider.metadata/details?key=/library/metadata/5d776825880197001ec967c1"
        );

        let mut local = movie(1920);
        local.guid = "local://1234".to_string();
        assert!(
            build(&local, &config, &public())
                .iter()
                .all(|c| c.kind != CandidateKind::ExternalLink)
        );
    }

    #[test]
    fn test_proxy_rewrite_strips_token() {
        let config = sample_configuration();
        let candidates = build(&movie(1920), &config, &public());

        let url = &candidates[0].url;
        assert!(candidates[0].proxied);
        assert!(url.starts_with("https://plexio.example.com/inst/cfg/proxy?q="));
        assert!(!url.contains("secret-token"));
        assert_eq!(q_of(url), "/library/parts/1/1700000000/file.mkv");
    }

    #[test]
    fn test_rewrite_requires_both_parts() {
        let base_only = UrlRewrite::new(Some("https://plexio.example.com".to_string()), None);
        let prefix_only = UrlRewrite::new(None, Some("/a/b/proxy".to_string()));
        let empty_base = UrlRewrite::new(Some(String::new()), Some("/a/b/proxy".to_string()));
        for rewrite in [base_only, prefix_only, empty_base] {
            assert!(!rewrite.is_active());
            let c = build(&movie(1920), &sample_configuration(), &rewrite);
            assert!(c[0].url.contains("X-Plex-Token=secret-token"));
        }
    }

    #[test]
    fn test_proxied_url_round_trips_through_proxy_parser() {
        let mut config = sample_configuration();
        config.include_transcode_original = true;
        config.include_transcode_down = true;
        config.transcode_down_qualities = vec![Resolution::R480];
        let item = movie(1920);

        let direct = build(&item, &config, &UrlRewrite::direct());
        let proxied = build(&item, &config, &public());
        assert_eq!(direct.len(), proxied.len());

        for (original, rewritten) in direct.iter().zip(&proxied) {
            let q = q_of(&rewritten.url);
            let (q_path, q_query) = UrlUtils::split_path_query(&q);
            let origin = url::Url::parse(&original.url).unwrap();
            let expected: Vec<(String, String)> = origin
                .query_pairs()
                .into_owned()
                .filter(|(k, _)| k != "X-Plex-Token")
                .collect();

            assert_eq!(q_path, origin.path());
            assert_eq!(flatten_query(q_query), expected);

            // And the proxy puts the token back on the same origin URL
            let target = target_url(config.streaming_base(), &q, &config.access_token).unwrap();
            assert_eq!(
                url::Url::parse(&target).unwrap().query_pairs().count(),
                origin.query_pairs().count()
            );
        }
    }
}
