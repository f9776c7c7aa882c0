//! Stremio stream entries for built playback candidates

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::stream_urls::{self, CandidateKind, OriginUrl, StreamCandidate, UrlRewrite};
use crate::models::{
    AddonConfiguration, MediaKind, PlexMedia, PlexMetadata, STREAM_TYPE_AUDIO,
    STREAM_TYPE_SUBTITLE, Stream, StreamBehaviorHints, Subtitle,
};
use crate::utils::human_format::format_file_size;
use crate::utils::language::{UNKNOWN_LANGUAGE, english_flag, flag_emoji};

const EXTERNAL_LINK_DESCRIPTION: &str = "Open on plex.tv (external)";
const LANGUAGE_SEPARATOR: &str = "  ∙  ";

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid number pattern"));

/// "1080p" from "1080", "1920x1080" and friends: the last number is the height
fn resolution_label(video_resolution: Option<&str>) -> Option<String> {
    let resolution = video_resolution?;
    NUMBER_PATTERN
        .find_iter(resolution)
        .last()
        .map(|m| format!("{}p", m.as_str()))
}

fn stream_title(item: &PlexMetadata, media: &PlexMedia, config: &AddonConfiguration) -> String {
    let library = item.library_section_title.as_deref().unwrap_or_default();
    let mut name = match config.stream_name.as_deref().filter(|n| !n.is_empty()) {
        Some(custom) if config.show_library_name => format!("{custom}\n({library})"),
        Some(custom) => custom.to_string(),
        None => format!("{} {}", config.server_name, library),
    };
    if let Some(label) = resolution_label(media.video_resolution.as_deref()) {
        name.push('\n');
        name.push_str(&label);
    }
    name
}

fn languages_line(media: &PlexMedia) -> Option<String> {
    let streams = media.first_part().map(|p| p.streams.as_slice()).unwrap_or_default();

    let audio: BTreeSet<String> = streams
        .iter()
        .filter(|s| s.stream_type == STREAM_TYPE_AUDIO)
        .map(|s| flag_emoji(s.language_tag.as_deref()))
        .collect();
    let subtitles: BTreeSet<String> = streams
        .iter()
        .filter(|s| s.stream_type == STREAM_TYPE_SUBTITLE)
        .map(|s| flag_emoji(s.language_tag.as_deref()))
        .filter(|flag| flag != UNKNOWN_LANGUAGE)
        .collect();

    let mut parts = Vec::new();
    if !audio.is_empty() {
        parts.push(format!(
            "🎧 {}",
            audio.into_iter().collect::<Vec<_>>().join(" ")
        ));
    }
    let english = english_flag();
    if subtitles.contains(&english) {
        parts.push(format!("💬 {english}"));
    }

    (!parts.is_empty()).then(|| parts.join(LANGUAGE_SEPARATOR))
}

fn stream_description(item: &PlexMetadata, media: &PlexMedia) -> String {
    let part = media.first_part();
    let mut description = match MediaKind::of(item) {
        Some(MediaKind::Episode {
            series_title: Some(series),
            ..
        }) => format!("{series}\n{}", item.title),
        Some(MediaKind::Movie) => item.title.clone(),
        _ => part
            .map(|p| p.file.rsplit(['/', '\\']).next().unwrap_or_default().to_string())
            .unwrap_or_default(),
    };

    if let Some(size) = format_file_size(part.and_then(|p| p.size)) {
        description.push_str("\n💾 ");
        description.push_str(&size);
    }
    if let Some(languages) = languages_line(media) {
        description.push('\n');
        description.push_str(&languages);
    }
    description
}

/// External subtitle tracks, rendered under the same proxy rule as the video
fn external_subtitles(
    media: &PlexMedia,
    config: &AddonConfiguration,
    rewrite: &UrlRewrite,
) -> Vec<Subtitle> {
    let Some(part) = media.first_part() else {
        return Vec::new();
    };
    part.streams
        .iter()
        .filter(|s| s.stream_type == STREAM_TYPE_SUBTITLE)
        .filter_map(|s| {
            let key = s.key.as_deref()?;
            let url = OriginUrl::new(config.streaming_base(), key).with_token(&config.access_token);
            Some(Subtitle {
                id: s.id.clone().unwrap_or_default(),
                lang: s.display_title.clone().unwrap_or_default(),
                url: rewrite.render(&url),
            })
        })
        .collect()
}

fn binge_group(kind: CandidateKind, media: &PlexMedia) -> String {
    let resolution = media.video_resolution.as_deref().unwrap_or_default();
    match kind {
        CandidateKind::Direct => format!("Direct Play {resolution}"),
        CandidateKind::TranscodeOriginal => format!("Transcode {resolution} (original)"),
        CandidateKind::TranscodeDown(target) => format!("Transcode {}", target.params().name),
        CandidateKind::ExternalLink => String::new(),
    }
}

fn present(
    candidate: StreamCandidate,
    name: &str,
    description: &str,
    subtitles: &[Subtitle],
    media: &PlexMedia,
) -> Stream {
    if candidate.kind == CandidateKind::ExternalLink {
        return Stream {
            name: name.to_string(),
            description: EXTERNAL_LINK_DESCRIPTION.to_string(),
            url: None,
            external_url: Some(candidate.url),
            subtitles: Vec::new(),
            behavior_hints: None,
        };
    }

    Stream {
        name: name.to_string(),
        description: description.to_string(),
        url: Some(candidate.url),
        external_url: None,
        subtitles: subtitles.to_vec(),
        behavior_hints: Some(StreamBehaviorHints {
            binge_group: binge_group(candidate.kind, media),
        }),
    }
}

/// Every playable stream of `item`, media versions in origin order
pub fn streams_for(
    item: &PlexMetadata,
    config: &AddonConfiguration,
    rewrite: &UrlRewrite,
) -> Vec<Stream> {
    let mut streams = Vec::new();
    for (index, media) in item.media.iter().enumerate() {
        let name = stream_title(item, media, config);
        let description = stream_description(item, media);
        let subtitles = external_subtitles(media, config, rewrite);

        streams.extend(
            stream_urls::media_candidates(item, media, index, config, rewrite)
                .into_iter()
                .map(|c| present(c, &name, &description, &subtitles, media)),
        );
    }
    streams
}
