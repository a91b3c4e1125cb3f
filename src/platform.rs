// Resource classification - decides which persona set applies to a URL

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse category assigned to a resource URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlCategory {
    /// Hosted by a known platform (YouTube, Vimeo)
    PlatformHosted,
    /// HLS/DASH manifest or segmented-delivery URL
    StreamManifest,
    /// Page that embeds a player rather than serving media directly
    GenericEmbed,
    /// Direct media file, or anything unrecognized
    Direct,
}

impl fmt::Display for UrlCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlatformHosted => write!(f, "platform-hosted"),
            Self::StreamManifest => write!(f, "stream-manifest"),
            Self::GenericEmbed => write!(f, "generic-embed"),
            Self::Direct => write!(f, "direct"),
        }
    }
}

lazy_static! {
    static ref YOUTUBE_URL: Regex = Regex::new(
        r"(?i)(?:youtube\.com/(?:watch\?|embed/|v/)|youtu\.be/)"
    )
    .unwrap();
    static ref VIMEO_URL: Regex =
        Regex::new(r"(?i)(?:^|//|www\.|player\.)vimeo\.com/").unwrap();
    static ref VIMEO_EMBED_ID: Regex = Regex::new(r"/video/(\d+)").unwrap();
    static ref VIMEO_CANONICAL_ID: Regex = Regex::new(r"vimeo\.com/(\d+)").unwrap();
}

const MANIFEST_EXTENSIONS: &[&str] = &[".m3u8", ".mpd", ".ts", ".m4s"];
const MEDIA_EXTENSIONS: &[&str] = &[".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm"];
const MANIFEST_INDICATORS: &[&str] = &["m3u8", "mpd", "segments", "chunks"];
const EMBED_INDICATORS: &[&str] = &["embed", "player", "watch", "video", "play", "stream", "aula", "lesson", "lecture"];

/// Assign a URL a coarse category. Pure, infallible; anything unrecognized
/// falls back to [`UrlCategory::Direct`].
pub fn classify_url(url: &str) -> UrlCategory {
    let lower = url.to_lowercase();

    if YOUTUBE_URL.is_match(&lower) || VIMEO_URL.is_match(&lower) {
        return UrlCategory::PlatformHosted;
    }

    // Path-only view so query strings don't trip the extension checks
    let path = lower
        .split_once('?')
        .map(|(p, _)| p)
        .unwrap_or(lower.as_str());

    if MANIFEST_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        || MANIFEST_INDICATORS.iter().any(|ind| lower.contains(ind))
    {
        return UrlCategory::StreamManifest;
    }

    if MEDIA_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return UrlCategory::Direct;
    }

    if EMBED_INDICATORS.iter().any(|ind| lower.contains(ind)) {
        return UrlCategory::GenericEmbed;
    }

    UrlCategory::Direct
}

/// Generate alternative URLs worth trying when the original fails as
/// embed-only: Vimeo player-embed URLs map to the canonical page and back.
pub fn alternate_urls(url: &str) -> Vec<String> {
    let mut alternatives = Vec::new();

    if url.contains("player.vimeo.com") {
        if let Some(caps) = VIMEO_EMBED_ID.captures(url) {
            let id = &caps[1];
            alternatives.push(format!("https://vimeo.com/{id}"));
            alternatives.push(format!("https://www.vimeo.com/{id}"));
        }
    } else if url.contains("vimeo.com") && !url.contains("/video/") {
        if let Some(caps) = VIMEO_CANONICAL_ID.captures(url) {
            alternatives.push(format!("https://player.vimeo.com/video/{}", &caps[1]));
        }
    }

    alternatives
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_urls_are_platform_hosted() {
        assert_eq!(
            classify_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            UrlCategory::PlatformHosted
        );
        assert_eq!(
            classify_url("https://youtu.be/dQw4w9WgXcQ"),
            UrlCategory::PlatformHosted
        );
    }

    #[test]
    fn vimeo_urls_are_platform_hosted() {
        assert_eq!(
            classify_url("https://vimeo.com/123456789"),
            UrlCategory::PlatformHosted
        );
        assert_eq!(
            classify_url("https://player.vimeo.com/video/123456789"),
            UrlCategory::PlatformHosted
        );
    }

    #[test]
    fn manifests_are_stream_manifest() {
        assert_eq!(
            classify_url("https://cdn.example.com/live/master.m3u8"),
            UrlCategory::StreamManifest
        );
        assert_eq!(
            classify_url("https://cdn.example.com/vod/manifest.mpd"),
            UrlCategory::StreamManifest
        );
        assert_eq!(
            classify_url("https://cdn.example.com/vod/segments/0001.bin"),
            UrlCategory::StreamManifest
        );
    }

    #[test]
    fn direct_files_are_direct() {
        assert_eq!(
            classify_url("https://example.com/files/movie.mp4"),
            UrlCategory::Direct
        );
        assert_eq!(
            classify_url("https://example.com/files/movie.mp4?token=abc"),
            UrlCategory::Direct
        );
    }

    #[test]
    fn embed_pages_are_generic_embed() {
        assert_eq!(
            classify_url("https://courses.example.com.br/aula/42"),
            UrlCategory::GenericEmbed
        );
        assert_eq!(
            classify_url("https://example.com/player/abc123"),
            UrlCategory::GenericEmbed
        );
    }

    #[test]
    fn unrecognized_falls_back_to_direct() {
        assert_eq!(classify_url("https://example.com/"), UrlCategory::Direct);
        assert_eq!(classify_url("not even a url"), UrlCategory::Direct);
    }

    #[test]
    fn embed_url_maps_to_canonical() {
        let alts = alternate_urls("https://player.vimeo.com/video/123456789");
        assert_eq!(
            alts,
            vec![
                "https://vimeo.com/123456789",
                "https://www.vimeo.com/123456789"
            ]
        );
    }

    #[test]
    fn canonical_url_maps_to_embed() {
        let alts = alternate_urls("https://vimeo.com/123456789");
        assert_eq!(alts, vec!["https://player.vimeo.com/video/123456789"]);
    }

    #[test]
    fn no_alternates_for_other_hosts() {
        assert!(alternate_urls("https://youtu.be/dQw4w9WgXcQ").is_empty());
    }
}
