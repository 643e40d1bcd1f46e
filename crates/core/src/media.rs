//! Media candidates and discovery.
//!
//! Finding the audio behind an article is heuristic: the URL may sit in an
//! `<audio>` tag, in a player script, or only appear after the page has run
//! its own scripts. [`MediaDiscoverer`] is the seam for whatever inspects the
//! rendered page; [`HtmlMediaScanner`] is a best-effort implementation over a
//! static HTML snapshot.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::page::Page;

static MEDIA_FILE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s"'<>\\]+\.(?:mp3|m4a|m3u8|wav)(?:\?[^\s"'<>\\]*)?"#).expect("valid media url pattern")
});

static HLS_PLAYLIST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s"'<>\\]+playlist\.m3u8[^\s"'<>\\]*"#).expect("valid playlist pattern")
});

/// Attributes players commonly stash their source URL in.
const DATA_ATTRIBUTES: &[(&str, &str)] = &[
    ("[data-audio]", "data-audio"),
    ("[data-src]", "data-src"),
    ("[data-url]", "data-url"),
    ("[data-video]", "data-video"),
    ("[data-file]", "data-file"),
    ("[data-media]", "data-media"),
];

/// Audio container or streaming format, derived from a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Mp3,
    M4a,
    Hls,
    Wav,
    Unknown,
}

impl MediaKind {
    /// Classifies a URL by its path suffix, ignoring query and fragment.
    pub fn from_url(url: &str) -> Self {
        let lowered = url.to_ascii_lowercase();
        let path = lowered.split(['?', '#']).next().unwrap_or_default();

        if path.ends_with(".mp3") {
            MediaKind::Mp3
        } else if path.ends_with(".m4a") {
            MediaKind::M4a
        } else if path.ends_with(".m3u8") || path.contains("playlist") {
            MediaKind::Hls
        } else if path.ends_with(".wav") {
            MediaKind::Wav
        } else {
            MediaKind::Unknown
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Mp3 => "mp3",
            MediaKind::M4a => "m4a",
            MediaKind::Hls => "hls",
            MediaKind::Wav => "wav",
            MediaKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A discovered media URL that has not been confirmed playable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaCandidate {
    pub url: String,
}

impl MediaCandidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Media kind, derived from the URL on each call.
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_url(&self.url)
    }
}

/// Inspects a rendered document for candidate media URLs.
///
/// Called at scheduled checkpoints (see [`crate::discovery`]); an empty
/// result means "nothing yet", not "nothing ever".
#[async_trait]
pub trait MediaDiscoverer: Send + Sync {
    async fn discover(&self) -> Result<Vec<String>>;
}

/// Removes duplicate URLs, keeping the first occurrence of each.
pub fn dedupe_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(Into::into)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Undo the escaping that URLs pick up inside inline scripts and JSON blobs
fn clean_url(raw: &str) -> String {
    raw.replace("\\u0026", "&")
        .replace('\\', "")
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}

fn looks_like_media(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    (lowered.starts_with("http://") || lowered.starts_with("https://"))
        && [".mp3", ".m4a", ".m3u8", ".wav", "playlist"].iter().any(|m| lowered.contains(m))
}

/// Scans an HTML source snapshot for media URLs.
#[derive(Debug, Clone)]
pub struct HtmlMediaScanner {
    html: String,
}

impl HtmlMediaScanner {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Candidate URLs in discovery order: media element sources first, then
    /// URLs found anywhere in the markup or inline scripts.
    pub fn scan(&self) -> Vec<String> {
        let mut found = Vec::new();

        let page = Page::parse(&self.html);
        let attribute_sources = [
            ("audio[src], audio source[src], video[src], video source[src]", "src"),
            (r#"a[href*=".mp3"], a[href*=".m4a"], a[href*=".m3u8"], a[href*=".wav"]"#, "href"),
        ]
        .into_iter()
        .chain(DATA_ATTRIBUTES.iter().map(|(selector, attr)| (*selector, *attr)));

        for (selector, attr) in attribute_sources {
            if let Ok(values) = page.attr_values(selector, attr) {
                found.extend(values);
            }
        }

        let source = self.html.replace("\\u0026", "&").replace("\\/", "/");
        found.extend(MEDIA_FILE_URL.find_iter(&source).map(|m| m.as_str().to_string()));
        found.extend(HLS_PLAYLIST_URL.find_iter(&source).map(|m| m.as_str().to_string()));

        dedupe_urls(found.iter().map(|u| clean_url(u)).filter(|u| looks_like_media(u)))
    }
}

#[async_trait]
impl MediaDiscoverer for HtmlMediaScanner {
    async fn discover(&self) -> Result<Vec<String>> {
        Ok(self.scan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://cdn.example.com/a/episode.mp3", MediaKind::Mp3)]
    #[case("https://cdn.example.com/a/episode.MP3?sig=1", MediaKind::Mp3)]
    #[case("https://cdn.example.com/a/episode.m4a", MediaKind::M4a)]
    #[case("https://cdn.example.com/hls/master.m3u8", MediaKind::Hls)]
    #[case("https://cdn.example.com/vod/playlist.m3u8?token=x", MediaKind::Hls)]
    #[case("https://cdn.example.com/a/clip.wav", MediaKind::Wav)]
    #[case("https://cdn.example.com/a/stream", MediaKind::Unknown)]
    #[case("https://cdn.example.com/a/page.html?file=x.mp3", MediaKind::Unknown)]
    fn test_media_kind_from_url(#[case] url: &str, #[case] expected: MediaKind) {
        assert_eq!(MediaCandidate::new(url).kind(), expected);
    }

    #[test]
    fn test_dedupe_preserves_order() {
        assert_eq!(dedupe_urls(["b", "a", "b", "c", "a"]), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_scan_audio_element_first() {
        let html = r#"
            <html><body>
            <script>var cfg = {"file": "https:\/\/cdn.example.com\/podcast\/ep1.mp3"};</script>
            <audio src="https://audio.example.com/ep1.m4a"></audio>
            </body></html>
        "#;
        let urls = HtmlMediaScanner::new(html).scan();
        assert_eq!(urls[0], "https://audio.example.com/ep1.m4a");
        assert!(urls.contains(&"https://cdn.example.com/podcast/ep1.mp3".to_string()));
    }

    #[test]
    fn test_scan_unescapes_ampersands() {
        let html = r#"<script>player.load("https://cdn.example.com/v/playlist.m3u8?a=1\u0026b=2")</script>"#;
        let urls = HtmlMediaScanner::new(html).scan();
        assert_eq!(urls, vec!["https://cdn.example.com/v/playlist.m3u8?a=1&b=2"]);
    }

    #[test]
    fn test_scan_links_and_data_attributes() {
        let html = r#"
            <a href="https://cdn.example.com/dl/ep2.mp3">Tải về</a>
            <div class="player" data-file="https://cdn.example.com/hls/ep2/playlist.m3u8"></div>
            <img data-src="https://cdn.example.com/img/cover.jpg">
        "#;
        let urls = HtmlMediaScanner::new(html).scan();
        assert_eq!(
            urls,
            vec!["https://cdn.example.com/dl/ep2.mp3", "https://cdn.example.com/hls/ep2/playlist.m3u8"]
        );
    }

    #[test]
    fn test_scan_ignores_relative_and_non_media() {
        let html = r#"<audio src="/local/file.mp3"></audio><a href="https://example.com/page">x</a>"#;
        assert!(HtmlMediaScanner::new(html).scan().is_empty());
    }

    #[tokio::test]
    async fn test_discover_wraps_scan() {
        let scanner = HtmlMediaScanner::new(r#"<audio src="https://a.example.com/x.wav"></audio>"#);
        assert_eq!(scanner.discover().await.unwrap(), vec!["https://a.example.com/x.wav"]);
    }
}
