pub mod config;
pub mod error;
pub mod http;
pub mod metadata;
pub mod output;
pub mod parser;
pub mod ranker;
pub mod session;
pub mod timestamp;
pub mod tracks;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub use error::{Error, ExtractionStep, Result};
pub use session::TranscriptSession;

/// Language the ranker prefers when nothing else is configured
pub const DEFAULT_LANGUAGE: &str = "English";

/// Tokens needed to query the InnerTube player endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerTubeCredentials {
    pub api_key: String,
    pub client_version: String,
}

/// Page-level metadata resolved once per video identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub credentials: Option<InnerTubeCredentials>,
}

/// One fetchable caption stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_label: String,
}

/// A single timed-text element
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub offset_seconds: f64,
    pub duration_seconds: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn start(&self) -> String {
        timestamp::format_timestamp(self.offset_seconds)
    }

    pub fn duration(&self) -> String {
        timestamp::format_timestamp(self.duration_seconds)
    }
}

/// Parsed transcript in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
}

impl std::fmt::Display for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&output::render_text(&self.segments))
    }
}

/// Result of a full acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquiredTranscript {
    pub title: String,
    pub transcript: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageOption {
    pub language: String,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
}

impl From<&CaptionTrack> for LanguageOption {
    fn from(track: &CaptionTrack) -> Self {
        LanguageOption {
            language: track.language_label.clone(),
            base_url: track.base_url.clone(),
        }
    }
}

/// Ranked languages offered for a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableLanguages {
    pub title: String,
    pub languages: Vec<LanguageOption>,
}

static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^([a-zA-Z0-9_-]{11})$",
        r"youtube\.com/watch\?(?:.*&)?v=([a-zA-Z0-9_-]{11})",
        r"youtu\.be/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid video id pattern"))
    .collect()
});

/// Extract video ID from a bare ID or the common YouTube URL shapes
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(input))
        .map(|caps| caps[1].to_string())
}
