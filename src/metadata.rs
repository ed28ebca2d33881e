use std::sync::LazyLock;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, ExtractionStep, Result};
use crate::http::HttpClient;
use crate::{InnerTubeCredentials, VideoMetadata};

pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
pub const DEFAULT_CLIENT_VERSION: &str = "2.20250710.09.00";

const TITLE_SUFFIX: &str = " - YouTube";

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<title>(.*?)</title>").expect("valid title regex"));
static UNREAD_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\d+\)\s*").expect("valid unread prefix regex"));
static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([a-zA-Z0-9_\-]+)""#).expect("valid api key regex"));
static CLIENT_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""INNERTUBE_CLIENT_VERSION"\s*:\s*"([\d.]+)""#).expect("valid client version regex")
});
static PLAYER_RESPONSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ytInitialPlayerResponse\s*=\s*").expect("valid player response regex"));

/// Metadata plus the player response the caption listing is read from
#[derive(Debug, Clone)]
pub struct ResolvedVideo {
    pub metadata: VideoMetadata,
    pub player_response: serde_json::Value,
}

/// A way of turning a video identifier into title and player response
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, http: &dyn HttpClient, video_id: &str) -> Result<ResolvedVideo>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Scrape the player response embedded in the watch page
    Page,
    /// Query the InnerTube player endpoint with page-embedded credentials
    #[default]
    #[value(name = "innertube")]
    #[serde(alias = "api")]
    InnerTube,
}

impl Strategy {
    pub fn into_source(self, base_url: &str) -> Box<dyn MetadataSource> {
        match self {
            Strategy::Page => Box::new(PageEmbeddedSource::new(base_url)),
            Strategy::InnerTube => Box::new(InnerTubeSource::new(base_url)),
        }
    }
}

/// Reads `ytInitialPlayerResponse` straight out of the watch page
#[derive(Debug, Clone)]
pub struct PageEmbeddedSource {
    base_url: String,
}

impl PageEmbeddedSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MetadataSource for PageEmbeddedSource {
    fn name(&self) -> &'static str {
        "page"
    }

    async fn resolve(&self, http: &dyn HttpClient, video_id: &str) -> Result<ResolvedVideo> {
        let html = http.get_text(&watch_url(&self.base_url, video_id)).await?;
        let title = extract_title(&html)?;

        let blob = extract_player_response(&html)?;
        let player_response: serde_json::Value = serde_json::from_str(blob)
            .map_err(|e| Error::extraction(ExtractionStep::PlayerJson, format!("invalid embedded JSON: {e}")))?;
        debug!("Parsed embedded player response ({} bytes)", blob.len());

        Ok(ResolvedVideo {
            metadata: VideoMetadata {
                title,
                credentials: None,
            },
            player_response,
        })
    }
}

/// Pulls InnerTube credentials from the watch page, then asks the player endpoint
#[derive(Debug, Clone)]
pub struct InnerTubeSource {
    base_url: String,
}

impl InnerTubeSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn player_url(&self, api_key: &str) -> String {
        format!("{}/youtubei/v1/player?key={api_key}", self.base_url)
    }
}

#[async_trait]
impl MetadataSource for InnerTubeSource {
    fn name(&self) -> &'static str {
        "innertube"
    }

    async fn resolve(&self, http: &dyn HttpClient, video_id: &str) -> Result<ResolvedVideo> {
        let html = http.get_text(&watch_url(&self.base_url, video_id)).await?;
        let credentials = extract_credentials(&html)?;
        let title = extract_title(&html)?;
        debug!("InnerTube client version: {}", credentials.client_version);

        let body = player_request_body(video_id, &credentials.client_version);
        let player_response = http.post_json(&self.player_url(&credentials.api_key), &body).await?;
        if !player_response.is_object() {
            return Err(Error::extraction(
                ExtractionStep::ResponseBody,
                "player response is not a JSON object",
            ));
        }

        Ok(ResolvedVideo {
            metadata: VideoMetadata {
                title,
                credentials: Some(credentials),
            },
            player_response,
        })
    }
}

fn watch_url(base_url: &str, video_id: &str) -> String {
    format!("{base_url}/watch?v={video_id}")
}

fn player_request_body(video_id: &str, client_version: &str) -> serde_json::Value {
    serde_json::json!({
        "context": {
            "client": {
                "clientName": "WEB",
                "clientVersion": client_version
            }
        },
        "videoId": video_id
    })
}

/// Page title with the site suffix and a leading `(N)` notification count removed
pub fn extract_title(html: &str) -> Result<String> {
    let caps = TITLE_RE
        .captures(html)
        .ok_or_else(|| Error::extraction(ExtractionStep::Title, "no <title> element in page"))?;
    let decoded = html_escape::decode_html_entities(&caps[1]).to_string();
    let trimmed = decoded.trim();
    let without_suffix = trimmed.strip_suffix(TITLE_SUFFIX).unwrap_or(trimmed);
    Ok(UNREAD_PREFIX_RE.replace(without_suffix, "").trim().to_string())
}

pub fn extract_credentials(html: &str) -> Result<InnerTubeCredentials> {
    let api_key = API_KEY_RE
        .captures(html)
        .map(|c| c[1].to_string())
        .ok_or_else(|| Error::extraction(ExtractionStep::ApiKey, "INNERTUBE_API_KEY not found in page"))?;
    let client_version = CLIENT_VERSION_RE
        .captures(html)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| DEFAULT_CLIENT_VERSION.to_string());
    Ok(InnerTubeCredentials { api_key, client_version })
}

/// Locate the `ytInitialPlayerResponse = {...}` object and return its exact JSON text.
///
/// Braces are balanced while skipping over string literals, so nested objects
/// and `}` inside strings do not end the scan early.
pub fn extract_player_response(html: &str) -> Result<&str> {
    let marker = PLAYER_RESPONSE_RE
        .find(html)
        .ok_or_else(|| Error::extraction(ExtractionStep::PlayerJson, "ytInitialPlayerResponse not found in page"))?;
    let rest = &html[marker.end()..];
    if !rest.starts_with('{') {
        return Err(Error::extraction(
            ExtractionStep::PlayerJson,
            "ytInitialPlayerResponse is not assigned an object",
        ));
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, b) in rest.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&rest[..=i]);
                }
            }
            _ => {}
        }
    }

    Err(Error::extraction(
        ExtractionStep::PlayerJson,
        "unterminated ytInitialPlayerResponse object",
    ))
}
