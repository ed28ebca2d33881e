use log::{debug, warn};
use serde::Deserialize;

use crate::CaptionTrack;
use crate::error::{Error, ExtractionStep, Result};

#[derive(Debug, Deserialize)]
struct RawCaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: Option<String>,
    name: Option<RawTrackName>,
}

#[derive(Debug, Deserialize)]
struct RawTrackName {
    #[serde(rename = "simpleText")]
    simple_text: Option<String>,
    runs: Option<Vec<RawRun>>,
}

#[derive(Debug, Deserialize)]
struct RawRun {
    text: Option<String>,
}

impl RawTrackName {
    fn label(&self) -> String {
        if let Some(ref text) = self.simple_text {
            return text.trim().to_string();
        }
        self.runs
            .iter()
            .flatten()
            .filter_map(|r| r.text.as_deref())
            .collect::<String>()
            .trim()
            .to_string()
    }
}

/// Read `captions.playerCaptionsTracklistRenderer.captionTracks` from a player
/// response and normalize every entry into a fetchable `CaptionTrack`.
///
/// The returned list is in source order; ranking happens separately.
pub fn resolve_tracks(player_response: &serde_json::Value, video_id: &str) -> Result<Vec<CaptionTrack>> {
    let raw = player_response
        .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
        .ok_or_else(|| Error::NoCaptions {
            video_id: video_id.to_string(),
        })?;

    let entries = raw.as_array().ok_or_else(|| {
        Error::extraction(ExtractionStep::CaptionTracks, "captionTracks is not an array")
    })?;

    let mut tracks = Vec::with_capacity(entries.len());
    for entry in entries {
        let parsed: RawCaptionTrack = match serde_json::from_value(entry.clone()) {
            Ok(p) => p,
            Err(e) => {
                warn!("Skipping malformed caption track entry: {e}");
                continue;
            }
        };
        let Some(base_url) = parsed.base_url else {
            warn!("Skipping caption track without baseUrl");
            continue;
        };
        let label = parsed.name.map(|n| n.label()).unwrap_or_default();
        if label.is_empty() {
            warn!("Skipping caption track without a language label: {base_url}");
            continue;
        }
        tracks.push(CaptionTrack {
            base_url: decode_track_url(&base_url)?,
            language_label: label,
        });
    }

    if tracks.is_empty() {
        return Err(Error::NoCaptions {
            video_id: video_id.to_string(),
        });
    }

    debug!("Resolved {} caption tracks for {video_id}", tracks.len());
    Ok(tracks)
}

/// Undo embedding escapes and percent-encoding so the URL is directly fetchable
pub fn decode_track_url(raw: &str) -> Result<String> {
    let unescaped = raw.replace("\\u0026", "&").replace("&amp;", "&");
    urlencoding::decode(&unescaped)
        .map(|s| s.into_owned())
        .map_err(|e| Error::extraction(ExtractionStep::CaptionTracks, format!("undecodable track url: {e}")))
}
