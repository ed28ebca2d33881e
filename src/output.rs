use eyre::Result;
use serde::Serialize;

use crate::TranscriptSegment;

/// Render segments as the canonical transcript: one line per segment, no trailing newline
pub fn render_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("Start: {}, Duration: {}, Text: {}", s.start(), s.duration(), s.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render any result shape as pretty JSON
pub fn render_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
