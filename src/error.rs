use std::fmt;

use thiserror::Error;

/// Which extraction step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStep {
    Title,
    ApiKey,
    PlayerJson,
    CaptionTracks,
    ResponseBody,
}

impl fmt::Display for ExtractionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStep::Title => write!(f, "title"),
            ExtractionStep::ApiKey => write!(f, "api key"),
            ExtractionStep::PlayerJson => write!(f, "player json"),
            ExtractionStep::CaptionTracks => write!(f, "caption tracks"),
            ExtractionStep::ResponseBody => write!(f, "response body"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("extraction failed at {step}: {detail}")]
    Extraction { step: ExtractionStep, detail: String },

    #[error("no captions available for video {video_id}")]
    NoCaptions { video_id: String },
}

impl Error {
    pub(crate) fn fetch(url: &str, reason: impl fmt::Display) -> Self {
        Error::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn extraction(step: ExtractionStep, detail: impl Into<String>) -> Self {
        Error::Extraction {
            step,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
