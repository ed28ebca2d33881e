use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::metadata::MetadataSource;
use crate::parser::parse_timed_text;
use crate::ranker::rank_tracks;
use crate::tracks::resolve_tracks;
use crate::{AcquiredTranscript, AvailableLanguages, CaptionTrack, LanguageOption, Transcript};

/// Where the most recent request stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ResolvingMetadata,
    ResolvingTracks,
    FetchingTranscript,
    Parsing,
    Ready,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::ResolvingMetadata => "resolving metadata",
            Stage::ResolvingTracks => "resolving tracks",
            Stage::FetchingTranscript => "fetching transcript",
            Stage::Parsing => "parsing",
            Stage::Ready => "ready",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
struct SessionState {
    token: u64,
    stage: Stage,
    video_id: Option<String>,
    language: Option<String>,
    tracks: Vec<CaptionTrack>,
}

/// Drives acquisition for one viewer, delivering only the latest request's result.
///
/// Every `acquire`/`fetch_for_language` call takes a fresh token; a result is
/// handed back only if its token is still current when it is ready.
pub struct TranscriptSession {
    http: Arc<dyn HttpClient>,
    source: Box<dyn MetadataSource>,
    desired_language: String,
    state: Mutex<SessionState>,
}

impl TranscriptSession {
    pub fn new(http: Arc<dyn HttpClient>, source: Box<dyn MetadataSource>, desired_language: &str) -> Self {
        Self {
            http,
            source,
            desired_language: desired_language.to_string(),
            state: Mutex::new(SessionState {
                token: 0,
                stage: Stage::Idle,
                video_id: None,
                language: None,
                tracks: Vec::new(),
            }),
        }
    }

    pub fn desired_language(&self) -> &str {
        &self.desired_language
    }

    pub fn stage(&self) -> Stage {
        self.lock().stage
    }

    pub fn current_video_id(&self) -> Option<String> {
        self.lock().video_id.clone()
    }

    pub fn current_language(&self) -> Option<String> {
        self.lock().language.clone()
    }

    pub fn current_tracks(&self) -> Vec<CaptionTrack> {
        self.lock().tracks.clone()
    }

    /// Title and transcript of the best-ranked track, or `None` on any failure
    /// or if a newer request superseded this one.
    pub async fn acquire(&self, video_id: &str) -> Option<AcquiredTranscript> {
        let token = self.begin(Some(video_id));
        info!("Acquiring transcript for {video_id} via {} source", self.source.name());

        match self.run_acquire(video_id, token).await {
            Ok((title, tracks, transcript)) => {
                let language = tracks.first().map(|t| t.language_label.clone());
                let delivered = self.deliver(token, |state| {
                    state.language = language;
                    state.tracks = tracks;
                });
                if !delivered {
                    debug!("Discarding superseded transcript for {video_id}");
                    return None;
                }
                Some(AcquiredTranscript {
                    title,
                    transcript: transcript.to_string(),
                })
            }
            Err(e) => {
                warn!("Transcript acquisition failed for {video_id}: {e}");
                self.fail(token);
                None
            }
        }
    }

    /// Ranked language list for `video_id` without fetching any timed text.
    ///
    /// A video without captions yields an empty list; other failures yield `None`.
    pub async fn list_available_languages(&self, video_id: &str) -> Option<AvailableLanguages> {
        let resolved = match self.source.resolve(self.http.as_ref(), video_id).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Could not resolve metadata for {video_id}: {e}");
                return None;
            }
        };

        let languages = match resolve_tracks(&resolved.player_response, video_id) {
            Ok(tracks) => rank_tracks(&tracks, &self.desired_language)
                .iter()
                .map(LanguageOption::from)
                .collect(),
            Err(Error::NoCaptions { .. }) => {
                debug!("No caption tracks for {video_id}");
                Vec::new()
            }
            Err(e) => {
                warn!("Could not resolve caption tracks for {video_id}: {e}");
                return None;
            }
        };

        Some(AvailableLanguages {
            title: resolved.metadata.title,
            languages,
        })
    }

    /// Fetch one specific track for the current video, skipping metadata resolution
    pub async fn fetch_for_language(&self, base_url: &str) -> Option<String> {
        let token = self.begin(None);

        match self.fetch_transcript(base_url, token).await {
            Ok(transcript) => {
                let delivered = self.deliver(token, |state| {
                    if let Some(track) = state.tracks.iter().find(|t| t.base_url == base_url) {
                        state.language = Some(track.language_label.clone());
                    }
                });
                if !delivered {
                    debug!("Discarding superseded transcript for {base_url}");
                    return None;
                }
                Some(transcript.to_string())
            }
            Err(e) => {
                warn!("Transcript fetch failed for {base_url}: {e}");
                self.fail(token);
                None
            }
        }
    }

    async fn run_acquire(&self, video_id: &str, token: u64) -> Result<(String, Vec<CaptionTrack>, Transcript)> {
        let resolved = self.source.resolve(self.http.as_ref(), video_id).await?;

        self.advance(token, Stage::ResolvingTracks);
        let tracks = resolve_tracks(&resolved.player_response, video_id)?;
        let ranked = rank_tracks(&tracks, &self.desired_language);
        let best = ranked.first().ok_or_else(|| Error::NoCaptions {
            video_id: video_id.to_string(),
        })?;
        debug!("Selected caption track '{}' for {video_id}", best.language_label);

        let transcript = self.fetch_transcript(&best.base_url, token).await?;
        Ok((resolved.metadata.title, ranked, transcript))
    }

    async fn fetch_transcript(&self, base_url: &str, token: u64) -> Result<Transcript> {
        self.advance(token, Stage::FetchingTranscript);
        let xml = self.http.get_text(base_url).await?;

        self.advance(token, Stage::Parsing);
        parse_timed_text(&xml)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new request; a new video id discards the previous video's state
    fn begin(&self, video_id: Option<&str>) -> u64 {
        let mut state = self.lock();
        state.token += 1;
        if let Some(id) = video_id {
            if state.video_id.as_deref() != Some(id) {
                state.language = None;
                state.tracks.clear();
            }
            state.video_id = Some(id.to_string());
            state.stage = Stage::ResolvingMetadata;
        } else {
            state.stage = Stage::FetchingTranscript;
        }
        state.token
    }

    fn advance(&self, token: u64, stage: Stage) {
        let mut state = self.lock();
        if state.token == token {
            debug!("Session stage: {stage}");
            state.stage = stage;
        }
    }

    fn fail(&self, token: u64) {
        self.advance(token, Stage::Failed);
    }

    fn deliver(&self, token: u64, update: impl FnOnce(&mut SessionState)) -> bool {
        let mut state = self.lock();
        if state.token != token {
            return false;
        }
        update(&mut *state);
        state.stage = Stage::Ready;
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::fake::FakeHttp;
    use crate::metadata::{InnerTubeSource, PageEmbeddedSource};

    const BASE: &str = "https://yt.test";

    fn watch(id: &str) -> String {
        format!("{BASE}/watch?v={id}")
    }

    fn player(id: &str) -> String {
        format!("{BASE}/youtubei/v1/player?key=KEY-{id}")
    }

    fn page(id: &str, title: &str) -> String {
        format!(r#"<title>{title} - YouTube</title><script>ytcfg.set({{"INNERTUBE_API_KEY":"KEY-{id}"}});</script>"#)
    }

    fn player_response(id: &str) -> serde_json::Value {
        json!({
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": format!("https://cc.test/{id}?lang=es"), "name": {"simpleText": "Spanish"}},
                {"baseUrl": format!("https://cc.test/{id}?lang=en\\u0026kind=asr"), "name": {"simpleText": "English (auto-generated)"}},
                {"baseUrl": format!("https://cc.test/{id}?lang=en"), "name": {"simpleText": "English"}}
            ]}}
        })
    }

    fn timed_text(word: &str) -> String {
        format!(r#"<transcript><text start="0.5" dur="2.0">{word} one</text><text start="65.2" dur="1.1">{word} two</text></transcript>"#)
    }

    fn video(http: FakeHttp, id: &str, title: &str) -> FakeHttp {
        http.page(&watch(id), &page(id, title))
            .json(&player(id), player_response(id))
            .page(&format!("https://cc.test/{id}?lang=en"), &timed_text("en"))
            .page(&format!("https://cc.test/{id}?lang=es"), &timed_text("es"))
    }

    fn session(http: FakeHttp) -> (Arc<TranscriptSession>, Arc<FakeHttp>) {
        let http = Arc::new(http);
        let s = TranscriptSession::new(http.clone(), Box::new(InnerTubeSource::new(BASE)), "English");
        (Arc::new(s), http)
    }

    #[tokio::test]
    async fn test_acquire_picks_exact_language() {
        let (s, _) = session(video(FakeHttp::new(), "aaa", "First Video"));
        let got = s.acquire("aaa").await.unwrap();
        assert_eq!(got.title, "First Video");
        assert_eq!(
            got.transcript,
            "Start: 0:00, Duration: 0:02, Text: en one\nStart: 1:05, Duration: 0:01, Text: en two"
        );
        assert_eq!(s.stage(), Stage::Ready);
        assert_eq!(s.current_video_id().as_deref(), Some("aaa"));
        assert_eq!(s.current_language().as_deref(), Some("English"));
        let labels: Vec<_> = s.current_tracks().into_iter().map(|t| t.language_label).collect();
        assert_eq!(labels, vec!["English", "English (auto-generated)", "Spanish"]);
    }

    #[tokio::test]
    async fn test_acquire_page_fetch_failure_is_absent() {
        let (s, _) = session(FakeHttp::new());
        assert!(s.acquire("missing").await.is_none());
        assert_eq!(s.stage(), Stage::Failed);
    }

    #[tokio::test]
    async fn test_acquire_transcript_fetch_failure_is_absent() {
        let http = FakeHttp::new()
            .page(&watch("aaa"), &page("aaa", "T"))
            .json(&player("aaa"), player_response("aaa"));
        let (s, _) = session(http);
        assert!(s.acquire("aaa").await.is_none());
        assert!(s.current_tracks().is_empty());
    }

    #[tokio::test]
    async fn test_acquire_without_captions_is_absent() {
        let http = FakeHttp::new()
            .page(&watch("aaa"), &page("aaa", "T"))
            .json(&player("aaa"), json!({"captions": {"playerCaptionsTracklistRenderer": {"captionTracks": []}}}));
        let (s, _) = session(http);
        assert!(s.acquire("aaa").await.is_none());
    }

    #[tokio::test]
    async fn test_acquire_with_page_source() {
        let blob = player_response("aaa").to_string();
        let html = format!("<title>(12) Embedded - YouTube</title><script>var ytInitialPlayerResponse = {blob};</script>");
        let http = Arc::new(
            FakeHttp::new()
                .page(&watch("aaa"), &html)
                .page("https://cc.test/aaa?lang=en", &timed_text("en")),
        );
        let s = TranscriptSession::new(http, Box::new(PageEmbeddedSource::new(BASE)), "english");
        let got = s.acquire("aaa").await.unwrap();
        assert_eq!(got.title, "Embedded");
        assert!(got.transcript.starts_with("Start: 0:00, Duration: 0:02, Text: en one"));
    }

    #[tokio::test]
    async fn test_list_available_languages() {
        let (s, http) = session(video(FakeHttp::new(), "aaa", "First Video"));
        let langs = s.list_available_languages("aaa").await.unwrap();
        assert_eq!(langs.title, "First Video");
        assert_eq!(langs.languages.len(), 3);
        assert_eq!(langs.languages[0].language, "English");
        assert_eq!(langs.languages[0].base_url, "https://cc.test/aaa?lang=en");
        assert_eq!(langs.languages[1].base_url, "https://cc.test/aaa?lang=en&kind=asr");
        assert_eq!(http.request_count("https://cc.test/aaa?lang=en"), 0);
        assert_eq!(s.stage(), Stage::Idle);
    }

    #[tokio::test]
    async fn test_list_available_languages_empty() {
        let http = FakeHttp::new()
            .page(&watch("aaa"), &page("aaa", "Silent"))
            .json(&player("aaa"), json!({"playabilityStatus": {"status": "OK"}}));
        let (s, _) = session(http);
        let langs = s.list_available_languages("aaa").await.unwrap();
        assert_eq!(langs.title, "Silent");
        assert!(langs.languages.is_empty());
    }

    #[tokio::test]
    async fn test_list_available_languages_empty_track_array() {
        let http = FakeHttp::new()
            .page(&watch("aaa"), &page("aaa", "Silent"))
            .json(&player("aaa"), json!({"captions": {"playerCaptionsTracklistRenderer": {"captionTracks": []}}}));
        let (s, _) = session(http);
        let langs = s.list_available_languages("aaa").await.unwrap();
        assert_eq!(langs.title, "Silent");
        assert!(langs.languages.is_empty());
    }

    #[tokio::test]
    async fn test_list_available_languages_failure_is_absent() {
        let (s, _) = session(FakeHttp::new());
        assert!(s.list_available_languages("aaa").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_for_language_switches_track() {
        let (s, _) = session(video(FakeHttp::new(), "aaa", "First Video"));
        s.acquire("aaa").await.unwrap();
        let spanish = s.fetch_for_language("https://cc.test/aaa?lang=es").await.unwrap();
        assert!(spanish.contains("Text: es one"));
        assert_eq!(s.current_language().as_deref(), Some("Spanish"));
        assert_eq!(s.current_video_id().as_deref(), Some("aaa"));
    }

    #[tokio::test]
    async fn test_fetch_for_language_failure_is_absent() {
        let (s, _) = session(FakeHttp::new());
        assert!(s.fetch_for_language("https://cc.test/nope").await.is_none());
    }

    #[tokio::test]
    async fn test_newer_acquire_supersedes_older() {
        let (http, gate) = video(video(FakeHttp::new(), "aaa", "Old"), "bbb", "New").gate(&watch("aaa"));
        let (s, http) = session(http);

        let older = tokio::spawn({
            let s = s.clone();
            async move { s.acquire("aaa").await }
        });
        while http.request_count(&watch("aaa")) == 0 {
            tokio::task::yield_now().await;
        }

        let newer = s.acquire("bbb").await.unwrap();
        assert_eq!(newer.title, "New");

        gate.notify_one();
        assert!(older.await.unwrap().is_none());
        assert_eq!(s.current_video_id().as_deref(), Some("bbb"));
        assert_eq!(s.stage(), Stage::Ready);
        assert!(s.current_tracks().iter().all(|t| t.base_url.contains("/bbb")));
    }

    #[tokio::test]
    async fn test_acquire_supersedes_pending_language_fetch() {
        let spanish = "https://cc.test/aaa?lang=es";
        let (http, gate) = video(video(FakeHttp::new(), "aaa", "Old"), "bbb", "New").gate(spanish);
        let (s, http) = session(http);
        s.acquire("aaa").await.unwrap();

        let pending = tokio::spawn({
            let s = s.clone();
            async move { s.fetch_for_language(spanish).await }
        });
        while http.request_count(spanish) == 0 {
            tokio::task::yield_now().await;
        }

        let newer = s.acquire("bbb").await.unwrap();
        assert_eq!(newer.title, "New");

        gate.notify_one();
        assert!(pending.await.unwrap().is_none());
        assert_eq!(s.current_video_id().as_deref(), Some("bbb"));
        assert_eq!(s.current_language().as_deref(), Some("English"));
        assert_eq!(s.stage(), Stage::Ready);
    }

    #[tokio::test]
    async fn test_new_video_discards_language_state() {
        let (s, _) = session(video(video(FakeHttp::new(), "aaa", "A"), "bbb", "B"));
        s.acquire("aaa").await.unwrap();
        s.fetch_for_language("https://cc.test/aaa?lang=es").await.unwrap();
        assert_eq!(s.current_language().as_deref(), Some("Spanish"));

        s.acquire("bbb").await.unwrap();
        assert_eq!(s.current_language().as_deref(), Some("English"));
        assert!(s.current_tracks().iter().all(|t| t.base_url.contains("/bbb")));
    }
}
