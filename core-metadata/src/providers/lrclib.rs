//! LRCLib lyrics provider.
//!
//! Searches `https://lrclib.net/api/search` by track, artist and album and
//! picks the richest, closest match with [`select_best_match`].

use crate::error::{MetadataError, Result};
use crate::kind::LyricsKind;
use crate::provider::Provider;
use crate::selector::{select_best_match, CandidateTrack};
use crate::song::Song;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::logging::abbreviate;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const LRCLIB_PROVIDER_ID: &str = "lrclib";
const DEFAULT_BASE_URL: &str = "https://lrclib.net/api";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LrcLibTrack {
    #[serde(default)]
    track_name: String,
    #[serde(default)]
    artist_name: String,
    #[serde(default)]
    album_name: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    synced_lyrics: Option<String>,
    plain_lyrics: Option<String>,
}

impl From<LrcLibTrack> for CandidateTrack {
    fn from(track: LrcLibTrack) -> Self {
        CandidateTrack {
            track_name: track.track_name,
            artist_name: track.artist_name,
            album_name: track.album_name.unwrap_or_default(),
            duration: track.duration.unwrap_or_default(),
            synced_lyrics: track.synced_lyrics,
            plain_lyrics: track.plain_lyrics,
        }
    }
}

pub struct LrcLibProvider {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    user_agent: Option<String>,
    in_flight: AtomicBool,
}

impl LrcLibProvider {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Point at a mirror or a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// LRCLib asks clients to identify themselves.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn search_request(&self, song: &Song) -> HttpRequest {
        let request = HttpRequest::new(HttpMethod::Get, format!("{}/search", self.base_url))
            .query("track_name", song.name.trim())
            .query("artist_name", song.artist.trim())
            .query("album_name", song.album.trim());

        match &self.user_agent {
            Some(agent) => request.header("User-Agent", agent.as_str()),
            None => request,
        }
    }

    async fn search(&self, song: &Song) -> Result<Option<String>> {
        let response = self.http_client.execute(self.search_request(song)).await?;

        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(MetadataError::LyricsFetchFailed(format!(
                "LRCLib API error: HTTP {}",
                response.status
            )));
        }

        let tracks: Vec<LrcLibTrack> = response
            .json()
            .map_err(|e| MetadataError::LyricsFetchFailed(format!("Parse error: {}", e)))?;
        let candidates: Vec<CandidateTrack> = tracks.into_iter().map(Into::into).collect();

        let best = select_best_match(&candidates, song.duration);
        debug!(
            candidates = candidates.len(),
            matched = best.map(|c| c.track_name.as_str()).unwrap_or(""),
            "LRCLib search finished"
        );

        let lyrics = best.and_then(|c| c.best_lyrics());
        if let Some(text) = lyrics {
            debug!(preview = %abbreviate(text, 40), "LRCLib lyrics selected");
        }
        Ok(lyrics.map(str::to_string))
    }
}

/// Clears the busy flag when a fetch ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[async_trait]
impl Provider<LyricsKind> for LrcLibProvider {
    fn id(&self) -> &str {
        LRCLIB_PROVIDER_ID
    }

    async fn is_available(&self) -> bool {
        self.http_client.is_connected().await
    }

    async fn supports(&self, song: &Song) -> bool {
        song.is_identified()
    }

    async fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    async fn fetch(&self, song: &Song, cancel: CancellationToken) -> Result<Option<String>> {
        self.in_flight.store(true, Ordering::Release);
        let _guard = InFlight(&self.in_flight);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(song = %song.identity(), "LRCLib request cancelled");
                Ok(None)
            }
            result = self.search(song) => result,
        }
    }
}
