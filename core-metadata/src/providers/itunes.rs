//! iTunes Search artwork provider.
//!
//! Looks the song's album up through the public iTunes Search API and returns
//! one variant per matching album, upscaled to the configured size.

use crate::cache::ArtworkVariant;
use crate::error::{MetadataError, Result};
use crate::kind::ArtworkKind;
use crate::provider::Provider;
use crate::song::Song;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const ITUNES_PROVIDER_ID: &str = "itunes";
const DEFAULT_BASE_URL: &str = "https://itunes.apple.com";
const SEARCH_LIMIT: &str = "5";
const THUMBNAIL_SIZE: &str = "100x100bb";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<AlbumResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlbumResult {
    collection_id: Option<u64>,
    collection_name: Option<String>,
    #[serde(default)]
    artist_name: String,
    artwork_url100: Option<String>,
}

pub struct ItunesArtworkProvider {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    size: u32,
}

impl ItunesArtworkProvider {
    pub fn new(http_client: Arc<dyn HttpClient>, size: u32) -> Self {
        Self {
            http_client,
            base_url: DEFAULT_BASE_URL.to_string(),
            size,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn search_request(&self, song: &Song) -> HttpRequest {
        // Album title narrows the search better than the track title
        let subject = if song.album.trim().is_empty() {
            song.name.trim()
        } else {
            song.album.trim()
        };
        let term = format!("{} {}", song.artist.trim(), subject);

        HttpRequest::new(HttpMethod::Get, format!("{}/search", self.base_url))
            .query("term", &term)
            .query("entity", "album")
            .query("limit", SEARCH_LIMIT)
    }

    fn to_variants(&self, song: &Song, albums: Vec<AlbumResult>) -> Vec<ArtworkVariant> {
        let artist = song.artist.trim().to_lowercase();
        let (mut matching, others): (Vec<_>, Vec<_>) = albums
            .into_iter()
            .partition(|album| album.artist_name.to_lowercase() == artist);
        matching.extend(others);

        let sized = format!("{0}x{0}bb", self.size);
        let mut variants: Vec<ArtworkVariant> = Vec::new();
        for album in matching {
            let Some(url) = album.artwork_url100 else {
                continue;
            };
            let url = url.replace(THUMBNAIL_SIZE, &sized);
            if variants.iter().any(|v| v.url == url) {
                continue;
            }

            let mut variant = ArtworkVariant::new(url).with_metadata("artist", album.artist_name);
            if let Some(name) = album.collection_name {
                variant = variant.with_tag(name);
            }
            if let Some(id) = album.collection_id {
                variant = variant.with_metadata("collection_id", id.to_string());
            }
            variants.push(variant);
        }
        variants
    }

    async fn search(&self, song: &Song) -> Result<Option<Vec<ArtworkVariant>>> {
        let response = self.http_client.execute(self.search_request(song)).await?;

        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(MetadataError::ArtworkFetchFailed(format!(
                "iTunes API error: HTTP {}",
                response.status
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .map_err(|e| MetadataError::ArtworkFetchFailed(format!("Parse error: {}", e)))?;
        let variants = self.to_variants(song, parsed.results);
        debug!(variants = variants.len(), "iTunes search finished");

        Ok((!variants.is_empty()).then_some(variants))
    }
}

#[async_trait]
impl Provider<ArtworkKind> for ItunesArtworkProvider {
    fn id(&self) -> &str {
        ITUNES_PROVIDER_ID
    }

    async fn is_available(&self) -> bool {
        self.http_client.is_connected().await
    }

    async fn fetch(
        &self,
        song: &Song,
        cancel: CancellationToken,
    ) -> Result<Option<Vec<ArtworkVariant>>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            result = self.search(song) => result,
        }
    }
}
