//! # Provider Contract
//!
//! A provider is one pluggable source of lyrics or artwork. The resolver asks,
//! in order, whether it is available, whether it supports the song and whether
//! it is busy, and only then fetches.
//!
//! The optional capabilities have permissive defaults, so a provider only
//! overrides the checks it actually has:
//!
//! ```rust,ignore
//! struct Embedded;
//!
//! #[async_trait]
//! impl Provider<LyricsKind> for Embedded {
//!     fn id(&self) -> &str {
//!         "embedded"
//!     }
//!
//!     async fn fetch(&self, song: &Song, _: CancellationToken) -> Result<Option<String>> {
//!         Ok(lookup(song))
//!     }
//! }
//! ```

use crate::error::Result;
use crate::kind::{ArtworkKind, LyricsKind, ResolutionKind};
use crate::song::Song;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Provider<K: ResolutionKind>: Send + Sync {
    /// Unique id, also used in cache keys and events.
    fn id(&self) -> &str;

    async fn is_available(&self) -> bool {
        true
    }

    /// Whether this provider can handle the song at all.
    async fn supports(&self, _song: &Song) -> bool {
        true
    }

    /// `true` while the provider is busy with another request. Busy providers
    /// are skipped rather than awaited.
    async fn is_busy(&self) -> bool {
        false
    }

    /// Fetch the entity for `song`.
    ///
    /// # Returns
    /// * `Ok(Some(value))` if found
    /// * `Ok(None)` if the provider has nothing for this song
    /// * `Err` on network or API failure
    ///
    /// Implementations should stop early once `cancel` fires; whatever they
    /// return after that is discarded.
    async fn fetch(&self, song: &Song, cancel: CancellationToken) -> Result<Option<K::Output>>;
}

pub type LyricsProvider = dyn Provider<LyricsKind>;
pub type ArtworkProvider = dyn Provider<ArtworkKind>;
