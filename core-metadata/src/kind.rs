//! Entity kinds a [`FallbackResolver`](crate::resolver::FallbackResolver) can
//! resolve.
//!
//! A kind ties together the value a provider produces, the cache shape it is
//! stored in and the events announcing the outcome. [`LyricsKind`] is
//! single-valued; [`ArtworkKind`] is a list of variants.

use crate::cache::{ArtworkVariant, EntityCache, EntityKind};
use crate::error::Result;
use crate::song::Song;
use async_trait::async_trait;
use core_runtime::events::{ArtworkEvent, CoreEvent, LyricsEvent};
use std::fmt::Debug;

#[async_trait]
pub trait ResolutionKind: Send + Sync + 'static {
    /// Value produced by providers of this kind.
    type Output: Clone + Debug + Send + Sync + 'static;

    const KIND: EntityKind;

    /// Empty values never win a resolution and are never cached.
    fn is_empty(value: &Self::Output) -> bool;

    async fn read_cache(
        cache: &dyn EntityCache,
        song: &Song,
        provider_id: &str,
    ) -> Result<Option<Self::Output>>;

    async fn write_cache(
        cache: &dyn EntityCache,
        song: &Song,
        provider_id: &str,
        value: &Self::Output,
    ) -> Result<()>;

    fn loaded_event(value: &Self::Output, provider_id: &str) -> CoreEvent;

    fn not_found_event() -> CoreEvent;

    fn failed_event(message: String) -> CoreEvent;
}

/// Lyrics text, LRC or plain.
#[derive(Debug, Clone, Copy, Default)]
pub struct LyricsKind;

#[async_trait]
impl ResolutionKind for LyricsKind {
    type Output = String;

    const KIND: EntityKind = EntityKind::Lyrics;

    fn is_empty(value: &String) -> bool {
        value.trim().is_empty()
    }

    async fn read_cache(
        cache: &dyn EntityCache,
        song: &Song,
        provider_id: &str,
    ) -> Result<Option<String>> {
        let cached = cache.get(song, provider_id, Self::KIND).await?;
        Ok(cached.filter(|text| !Self::is_empty(text)))
    }

    async fn write_cache(
        cache: &dyn EntityCache,
        song: &Song,
        provider_id: &str,
        value: &String,
    ) -> Result<()> {
        cache.set(song, provider_id, Self::KIND, value).await
    }

    fn loaded_event(value: &String, provider_id: &str) -> CoreEvent {
        CoreEvent::Lyrics(LyricsEvent::Loaded {
            content: value.clone(),
            provider_id: provider_id.to_string(),
        })
    }

    fn not_found_event() -> CoreEvent {
        CoreEvent::Lyrics(LyricsEvent::NotFound)
    }

    fn failed_event(message: String) -> CoreEvent {
        CoreEvent::Lyrics(LyricsEvent::Failed { message })
    }
}

/// Ordered artwork variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtworkKind;

#[async_trait]
impl ResolutionKind for ArtworkKind {
    type Output = Vec<ArtworkVariant>;

    const KIND: EntityKind = EntityKind::Artwork;

    fn is_empty(value: &Vec<ArtworkVariant>) -> bool {
        value.iter().all(|variant| variant.url.trim().is_empty())
    }

    async fn read_cache(
        cache: &dyn EntityCache,
        song: &Song,
        provider_id: &str,
    ) -> Result<Option<Vec<ArtworkVariant>>> {
        let variants = cache.get_all(song, provider_id, Self::KIND).await?;
        Ok(if Self::is_empty(&variants) {
            None
        } else {
            Some(variants)
        })
    }

    async fn write_cache(
        cache: &dyn EntityCache,
        song: &Song,
        provider_id: &str,
        value: &Vec<ArtworkVariant>,
    ) -> Result<()> {
        cache.set_many(song, provider_id, Self::KIND, value).await
    }

    fn loaded_event(value: &Vec<ArtworkVariant>, provider_id: &str) -> CoreEvent {
        CoreEvent::Artwork(ArtworkEvent::Loaded {
            urls: value.iter().map(|variant| variant.url.clone()).collect(),
            provider_id: provider_id.to_string(),
        })
    }

    fn not_found_event() -> CoreEvent {
        CoreEvent::Artwork(ArtworkEvent::NotFound)
    }

    fn failed_event(message: String) -> CoreEvent {
        CoreEvent::Artwork(ArtworkEvent::Failed { message })
    }
}
