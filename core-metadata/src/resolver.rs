//! # Fallback Resolver
//!
//! Resolves one entity kind for a song by trying providers in the order the
//! caller supplies, stopping at the first usable result.
//!
//! ## Protocol
//!
//! For each provider id, strictly sequentially:
//!
//! 1. Read the cache entry for `(song, provider, kind)`; a hit wins.
//! 2. Load the provider; skip it if loading fails.
//! 3. Skip it if it is unavailable, does not support the song or is busy.
//! 4. Fetch. Errors and empty results move on to the next provider.
//! 5. Cache the result, then publish it.
//!
//! When every provider has been tried, a not-found outcome is published.
//! Exactly one outcome is published per request unless a newer request
//! supersedes it, in which case the older one publishes nothing.
//!
//! Cancellation is checked before every step and after every await. A fetch
//! already in flight is allowed to finish, but its result is discarded and
//! never cached. A request cancelled while its cache write is pending removes
//! the entry it just wrote.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let resolver = Arc::new(FallbackResolver::<LyricsKind>::new(cache, registry, events.clone()));
//!
//! // Fire and forget; the outcome arrives as a CoreEvent::Lyrics
//! resolver.resolve(song, vec!["lrclib".into(), "embedded".into()]);
//!
//! // Song changed before anything came back
//! resolver.cancel();
//! ```

use crate::cache::EntityCache;
use crate::coordinator::{RequestCoordinator, RequestToken};
use crate::kind::{ArtworkKind, LyricsKind, ResolutionKind};
use crate::registry::ProviderLoader;
use crate::song::Song;
use core_runtime::events::{CoreEvent, EventBus};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

/// Outcome of one resolution request.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Found { value: T, provider_id: String },
    /// No provider had a usable result, or the request was empty.
    NotFound,
    /// Cancelled or replaced by a newer request; nothing was published.
    Superseded,
}

impl<T> Resolution<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }
}

pub struct FallbackResolver<K: ResolutionKind> {
    cache: Arc<dyn EntityCache>,
    loader: Arc<dyn ProviderLoader<K>>,
    events: EventBus,
    coordinator: RequestCoordinator,
}

pub type LyricsResolver = FallbackResolver<LyricsKind>;
pub type ArtworkResolver = FallbackResolver<ArtworkKind>;

impl<K: ResolutionKind> FallbackResolver<K> {
    pub fn new(
        cache: Arc<dyn EntityCache>,
        loader: Arc<dyn ProviderLoader<K>>,
        events: EventBus,
    ) -> Self {
        Self {
            cache,
            loader,
            events,
            coordinator: RequestCoordinator::new(),
        }
    }

    /// Starts resolving `song` in the background and returns immediately.
    ///
    /// Any request still in flight is cancelled before this returns. The
    /// outcome is published on the event bus; the handle only tells when the
    /// work is over.
    pub fn resolve(self: &Arc<Self>, song: Song, provider_ids: Vec<String>) -> JoinHandle<()> {
        let token = self.coordinator.start_new();
        let resolver = Arc::clone(self);

        tokio::spawn(async move {
            let run = resolver.execute(&song, &provider_ids, &token);
            if let Err(panic) = AssertUnwindSafe(run).catch_unwind().await {
                let message = panic_message(panic.as_ref());
                error!(kind = %K::KIND, error = %message, "Resolution aborted");
                resolver
                    .coordinator
                    .complete_if_current(&token, || resolver.publish(K::failed_event(message)));
            }
        })
    }

    /// Same protocol as [`resolve`](Self::resolve), awaited in place.
    ///
    /// The outcome is published as well as returned.
    pub async fn resolve_now(&self, song: &Song, provider_ids: &[String]) -> Resolution<K::Output> {
        let token = self.coordinator.start_new();
        self.execute(song, provider_ids, &token).await
    }

    /// Abandons the request in flight, if any. Nothing is published for it.
    pub fn cancel(&self) {
        self.coordinator.cancel();
    }

    pub fn is_resolving(&self) -> bool {
        self.coordinator.is_active()
    }

    #[instrument(
        skip_all,
        fields(kind = %K::KIND, request = token.id(), song = %song.identity())
    )]
    async fn execute(
        &self,
        song: &Song,
        provider_ids: &[String],
        token: &RequestToken,
    ) -> Resolution<K::Output> {
        if !song.is_identified() {
            debug!("Song has no name or artist, nothing to resolve");
            return self.finish(token, None);
        }
        if provider_ids.is_empty() {
            debug!("No providers enabled");
            return self.finish(token, None);
        }

        for provider_id in provider_ids {
            if token.is_cancelled() {
                return abandoned(provider_id, "before cache lookup");
            }

            match K::read_cache(self.cache.as_ref(), song, provider_id).await {
                Ok(Some(value)) => {
                    debug!(provider = %provider_id, "Cache hit");
                    return self.finish(token, Some((value, provider_id.as_str())));
                }
                Ok(None) => trace!(provider = %provider_id, "Cache miss"),
                Err(e) => {
                    warn!(provider = %provider_id, error = %e, "Cache read failed, treating as miss")
                }
            }

            if token.is_cancelled() {
                return abandoned(provider_id, "before provider load");
            }

            let provider = match self.loader.load(provider_id).await {
                Ok(provider) => provider,
                Err(e) => {
                    warn!(provider = %provider_id, error = %e, "Failed to load provider");
                    continue;
                }
            };

            if token.is_cancelled() {
                return abandoned(provider_id, "before availability check");
            }
            if !provider.is_available().await {
                debug!(provider = %provider_id, "Provider unavailable");
                continue;
            }

            if token.is_cancelled() {
                return abandoned(provider_id, "before support check");
            }
            if !provider.supports(song).await {
                debug!(provider = %provider_id, "Provider does not support song");
                continue;
            }

            if token.is_cancelled() {
                return abandoned(provider_id, "before busy check");
            }
            if provider.is_busy().await {
                debug!(provider = %provider_id, "Provider busy, skipping");
                continue;
            }

            if token.is_cancelled() {
                return abandoned(provider_id, "before fetch");
            }
            let fetched = provider.fetch(song, token.cancellation()).await;
            if token.is_cancelled() {
                return abandoned(provider_id, "after fetch, result discarded");
            }

            let value = match fetched {
                Ok(Some(value)) if !K::is_empty(&value) => value,
                Ok(_) => {
                    debug!(provider = %provider_id, "Provider returned nothing");
                    continue;
                }
                Err(e) => {
                    warn!(provider = %provider_id, error = %e, "Provider fetch failed");
                    continue;
                }
            };

            if token.is_cancelled() {
                return abandoned(provider_id, "before cache write");
            }
            if let Err(e) = K::write_cache(self.cache.as_ref(), song, provider_id, &value).await {
                warn!(provider = %provider_id, error = %e, "Failed to cache result");
            }
            if token.is_cancelled() {
                // A clear may have run while the write was pending
                if let Err(e) = self.cache.remove(song, provider_id, K::KIND).await {
                    warn!(provider = %provider_id, error = %e, "Failed to drop cancelled result");
                }
                return abandoned(provider_id, "during cache write, entry dropped");
            }

            info!(provider = %provider_id, "Resolved");
            return self.finish(token, Some((value, provider_id.as_str())));
        }

        info!(providers = provider_ids.len(), "No provider had a result");
        self.finish(token, None)
    }

    /// Publishes the outcome if `token` is still current.
    fn finish(
        &self,
        token: &RequestToken,
        found: Option<(K::Output, &str)>,
    ) -> Resolution<K::Output> {
        let (event, resolution) = match found {
            Some((value, provider_id)) => (
                K::loaded_event(&value, provider_id),
                Resolution::Found {
                    value,
                    provider_id: provider_id.to_string(),
                },
            ),
            None => (K::not_found_event(), Resolution::NotFound),
        };

        if self
            .coordinator
            .complete_if_current(token, || self.publish(event))
        {
            resolution
        } else {
            debug!("Request superseded, outcome suppressed");
            Resolution::Superseded
        }
    }

    fn publish(&self, event: CoreEvent) {
        if self.events.emit(event).is_err() {
            trace!("No subscribers for resolution outcome");
        }
    }
}

fn abandoned<T>(provider_id: &str, stage: &str) -> Resolution<T> {
    debug!(provider = %provider_id, stage, "Request cancelled");
    Resolution::Superseded
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "resolution task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        let from_str: Box<dyn Any + Send> = Box::new("boom");
        let from_string: Box<dyn Any + Send> = Box::new(String::from("bang"));
        let opaque: Box<dyn Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(from_str.as_ref()), "boom");
        assert_eq!(panic_message(from_string.as_ref()), "bang");
        assert_eq!(panic_message(opaque.as_ref()), "resolution task panicked");
    }

    #[test]
    fn test_resolution_is_found() {
        let found = Resolution::Found {
            value: "text".to_string(),
            provider_id: "p2".to_string(),
        };
        assert!(found.is_found());
        assert!(!Resolution::<String>::NotFound.is_found());
        assert!(!Resolution::<String>::Superseded.is_found());
    }
}
