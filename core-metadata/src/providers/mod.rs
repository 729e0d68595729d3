//! Built-in remote providers.
//!
//! - LRCLib - community synced lyrics (`lyrics` feature)
//! - iTunes Search - album artwork (`artwork-remote` feature)
//!
//! The `register_*` helpers add them to a [`ProviderRegistry`] so the
//! resolvers can load them by id.

use crate::kind::{ArtworkKind, LyricsKind};
#[cfg(any(feature = "lyrics", feature = "artwork-remote"))]
use crate::provider::Provider;
use crate::registry::ProviderRegistry;
use bridge_traits::http::HttpClient;
use std::sync::Arc;

#[cfg(feature = "lyrics")]
pub mod lrclib;

#[cfg(feature = "artwork-remote")]
pub mod itunes;

#[cfg(feature = "lyrics")]
pub use lrclib::{LrcLibProvider, LRCLIB_PROVIDER_ID};

#[cfg(feature = "artwork-remote")]
pub use itunes::{ItunesArtworkProvider, ITUNES_PROVIDER_ID};

/// Registers every lyrics provider compiled into this build.
pub fn register_lyrics_providers(
    registry: &mut ProviderRegistry<LyricsKind>,
    http_client: Arc<dyn HttpClient>,
    user_agent: &str,
) {
    #[cfg(feature = "lyrics")]
    {
        let user_agent = user_agent.to_string();
        registry.register(LRCLIB_PROVIDER_ID, move || {
            let provider = LrcLibProvider::new(Arc::clone(&http_client))
                .with_user_agent(user_agent.clone());
            Ok(Arc::new(provider) as Arc<dyn Provider<LyricsKind>>)
        });
    }

    #[cfg(not(feature = "lyrics"))]
    {
        let _ = (registry, http_client, user_agent);
        tracing::debug!("Lyrics providers disabled at build time");
    }
}

/// Registers every artwork provider compiled into this build.
pub fn register_artwork_providers(
    registry: &mut ProviderRegistry<ArtworkKind>,
    http_client: Arc<dyn HttpClient>,
    artwork_size: u32,
) {
    #[cfg(feature = "artwork-remote")]
    registry.register(ITUNES_PROVIDER_ID, move || {
        let provider = ItunesArtworkProvider::new(Arc::clone(&http_client), artwork_size);
        Ok(Arc::new(provider) as Arc<dyn Provider<ArtworkKind>>)
    });

    #[cfg(not(feature = "artwork-remote"))]
    {
        let _ = (registry, http_client, artwork_size);
        tracing::debug!("Artwork providers disabled at build time");
    }
}
