//! Core service façade and bootstrap helpers.
//!
//! This crate is the composition root: it wires host-provided bridges (HTTP,
//! key-value storage) into the entity cache, the provider registries and one
//! resolver per entity kind, all publishing on a shared [`EventBus`]. Desktop
//! apps typically enable the `desktop-shims` feature, which supplies reqwest
//! and SQLite defaults from `bridge-desktop`.
//!
//! ```ignore
//! let core = CoreService::bootstrap(CoreConfig::builder().build()?).await?;
//! let mut events = core.subscribe();
//!
//! core.resolve_all(Song::new("Imagine", "John Lennon", "Imagine"));
//! while let Ok(event) = events.recv().await {
//!     println!("{}", event.description());
//! }
//! ```

pub mod error;
pub mod now_playing;

pub use error::{CoreError, Result};
pub use now_playing::{NowPlayingWatcher, WatcherHandle};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use bridge_traits::{http::HttpClient, storage::KeyValueStore};
use core_metadata::providers::{register_artwork_providers, register_lyrics_providers};
use core_metadata::{
    ArtworkKind, ArtworkResolver, EntityCache, KeyValueEntityCache, LyricsKind, LyricsResolver,
    ProviderRegistry, Song,
};
use core_runtime::config::{validate_provider_list, CoreConfig};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus, EventStream, PlaybackEvent};
use tokio::task::JoinHandle;
use tracing::info;

/// Aggregated handle to the bridge dependencies the core requires.
#[derive(Clone)]
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub cache_store: Arc<dyn KeyValueStore>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(http_client: Arc<dyn HttpClient>, cache_store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            http_client,
            cache_store,
        }
    }

    /// Bridges injected through the config, with desktop defaults for the
    /// rest: reqwest for HTTP, SQLite at `cache_path` (or memory) for the cache.
    #[cfg(feature = "desktop-shims")]
    pub async fn desktop(config: &CoreConfig) -> Result<Self> {
        use bridge_desktop::{MemoryKeyValueStore, ReqwestHttpClient, SqliteKeyValueStore};
        use core_runtime::logging::strip_path;

        let http_client: Arc<dyn HttpClient> = match &config.http_client {
            Some(client) => Arc::clone(client),
            None => Arc::new(ReqwestHttpClient::with_config(
                config.http_timeout,
                &config.user_agent,
            )?),
        };

        let cache_store: Arc<dyn KeyValueStore> = match (&config.cache_store, &config.cache_path) {
            (Some(store), _) => Arc::clone(store),
            (None, Some(path)) => {
                let shown = path.to_string_lossy();
                tracing::debug!(file = strip_path(&shown), "Opening SQLite entity cache");
                Arc::new(SqliteKeyValueStore::new(path.clone()).await?)
            }
            (None, None) => {
                tracing::debug!("No cache path configured, entity cache is memory-only");
                Arc::new(MemoryKeyValueStore::new())
            }
        };

        Ok(Self::new(http_client, cache_store))
    }

    /// Bridges injected through the config only.
    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        let http_client = config.http_client.clone().ok_or_else(|| {
            CoreError::CapabilityMissing {
                capability: "HttpClient".to_string(),
                message: "No HTTP client injected. Set CoreConfig::http_client or enable \
                          the desktop-shims feature."
                    .to_string(),
            }
        })?;
        let cache_store = config.cache_store.clone().ok_or_else(|| {
            CoreError::CapabilityMissing {
                capability: "KeyValueStore".to_string(),
                message: "No cache store injected. Set CoreConfig::cache_store or enable \
                          the desktop-shims feature."
                    .to_string(),
            }
        })?;
        Ok(Self::new(http_client, cache_store))
    }
}

struct ServiceInner {
    config: CoreConfig,
    deps: CoreDependencies,
    events: EventBus,
    cache: Arc<dyn EntityCache>,
    lyrics: Arc<LyricsResolver>,
    artwork: Arc<ArtworkResolver>,
    lyrics_providers: RwLock<Vec<String>>,
    artwork_providers: RwLock<Vec<String>>,
    current_song: Mutex<Option<Song>>,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

impl CoreService {
    /// Validate `config` and wire the service around `deps`, registering the
    /// built-in providers.
    pub fn new(config: CoreConfig, deps: CoreDependencies) -> Result<Self> {
        let mut lyrics_registry = ProviderRegistry::<LyricsKind>::new();
        register_lyrics_providers(
            &mut lyrics_registry,
            Arc::clone(&deps.http_client),
            &config.user_agent,
        );
        let mut artwork_registry = ProviderRegistry::<ArtworkKind>::new();
        register_artwork_providers(
            &mut artwork_registry,
            Arc::clone(&deps.http_client),
            config.artwork_size,
        );

        Self::with_registries(config, deps, lyrics_registry, artwork_registry)
    }

    /// Like [`new`](Self::new) but with caller-populated registries, for hosts
    /// that ship their own providers.
    pub fn with_registries(
        config: CoreConfig,
        deps: CoreDependencies,
        lyrics_registry: ProviderRegistry<LyricsKind>,
        artwork_registry: ProviderRegistry<ArtworkKind>,
    ) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let cache: Arc<dyn EntityCache> =
            Arc::new(KeyValueEntityCache::new(Arc::clone(&deps.cache_store)));

        let lyrics = Arc::new(LyricsResolver::new(
            Arc::clone(&cache),
            Arc::new(lyrics_registry),
            events.clone(),
        ));
        let artwork = Arc::new(ArtworkResolver::new(
            Arc::clone(&cache),
            Arc::new(artwork_registry),
            events.clone(),
        ));

        info!(
            lyrics = ?config.lyrics_providers,
            artwork = ?config.artwork_providers,
            "Core service initialized"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                lyrics_providers: RwLock::new(config.lyrics_providers.clone()),
                artwork_providers: RwLock::new(config.artwork_providers.clone()),
                config,
                deps,
                events,
                cache,
                lyrics,
                artwork,
                current_song: Mutex::new(None),
            }),
        })
    }

    /// Build the service from `config` alone, filling missing bridges with
    /// platform defaults when available.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        #[cfg(feature = "desktop-shims")]
        let deps = CoreDependencies::desktop(&config).await?;
        #[cfg(not(feature = "desktop-shims"))]
        let deps = CoreDependencies::from_config(&config)?;

        Self::new(config, deps)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> &CoreDependencies {
        &self.inner.deps
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn subscribe(&self) -> EventStream {
        self.inner.events.stream()
    }

    pub fn lyrics_resolver(&self) -> &Arc<LyricsResolver> {
        &self.inner.lyrics
    }

    pub fn artwork_resolver(&self) -> &Arc<ArtworkResolver> {
        &self.inner.artwork
    }

    /// Starts resolving lyrics for `song` with the current provider order.
    /// Returns `None` when lyrics are disabled.
    pub fn resolve_lyrics(&self, song: Song) -> Option<JoinHandle<()>> {
        if !self.inner.config.features.enable_lyrics {
            return None;
        }
        let providers = read(&self.inner.lyrics_providers).clone();
        Some(self.inner.lyrics.resolve(song, providers))
    }

    /// Starts resolving artwork for `song`. Returns `None` when artwork is
    /// disabled.
    pub fn resolve_artwork(&self, song: Song) -> Option<JoinHandle<()>> {
        if !self.inner.config.features.enable_artwork {
            return None;
        }
        let providers = read(&self.inner.artwork_providers).clone();
        Some(self.inner.artwork.resolve(song, providers))
    }

    /// Makes `song` the current song and resolves both kinds for it.
    pub fn resolve_all(&self, song: Song) {
        *lock(&self.inner.current_song) = Some(song.clone());
        self.resolve_lyrics(song.clone());
        self.resolve_artwork(song);
    }

    pub fn current_song(&self) -> Option<Song> {
        lock(&self.inner.current_song).clone()
    }

    /// Abandons both resolutions in flight and forgets the current song.
    pub fn cancel_all(&self) {
        lock(&self.inner.current_song).take();
        self.inner.lyrics.cancel();
        self.inner.artwork.cancel();
    }

    pub fn lyrics_providers(&self) -> Vec<String> {
        read(&self.inner.lyrics_providers).clone()
    }

    pub fn artwork_providers(&self) -> Vec<String> {
        read(&self.inner.artwork_providers).clone()
    }

    /// Replaces the lyrics provider order. A current song is re-resolved with
    /// the new order, superseding whatever was in flight.
    pub fn set_lyrics_providers(&self, ids: Vec<String>) -> Result<()> {
        validate_provider_list("lyrics", &ids)?;
        *write(&self.inner.lyrics_providers) = ids;
        if let Some(song) = self.current_song() {
            self.resolve_lyrics(song);
        }
        Ok(())
    }

    /// Replaces the artwork provider order; see
    /// [`set_lyrics_providers`](Self::set_lyrics_providers).
    pub fn set_artwork_providers(&self, ids: Vec<String>) -> Result<()> {
        validate_provider_list("artwork", &ids)?;
        *write(&self.inner.artwork_providers) = ids;
        if let Some(song) = self.current_song() {
            self.resolve_artwork(song);
        }
        Ok(())
    }

    /// Publishes a now-playing update for watchers on the bus.
    pub fn publish_now_playing(&self, song: &Song) {
        let event = CoreEvent::Playback(PlaybackEvent::SongChanged {
            name: song.name.clone(),
            artist: song.artist.clone(),
            album: song.album.clone(),
            duration_ms: seconds_to_ms(song.duration),
            position_ms: seconds_to_ms(song.current_time),
            is_playing: song.is_playing,
        });
        let _ = self.inner.events.emit(event);
    }

    pub fn publish_stopped(&self) {
        let _ = self
            .inner
            .events
            .emit(CoreEvent::Playback(PlaybackEvent::Stopped));
    }

    /// Resets all cached lyrics and artwork.
    ///
    /// In-flight resolutions are cancelled first. One that was already
    /// writing when the clear ran removes its own entry afterwards.
    pub async fn clear_all_data(&self) -> Result<()> {
        self.cancel_all();
        self.inner.cache.clear().await?;
        info!("Entity cache cleared");

        let _ = self.inner.events.emit(CoreEvent::Cache(CacheEvent::Cleared));
        Ok(())
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
