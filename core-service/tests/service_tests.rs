//! Composition root behaviour with fake providers and in-process bridges.

use async_trait::async_trait;
use bridge_desktop::MemoryKeyValueStore;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::storage::KeyValueStore;
use core_metadata::{
    ArtworkKind, ArtworkVariant, LyricsKind, Provider, ProviderRegistry, Result, Song,
};
use core_runtime::config::{CoreConfig, CoreConfigBuilder};
use core_runtime::events::{ArtworkEvent, CacheEvent, CoreEvent, EventStream, LyricsEvent};
use core_service::{CoreDependencies, CoreError, CoreService, NowPlayingWatcher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct OfflineHttp;

#[async_trait]
impl HttpClient for OfflineHttp {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        Err(BridgeError::NotAvailable("offline".to_string()))
    }

    async fn is_connected(&self) -> bool {
        false
    }
}

struct EchoLyrics {
    id: &'static str,
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl Provider<LyricsKind> for EchoLyrics {
    fn id(&self) -> &str {
        self.id
    }

    async fn fetch(&self, song: &Song, _cancel: CancellationToken) -> Result<Option<String>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(Some(format!("[00:01.00]lyrics for {}", song.name)))
    }
}

struct EchoArtwork;

#[async_trait]
impl Provider<ArtworkKind> for EchoArtwork {
    fn id(&self) -> &str {
        "echo-art"
    }

    async fn fetch(
        &self,
        song: &Song,
        _cancel: CancellationToken,
    ) -> Result<Option<Vec<ArtworkVariant>>> {
        Ok(Some(vec![ArtworkVariant::new(format!("cover/{}", song.name))]))
    }
}

struct Fixture {
    service: CoreService,
    store: Arc<MemoryKeyValueStore>,
    fetches: Arc<AtomicUsize>,
}

fn config(store: Arc<dyn KeyValueStore>) -> CoreConfigBuilder {
    CoreConfig::builder()
        .lyrics_providers(["echo"])
        .artwork_providers(["echo-art"])
        .http_client(Arc::new(OfflineHttp))
        .cache_store(store)
}

fn fixture_with(customize: impl FnOnce(CoreConfigBuilder) -> CoreConfigBuilder) -> Fixture {
    let store = Arc::new(MemoryKeyValueStore::new());
    let config = customize(config(store.clone())).build().unwrap();
    let deps = CoreDependencies::from_config(&config).unwrap();

    let fetches = Arc::new(AtomicUsize::new(0));
    let mut lyrics = ProviderRegistry::<LyricsKind>::new();
    for id in ["echo", "echo-2"] {
        lyrics.register_instance(Arc::new(EchoLyrics {
            id,
            fetches: fetches.clone(),
        }));
    }
    let mut artwork = ProviderRegistry::<ArtworkKind>::new();
    artwork.register_instance(Arc::new(EchoArtwork));

    Fixture {
        service: CoreService::with_registries(config, deps, lyrics, artwork).unwrap(),
        store,
        fetches,
    }
}

fn fixture() -> Fixture {
    fixture_with(|builder| builder)
}

async fn next(events: &mut EventStream) -> CoreEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("event within timeout")
        .expect("bus open")
}

fn lyrics_for(name: &str, provider_id: &str) -> CoreEvent {
    CoreEvent::Lyrics(LyricsEvent::Loaded {
        content: format!("[00:01.00]lyrics for {}", name),
        provider_id: provider_id.to_string(),
    })
}

fn imagine() -> Song {
    Song::new("Imagine", "John Lennon", "Imagine")
}

#[tokio::test]
async fn test_missing_bridges_are_reported() {
    let config = CoreConfig::builder().build().unwrap();
    let err = CoreDependencies::from_config(&config).err().unwrap();
    assert!(matches!(err, CoreError::CapabilityMissing { ref capability, .. } if capability == "HttpClient"));
}

#[tokio::test]
async fn test_bootstrap_uses_injected_bridges() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let service = CoreService::bootstrap(config(store).build().unwrap())
        .await
        .unwrap();

    assert_eq!(service.lyrics_providers(), vec!["echo".to_string()]);
    assert!(!service.dependencies().http_client.is_connected().await);
}

#[tokio::test]
async fn test_resolve_all_publishes_lyrics_and_artwork() {
    let f = fixture();
    let mut events = f.service.subscribe();

    f.service.resolve_all(imagine());

    let mut received = vec![next(&mut events).await, next(&mut events).await];
    received.sort_by_key(|event| matches!(event, CoreEvent::Artwork(_)));
    assert_eq!(received[0], lyrics_for("Imagine", "echo"));
    assert_eq!(
        received[1],
        CoreEvent::Artwork(ArtworkEvent::Loaded {
            urls: vec!["cover/Imagine".to_string()],
            provider_id: "echo-art".to_string(),
        })
    );
    assert_eq!(f.service.current_song(), Some(imagine()));
}

#[tokio::test]
async fn test_disabled_kind_is_not_resolved() {
    let f = fixture_with(|builder| builder.enable_artwork(false));
    assert!(f.service.resolve_artwork(imagine()).is_none());
    assert!(f.service.resolve_lyrics(imagine()).is_some());
}

#[tokio::test]
async fn test_clear_all_data_empties_cache() {
    let f = fixture();
    let mut cleared = f
        .service
        .subscribe()
        .filter(|event| matches!(event, CoreEvent::Cache(_)));

    f.service.resolve_lyrics(imagine()).unwrap().await.unwrap();
    assert!(!f.store.is_empty().await);

    f.service.clear_all_data().await.unwrap();

    assert!(f.store.is_empty().await);
    assert_eq!(next(&mut cleared).await, CoreEvent::Cache(CacheEvent::Cleared));

    // Next resolution goes back to the provider
    f.service.resolve_lyrics(imagine()).unwrap().await.unwrap();
    assert_eq!(f.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_provider_order_change_re_resolves_current_song() {
    let f = fixture();
    let mut lyrics = f
        .service
        .subscribe()
        .filter(|event| matches!(event, CoreEvent::Lyrics(_)));

    f.service.resolve_all(imagine());
    assert_eq!(next(&mut lyrics).await, lyrics_for("Imagine", "echo"));

    let rejected = f
        .service
        .set_lyrics_providers(vec!["echo-2".into(), "echo-2".into()]);
    assert!(matches!(rejected, Err(CoreError::Runtime(_))));

    f.service
        .set_lyrics_providers(vec!["echo-2".into(), "echo".into()])
        .unwrap();
    assert_eq!(next(&mut lyrics).await, lyrics_for("Imagine", "echo-2"));
    assert_eq!(
        f.service.lyrics_providers(),
        vec!["echo-2".to_string(), "echo".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watcher_resolves_once_per_song() {
    let f = fixture();
    let mut lyrics = f
        .service
        .subscribe()
        .filter(|event| matches!(event, CoreEvent::Lyrics(_)));
    let watcher = NowPlayingWatcher::new(f.service.clone()).spawn();

    let first = imagine().with_duration(183.0);
    f.service.publish_now_playing(&first.clone().with_playback(1.0, true));
    f.service.publish_now_playing(&first.with_playback(5.0, true));
    assert_eq!(next(&mut lyrics).await, lyrics_for("Imagine", "echo"));

    f.service
        .publish_now_playing(&Song::new("Jealous Guy", "John Lennon", "Imagine"));
    assert_eq!(next(&mut lyrics).await, lyrics_for("Jealous Guy", "echo"));
    assert_eq!(f.fetches.load(Ordering::SeqCst), 2);

    f.service.publish_stopped();
    tokio::time::timeout(Duration::from_secs(2), async {
        while f.service.current_song().is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("stop handled");

    watcher.stop().await;
}

#[cfg(feature = "desktop-shims")]
#[tokio::test]
async fn test_sqlite_cache_survives_restart() {
    let path = std::env::temp_dir().join(format!(
        "lyricscope-service-{}-{}.db",
        std::process::id(),
        unique_suffix()
    ));

    for expected_fetches in [1, 0] {
        let config = CoreConfig::builder()
            .lyrics_providers(["echo"])
            .enable_artwork(false)
            .http_client(Arc::new(OfflineHttp))
            .cache_path(path.clone())
            .build()
            .unwrap();
        let deps = CoreDependencies::desktop(&config).await.unwrap();

        let fetches = Arc::new(AtomicUsize::new(0));
        let mut lyrics = ProviderRegistry::<LyricsKind>::new();
        lyrics.register_instance(Arc::new(EchoLyrics {
            id: "echo",
            fetches: fetches.clone(),
        }));
        let service =
            CoreService::with_registries(config, deps, lyrics, ProviderRegistry::new()).unwrap();

        service.resolve_lyrics(imagine()).unwrap().await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), expected_fetches);
    }

    let _ = std::fs::remove_file(&path);
}

#[cfg(feature = "desktop-shims")]
fn unique_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}
