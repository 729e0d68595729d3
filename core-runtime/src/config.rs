//! # Core Configuration Module
//!
//! Builder-based configuration for the lyrics/artwork core.
//!
//! ## Overview
//!
//! [`CoreConfig`] carries the ordered provider lists for each resolver, the
//! entity cache location, HTTP settings and optional injected bridges. The
//! builder fails fast on inconsistent values so the service never starts
//! with, say, a provider listed twice.
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - used by remote providers (desktop default: reqwest)
//! - `KeyValueStore` - backs the entity cache (desktop default: SQLite at
//!   `cache_path`, or memory when no path is set)
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .lyrics_providers(["lrclib"])
//!     .artwork_providers(["itunes"])
//!     .cache_path("/tmp/lyricscope/cache.db")
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.lyrics_providers, vec!["lrclib".to_string()]);
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! CoreConfig::builder()
//!     .lyrics_providers(["lrclib", "lrclib"])
//!     .build()
//!     .expect("duplicate provider ids are rejected");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{HttpClient, KeyValueStore};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_LYRICS_PROVIDERS: &[&str] = &["lrclib"];
pub const DEFAULT_ARTWORK_PROVIDERS: &[&str] = &["itunes"];
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_ARTWORK_SIZE: u32 = 600;
pub const DEFAULT_USER_AGENT: &str = concat!("lyricscope/", env!("CARGO_PKG_VERSION"));

/// Core configuration. Use [`CoreConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// SQLite file for the entity cache; `None` keeps the cache in memory
    pub cache_path: Option<PathBuf>,

    /// Lyrics provider ids in fallback order
    pub lyrics_providers: Vec<String>,

    /// Artwork provider ids in fallback order
    pub artwork_providers: Vec<String>,

    /// Per-request timeout for provider HTTP calls
    pub http_timeout: Duration,

    pub user_agent: String,

    /// Edge length (px) requested from artwork providers that can resize
    pub artwork_size: u32,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// HTTP client override (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Key-value store override for the entity cache
    pub cache_store: Option<Arc<dyn KeyValueStore>>,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("cache_path", &self.cache_path)
            .field("lyrics_providers", &self.lyrics_providers)
            .field("artwork_providers", &self.artwork_providers)
            .field("http_timeout", &self.http_timeout)
            .field("user_agent", &self.user_agent)
            .field("artwork_size", &self.artwork_size)
            .field("event_buffer_size", &self.event_buffer_size)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field(
                "cache_store",
                &self.cache_store.as_ref().map(|_| "KeyValueStore { ... }"),
            )
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control which resolvers the service runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Resolve lyrics on song changes
    pub enable_lyrics: bool,

    /// Resolve artwork from remote providers on song changes
    pub enable_artwork: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_lyrics: true,
            enable_artwork: true,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - provider ids are non-blank and unique within each list
    /// - timeout, artwork size and event buffer are non-zero
    /// - an enabled feature has at least one provider
    pub fn validate(&self) -> Result<()> {
        validate_provider_list("lyrics", &self.lyrics_providers)?;
        validate_provider_list("artwork", &self.artwork_providers)?;

        if self.http_timeout.is_zero() {
            return Err(Error::Config(
                "HTTP timeout must be greater than zero".to_string(),
            ));
        }

        if self.artwork_size == 0 {
            return Err(Error::Config(
                "Artwork size must be greater than 0 px".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        if self.features.enable_lyrics && self.lyrics_providers.is_empty() {
            return Err(Error::Config(
                "Lyrics enabled but no lyrics providers configured. \
                 Disable the feature or list at least one provider."
                    .to_string(),
            ));
        }

        if self.features.enable_artwork && self.artwork_providers.is_empty() {
            return Err(Error::Config(
                "Artwork enabled but no artwork providers configured. \
                 Disable the feature or list at least one provider."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Rejects blank and duplicate ids in one ordered provider list.
pub fn validate_provider_list(kind: &str, ids: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(Error::Config(format!(
                "Blank {} provider id in provider list",
                kind
            )));
        }
        if !seen.insert(id.as_str()) {
            return Err(Error::Config(format!(
                "Duplicate {} provider id '{}'",
                kind, id
            )));
        }
    }
    Ok(())
}

/// Parse a comma-separated provider list such as `"LRCLib, musixmatch"`.
///
/// Ids are trimmed and lower-cased; empty segments are dropped.
pub fn parse_provider_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|id| id.trim().to_lowercase())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    cache_path: Option<PathBuf>,
    lyrics_providers: Option<Vec<String>>,
    artwork_providers: Option<Vec<String>>,
    http_timeout: Option<Duration>,
    user_agent: Option<String>,
    artwork_size: Option<u32>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    cache_store: Option<Arc<dyn KeyValueStore>>,
    features: Option<FeatureFlags>,
}

impl CoreConfigBuilder {
    pub fn cache_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Lyrics provider ids, highest priority first.
    pub fn lyrics_providers<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lyrics_providers = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Artwork provider ids, highest priority first.
    pub fn artwork_providers<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artwork_providers = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn artwork_size(mut self, px: u32) -> Self {
        self.artwork_size = Some(px);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Inject an HTTP client instead of the platform default.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Inject the store backing the entity cache; takes precedence over `cache_path`.
    pub fn cache_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    pub fn enable_lyrics(mut self, enabled: bool) -> Self {
        self.features.get_or_insert_with(FeatureFlags::default).enable_lyrics = enabled;
        self
    }

    pub fn enable_artwork(mut self, enabled: bool) -> Self {
        self.features.get_or_insert_with(FeatureFlags::default).enable_artwork = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = Some(features);
        self
    }

    /// Builds and validates the final `CoreConfig`.
    pub fn build(self) -> Result<CoreConfig> {
        let defaults = |ids: &[&str]| ids.iter().map(|id| id.to_string()).collect::<Vec<_>>();

        let config = CoreConfig {
            cache_path: self.cache_path,
            lyrics_providers: self
                .lyrics_providers
                .unwrap_or_else(|| defaults(DEFAULT_LYRICS_PROVIDERS)),
            artwork_providers: self
                .artwork_providers
                .unwrap_or_else(|| defaults(DEFAULT_ARTWORK_PROVIDERS)),
            http_timeout: self.http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            artwork_size: self.artwork_size.unwrap_or(DEFAULT_ARTWORK_SIZE),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client: self.http_client,
            cache_store: self.cache_store,
            features: self.features.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
