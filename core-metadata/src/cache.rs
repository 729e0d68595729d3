//! # Entity Cache
//!
//! Durable storage of resolved lyrics and artwork, scoped by song identity,
//! provider id and entity kind.
//!
//! Entries never expire; they disappear only through [`EntityCache::clear`].
//! Lyrics are single-valued. Artwork is stored as an ordered list of
//! [`ArtworkVariant`]s that is always replaced as a whole.
//!
//! [`KeyValueEntityCache`] maps entries onto any
//! [`KeyValueStore`](bridge_traits::storage::KeyValueStore):
//!
//! ```text
//! entity/lyrics/lrclib/Imagine|John Lennon|            -> "[00:01.00]..."
//! entity/artwork/itunes/Imagine|John Lennon|Imagine#v  -> [{"url": ...}, ...]
//! ```

use crate::error::{MetadataError, Result};
use crate::song::{escape_chars, Song, SongIdentity};
use async_trait::async_trait;
use bridge_traits::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const KEY_PREFIX: &str = "entity";
const VARIANTS_SUFFIX: &str = "#v";

/// Discriminator for cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Lyrics,
    Artwork,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Lyrics => "lyrics",
            EntityKind::Artwork => "artwork",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key: `(song identity, provider id, kind)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub identity: SongIdentity,
    pub provider_id: String,
    pub kind: EntityKind,
}

impl CacheKey {
    pub fn new(song: &Song, provider_id: &str, kind: EntityKind) -> Self {
        Self {
            identity: song.identity(),
            provider_id: provider_id.to_string(),
            kind,
        }
    }

    /// Storage key for a single-valued entry. The provider id has `/`
    /// escaped so it cannot absorb part of the identity.
    pub fn storage_key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            KEY_PREFIX,
            self.kind.as_str(),
            escape_chars(&self.provider_id, &['/']),
            self.identity.key()
        )
    }

    /// Storage key for a variant list.
    pub fn variants_key(&self) -> String {
        format!("{}{}", self.storage_key(), VARIANTS_SUFFIX)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.identity, self.provider_id, self.kind)
    }
}

/// One candidate image for a multi-valued entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkVariant {
    pub url: String,
    /// Provider-specific label, e.g. the matched album title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ArtworkVariant {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tag: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Persistent cache of resolved entities.
///
/// Failures are reported as [`MetadataError::Storage`]. Resolvers treat a
/// failed read as a miss and a failed write as dropped.
#[async_trait]
pub trait EntityCache: Send + Sync {
    /// Single value for `(song, provider, kind)`, if any.
    async fn get(&self, song: &Song, provider_id: &str, kind: EntityKind)
        -> Result<Option<String>>;

    /// Ordered variants for `(song, provider, kind)`; empty when absent.
    async fn get_all(
        &self,
        song: &Song,
        provider_id: &str,
        kind: EntityKind,
    ) -> Result<Vec<ArtworkVariant>>;

    /// Overwrites the single value.
    async fn set(&self, song: &Song, provider_id: &str, kind: EntityKind, value: &str)
        -> Result<()>;

    /// Replaces the full variant list.
    async fn set_many(
        &self,
        song: &Song,
        provider_id: &str,
        kind: EntityKind,
        variants: &[ArtworkVariant],
    ) -> Result<()>;

    /// Drops the single value and the variant list for `(song, provider, kind)`.
    async fn remove(&self, song: &Song, provider_id: &str, kind: EntityKind) -> Result<()>;

    /// Removes every entry of every kind.
    async fn clear(&self) -> Result<()>;
}

/// [`EntityCache`] over a flat [`KeyValueStore`].
///
/// The store must be dedicated to the cache: `clear` wipes it entirely.
pub struct KeyValueEntityCache {
    store: Arc<dyn KeyValueStore>,
}

impl KeyValueEntityCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

fn storage_error(action: &str, key: &str, error: impl fmt::Display) -> MetadataError {
    MetadataError::Storage(format!("{} '{}': {}", action, key, error))
}

#[async_trait]
impl EntityCache for KeyValueEntityCache {
    async fn get(
        &self,
        song: &Song,
        provider_id: &str,
        kind: EntityKind,
    ) -> Result<Option<String>> {
        let key = CacheKey::new(song, provider_id, kind).storage_key();
        self.store
            .get_string(&key)
            .await
            .map_err(|e| storage_error("Failed to read", &key, e))
    }

    async fn get_all(
        &self,
        song: &Song,
        provider_id: &str,
        kind: EntityKind,
    ) -> Result<Vec<ArtworkVariant>> {
        let key = CacheKey::new(song, provider_id, kind).variants_key();
        let raw = self
            .store
            .get_string(&key)
            .await
            .map_err(|e| storage_error("Failed to read", &key, e))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| storage_error("Corrupt variant list at", &key, e)),
            None => Ok(Vec::new()),
        }
    }

    async fn set(
        &self,
        song: &Song,
        provider_id: &str,
        kind: EntityKind,
        value: &str,
    ) -> Result<()> {
        let key = CacheKey::new(song, provider_id, kind).storage_key();
        self.store
            .set_string(&key, value)
            .await
            .map_err(|e| storage_error("Failed to write", &key, e))?;

        debug!(key = %key, "Cached entity");
        Ok(())
    }

    async fn set_many(
        &self,
        song: &Song,
        provider_id: &str,
        kind: EntityKind,
        variants: &[ArtworkVariant],
    ) -> Result<()> {
        let key = CacheKey::new(song, provider_id, kind).variants_key();
        let json = serde_json::to_string(variants)?;
        self.store
            .set_string(&key, &json)
            .await
            .map_err(|e| storage_error("Failed to write", &key, e))?;

        debug!(key = %key, variants = variants.len(), "Cached entity variants");
        Ok(())
    }

    async fn remove(&self, song: &Song, provider_id: &str, kind: EntityKind) -> Result<()> {
        let key = CacheKey::new(song, provider_id, kind);
        for stored in [key.storage_key(), key.variants_key()] {
            self.store
                .delete(&stored)
                .await
                .map_err(|e| storage_error("Failed to remove", &stored, e))?;
        }
        debug!(key = %key, "Removed cached entity");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.store
            .clear_all()
            .await
            .map_err(|e| MetadataError::Storage(format!("Failed to clear cache: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_are_deterministic() {
        let key = CacheKey::new(
            &Song::new("Imagine", "John Lennon", "").with_playback(42.0, true),
            "p2",
            EntityKind::Lyrics,
        );
        assert_eq!(key.storage_key(), "entity/lyrics/p2/Imagine|John Lennon|");
        assert_eq!(
            key.variants_key(),
            "entity/lyrics/p2/Imagine|John Lennon|#v"
        );
        assert_eq!(key.to_string(), "(Imagine|John Lennon|, p2, lyrics)");
    }

    #[test]
    fn test_keys_differ_by_kind_and_provider() {
        let song = Song::new("Imagine", "John Lennon", "Imagine");
        let a = CacheKey::new(&song, "p1", EntityKind::Lyrics).storage_key();
        let b = CacheKey::new(&song, "p1", EntityKind::Artwork).storage_key();
        let c = CacheKey::new(&song, "p2", EntityKind::Lyrics).storage_key();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_provider_separator_cannot_shift_into_identity() {
        let nested = CacheKey::new(&Song::new("c", "X", ""), "a/b", EntityKind::Lyrics);
        let flat = CacheKey::new(&Song::new("b/c", "X", ""), "a", EntityKind::Lyrics);
        assert_ne!(nested.storage_key(), flat.storage_key());
        assert_eq!(nested.storage_key(), "entity/lyrics/a\\/b/c|X|");
        assert_eq!(flat.storage_key(), "entity/lyrics/a/b/c|X|");
    }

    #[test]
    fn test_single_entry_never_aliases_a_variant_list() {
        let tagged = Song::new("Imagine", "John Lennon", "x#v");
        let plain = Song::new("Imagine", "John Lennon", "x");
        let tagged = CacheKey::new(&tagged, "p1", EntityKind::Artwork);
        let plain = CacheKey::new(&plain, "p1", EntityKind::Artwork);
        assert_ne!(tagged.storage_key(), plain.variants_key());
    }

    #[test]
    fn test_variant_serialization_omits_empty_fields() {
        let plain = serde_json::to_string(&ArtworkVariant::new("https://img/1.jpg")).unwrap();
        assert_eq!(plain, r#"{"url":"https://img/1.jpg"}"#);

        let rich = ArtworkVariant::new("u")
            .with_tag("Imagine")
            .with_metadata("collection_id", "1");
        let back: ArtworkVariant =
            serde_json::from_str(&serde_json::to_string(&rich).unwrap()).unwrap();
        assert_eq!(back, rich);
    }
}
