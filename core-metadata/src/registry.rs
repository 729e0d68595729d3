//! # Provider Registry
//!
//! Resolves provider ids to live instances. Factories are registered up front
//! by the composition root; an instance is created on first load and reused
//! afterwards.

use crate::error::{MetadataError, Result};
use crate::kind::ResolutionKind;
use crate::provider::Provider;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Resolves a provider id to an instance. Unknown ids are an error.
#[async_trait]
pub trait ProviderLoader<K: ResolutionKind>: Send + Sync {
    async fn load(&self, id: &str) -> Result<Arc<dyn Provider<K>>>;
}

type Factory<K> = Box<dyn Fn() -> Result<Arc<dyn Provider<K>>> + Send + Sync>;

pub struct ProviderRegistry<K: ResolutionKind> {
    factories: HashMap<String, Factory<K>>,
    instances: Mutex<HashMap<String, Arc<dyn Provider<K>>>>,
}

impl<K: ResolutionKind> ProviderRegistry<K> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a lazily constructed provider. A later registration under the
    /// same id replaces the earlier one.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Arc<dyn Provider<K>>> + Send + Sync + 'static,
    {
        let id = id.into();
        self.lock_instances().remove(&id);
        self.factories.insert(id, Box::new(factory));
    }

    /// Registers an already constructed provider under its own id.
    pub fn register_instance(&mut self, provider: Arc<dyn Provider<K>>) {
        let id = provider.id().to_string();
        self.factories.remove(&id);
        self.lock_instances().insert(id, provider);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id) || self.lock_instances().contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .factories
            .keys()
            .cloned()
            .chain(self.lock_instances().keys().cloned())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    fn lock_instances(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn Provider<K>>>> {
        self.instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<K: ResolutionKind> Default for ProviderRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: ResolutionKind> ProviderLoader<K> for ProviderRegistry<K> {
    async fn load(&self, id: &str) -> Result<Arc<dyn Provider<K>>> {
        if let Some(provider) = self.lock_instances().get(id) {
            return Ok(Arc::clone(provider));
        }

        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| MetadataError::ProviderNotFound(id.to_string()))?;

        let provider = factory()?;
        debug!(provider = %id, kind = %K::KIND, "Provider instantiated");

        // Another load may have raced us here; keep whichever landed first.
        let mut instances = self.lock_instances();
        let provider = instances
            .entry(id.to_string())
            .or_insert(provider)
            .clone();
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::LyricsKind;
    use crate::song::Song;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    struct Static(&'static str);

    #[async_trait]
    impl Provider<LyricsKind> for Static {
        fn id(&self) -> &str {
            self.0
        }

        async fn fetch(&self, _song: &Song, _cancel: CancellationToken) -> Result<Option<String>> {
            Ok(Some(format!("from {}", self.0)))
        }
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let registry = ProviderRegistry::<LyricsKind>::new();
        let err = registry.load("nope").await.err().unwrap();
        assert!(matches!(err, MetadataError::ProviderNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_factory_runs_once() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();

        let mut registry = ProviderRegistry::<LyricsKind>::new();
        registry.register("a", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Static("a")) as Arc<dyn Provider<LyricsKind>>)
        });

        let first = registry.load("a").await.unwrap();
        let second = registry.load("a").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_factory_error_propagates_and_is_retried() {
        let mut registry = ProviderRegistry::<LyricsKind>::new();
        registry.register("broken", || {
            Err(MetadataError::provider_failed("broken", "missing API key"))
        });

        assert!(registry.load("broken").await.is_err());
        assert!(registry.load("broken").await.is_err());
        assert!(registry.contains("broken"));
    }

    #[test]
    fn test_ids_sorted_and_deduplicated() {
        let mut registry = ProviderRegistry::<LyricsKind>::new();
        registry.register_instance(Arc::new(Static("b")));
        registry.register("a", || Ok(Arc::new(Static("a")) as Arc<dyn Provider<LyricsKind>>));
        assert_eq!(registry.ids(), vec!["a".to_string(), "b".to_string()]);
    }
}
