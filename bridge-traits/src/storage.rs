//! Key-Value Storage Abstraction
//!
//! A flat string-to-string store. The metadata crate builds its entity cache
//! on top of it; hosts back it with SQLite, browser storage or memory.

use async_trait::async_trait;

use crate::error::Result;

/// Flat key-value store trait
///
/// Values are opaque strings; callers serialize structured data themselves.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember(store: &dyn KeyValueStore) -> Result<()> {
///     store.set_string("lyrics/lrclib/Imagine|John Lennon|", "[00:01.00]...").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store a value, overwriting any previous value for the key
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a key; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// List all keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Remove every entry
    ///
    /// Must be atomic: readers observe either the full previous state or an
    /// empty store, never a partially cleared one.
    async fn clear_all(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use mockall::mock;

    mock! {
        Store {}

        #[async_trait]
        impl KeyValueStore for Store {
            async fn set_string(&self, key: &str, value: &str) -> Result<()>;
            async fn get_string(&self, key: &str) -> Result<Option<String>>;
            async fn delete(&self, key: &str) -> Result<()>;
            async fn list_keys(&self) -> Result<Vec<String>>;
            async fn clear_all(&self) -> Result<()>;
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let mut store = MockStore::new();
        store
            .expect_get_string()
            .withf(|key| key == "k")
            .returning(|_| Ok(Some("v".to_string())));
        store
            .expect_clear_all()
            .returning(|| Err(BridgeError::StorageError("locked".to_string())));

        let store: &dyn KeyValueStore = &store;
        assert_eq!(store.get_string("k").await.unwrap(), Some("v".to_string()));
        assert!(store.clear_all().await.is_err());
    }
}
