// # Memory Runtime Store
//
// In-memory implementation of RuntimeStore.
//
// ## Purpose
//
// A simple, fast store that does not persist across restarts. Useful for
// tests and for embedders that supply durability elsewhere.
//
// ## Crash Behavior
//
// All state is lost on restart. A create re-invoked after a crash will not
// find its recorded resource id and will provision a fresh droplet, so this
// store is NOT suitable for production reconciliation on its own.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::RuntimeStore;

/// In-memory runtime store
///
/// Stores all entries in a `HashMap` behind an `RwLock`. Cloning shares the
/// underlying map, which lets tests keep a handle for inspection while the
/// context owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryRuntimeStore {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryRuntimeStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Clone of the full key-value map, for test assertions
    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl RuntimeStore for MemoryRuntimeStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn basic_get_set_remove() {
        let store = MemoryRuntimeStore::new();
        assert!(store.is_empty().await);

        store
            .set("resource_id", serde_json::json!(12345))
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.get("resource_id").await.unwrap(),
            Some(serde_json::json!(12345))
        );

        store.remove("resource_id").await.unwrap();
        assert!(store.is_empty().await);
        assert_eq!(store.get("resource_id").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = MemoryRuntimeStore::new();
        let other = store.clone();

        store.set("k", serde_json::json!("v")).await.unwrap();
        assert_eq!(other.get("k").await.unwrap(), Some(serde_json::json!("v")));
    }

    #[tokio::test]
    async fn set_overwrites() {
        let store = MemoryRuntimeStore::new();
        store.set("k", serde_json::json!(1)).await.unwrap();
        store.set("k", serde_json::json!(2)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(serde_json::json!(2)));
    }
}
