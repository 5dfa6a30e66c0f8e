//! In-memory storage backend for tests and ephemeral runs.

use super::{KvStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// `KvStore` kept entirely in memory.
#[derive(Default)]
pub struct InMemoryStore {
    entries: DashMap<String, Value>,
    /// When set, every operation fails (test builds use this to exercise
    /// the fail-open paths).
    failing: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation return an error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("in-memory store set to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.check()?;
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.check()?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = InMemoryStore::new();
        store.set("a", json!({"x": 1})).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(json!({"x": 1})));

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        // Removing again is fine
        store.remove("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_store_errors() {
        let store = InMemoryStore::new();
        store.set_failing(true);

        assert!(store.get("a").await.is_err());
        assert!(store.set("a", json!(1)).await.is_err());
        assert!(store.is_empty());
    }
}
