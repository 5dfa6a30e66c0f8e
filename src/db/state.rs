// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed access to the sync documents.
//!
//! Reads fail open: a missing, unreadable, or undecodable document yields
//! defaults. Writes are best effort: failures are logged and dropped, and
//! the next successful write re-establishes consistency.

use super::{keys, KvStore};
use crate::models::{ProfileIdentifiers, ProfileRecord, SyncConfig, SyncState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Typed facade over a `KvStore`.
#[derive(Clone)]
pub struct StateStore {
    kv: Arc<dyn KvStore>,
}

impl StateStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// The underlying raw store.
    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    pub async fn get_state(&self) -> SyncState {
        self.get_document(keys::SYNC_STATE).await.unwrap_or_default()
    }

    pub async fn get_config(&self) -> SyncConfig {
        self.get_document(keys::SYNC_CONFIG).await.unwrap_or_default()
    }

    pub async fn save_state(&self, state: &SyncState) {
        self.save_document(keys::SYNC_STATE, state).await;
    }

    pub async fn save_config(&self, config: &SyncConfig) {
        self.save_document(keys::SYNC_CONFIG, config).await;
    }

    /// Read and decode a document, `None` on absence or any error.
    pub async fn get_document<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.kv.get(key).await {
            Ok(Some(v)) => v,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read document, using defaults");
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored document could not be decoded");
                None
            }
        }
    }

    /// Encode and write a document. Errors are logged, not returned.
    pub async fn save_document<T: Serialize + ?Sized>(&self, key: &str, doc: &T) {
        let value = match serde_json::to_value(doc) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to encode document");
                return;
            }
        };
        self.save_value(key, value).await;
    }

    pub async fn save_value(&self, key: &str, value: Value) {
        if let Err(e) = self.kv.set(key, value).await {
            tracing::warn!(key, error = %e, "Failed to persist document");
        }
    }

    /// Last recorded user activity (ms since epoch). Errors count as absent.
    pub async fn last_user_activity(&self) -> Option<i64> {
        match self.kv.get(keys::LAST_ACTIVE_AT).await {
            Ok(Some(v)) => v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Could not read last activity timestamp");
                None
            }
        }
    }

    pub async fn record_user_activity(&self, at_ms: i64) {
        self.save_value(keys::LAST_ACTIVE_AT, Value::from(at_ms)).await;
    }

    /// Identifiers derived from the stored profile document.
    pub async fn profile_identifiers(&self) -> ProfileIdentifiers {
        self.get_document::<ProfileRecord>(keys::PROFILE)
            .await
            .map(|p| ProfileIdentifiers::from_profile(&p))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use serde_json::json;

    fn store() -> (Arc<InMemoryStore>, StateStore) {
        let mem = Arc::new(InMemoryStore::new());
        let state = StateStore::new(mem.clone());
        (mem, state)
    }

    #[tokio::test]
    async fn test_defaults_when_absent() {
        let (_, store) = store();
        assert_eq!(store.get_state().await, SyncState::default());
        assert_eq!(store.get_config().await, SyncConfig::default());
    }

    #[tokio::test]
    async fn test_defaults_on_read_error() {
        let (mem, store) = store();
        let mut state = SyncState::default();
        state.total_syncs = 7;
        store.save_state(&state).await;

        mem.set_failing(true);
        assert_eq!(store.get_state().await, SyncState::default());
        // Writes are dropped silently
        store.save_config(&SyncConfig::default()).await;
        mem.set_failing(false);

        assert_eq!(store.get_state().await.total_syncs, 7);
        assert!(mem.get(keys::SYNC_CONFIG).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_defaults_on_garbage_document() {
        let (mem, store) = store();
        mem.set(keys::SYNC_STATE, json!("not an object")).await.unwrap();
        assert_eq!(store.get_state().await, SyncState::default());
    }

    #[tokio::test]
    async fn test_last_user_activity() {
        let (mem, store) = store();
        assert_eq!(store.last_user_activity().await, None);

        store.record_user_activity(1_700_000_000_000).await;
        assert_eq!(store.last_user_activity().await, Some(1_700_000_000_000));

        mem.set_failing(true);
        assert_eq!(store.last_user_activity().await, None);
    }

    #[tokio::test]
    async fn test_profile_identifiers_normalized() {
        let (mem, store) = store();
        mem.set(
            keys::PROFILE,
            json!({"profile_urn": "urn:li:fs_miniProfile:ABC", "public_identifier": "jane-doe"}),
        )
        .await
        .unwrap();

        let ids = store.profile_identifiers().await;
        assert_eq!(ids.profile_urn.as_deref(), Some("urn:li:fsd_profile:ABC"));
        assert_eq!(ids.public_identifier.as_deref(), Some("jane-doe"));
    }
}
