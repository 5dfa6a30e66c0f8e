// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable key-value storage.
//!
//! Every document is stored as a whole JSON value under a fixed key and is
//! read-modify-written by callers. `StateStore` layers typed, fail-open
//! access on top of any `KvStore` backend.

pub mod firestore;
pub mod memory;
pub mod state;

pub use firestore::FirestoreStore;
pub use memory::InMemoryStore;
pub use state::StateStore;

use async_trait::async_trait;
use serde_json::Value;

/// Storage keys. These names are shared with other readers and must not change.
pub mod keys {
    pub const SYNC_STATE: &str = "sync_state";
    pub const SYNC_CONFIG: &str = "sync_config";
    pub const ANALYTICS: &str = "analytics";
    pub const PROFILE: &str = "profile";
    pub const AUDIENCE: &str = "audience";
    pub const MY_POSTS: &str = "my_posts";
    /// Last user activity (ms since epoch), written by the UI.
    pub const LAST_ACTIVE_AT: &str = "last_active_at";
    /// Armed wake alarms.
    pub const SYNC_ALARMS: &str = "sync_alarms";
    /// Outbound changes waiting to be pushed.
    pub const PENDING_SYNC_CHANGES: &str = "pending_sync_changes";
}

/// Storage backend errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Stored value is not valid JSON: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Asynchronous whole-document key-value storage.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
