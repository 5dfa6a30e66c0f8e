// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore storage backend.
//!
//! Each key maps to one document in a single collection. The document keeps
//! the JSON text of the value so that arbitrary documents round-trip
//! without depending on Firestore's type mapping.

use super::{KvStore, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default collection holding sync documents.
pub const DEFAULT_COLLECTION: &str = "profile_sync";

/// Firestore document wrapping one stored value.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    /// JSON-encoded value
    payload: String,
    /// Last write (RFC 3339)
    updated_at: String,
}

/// Firestore-backed `KvStore`.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
    collection: String,
}

impl FirestoreStore {
    /// Connect to Firestore.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, collection: &str) -> Result<Self, StoreError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id, collection).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, collection, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            collection: collection.to_string(),
        })
    }

    /// Connect to the emulator with a dummy token instead of ambient credentials.
    async fn create_emulator_client(project_id: &str, collection: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJzeW5jIn0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            collection,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            collection: collection.to_string(),
        })
    }

    /// Offline store for tests. Every operation returns an error.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Backend("Database not connected (offline mode)".to_string()))
    }
}

#[async_trait]
impl KvStore for FirestoreStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let doc: Option<StoredDocument> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(&self.collection)
            .obj()
            .one(key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match doc {
            Some(doc) => Ok(Some(serde_json::from_str(&doc.payload)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let doc = StoredDocument {
            payload: serde_json::to_string(&value)?,
            updated_at: crate::time_utils::format_utc_rfc3339(chrono::Utc::now()),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(&self.collection)
            .document_id(key)
            .object(&doc)
            .execute()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(self.collection.as_str())
            .document_id(key)
            .execute()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_store_reports_offline() {
        let store = FirestoreStore::new_mock();
        let err = store.get("sync_state").await.unwrap_err();
        assert!(err.to_string().contains("offline"));
        assert!(store.set("k", serde_json::json!(1)).await.is_err());
    }
}
