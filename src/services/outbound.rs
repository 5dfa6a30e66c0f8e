// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound sync hand-off.
//!
//! Processors persist captured records through this bridge so that the
//! records are also queued for a backend push. The push protocol itself
//! lives elsewhere; `LocalOutbox` only keeps the durable queue and hands
//! queued changes to an attached consumer.

use crate::db::{keys, KvStore};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Oldest changes beyond this many are dropped from the queue.
pub const MAX_PENDING_CHANGES: usize = 500;

/// One queued outbound change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    pub key: String,
    pub record: Value,
    pub queued_at: i64,
}

/// Counts from draining the outbound queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutboundReport {
    pub success: u32,
    pub failed: u32,
}

/// Bridge to the backend store.
#[async_trait]
pub trait OutboundSync: Send + Sync {
    /// Persist `record` under `key` and queue it for push.
    async fn save_with_sync(&self, key: &str, record: Value) -> Result<()>;

    /// Queue `record` for push without persisting it.
    async fn queue_for_sync(&self, key: &str, record: Value) -> Result<()>;

    /// Push queued changes.
    async fn process_pending_changes(&self) -> OutboundReport;

    /// Delete downstream records of `collection` whose key is not in `current_keys`.
    async fn reconcile_posts(&self, collection: &str, current_keys: &HashSet<String>) -> Result<()>;
}

/// Outbound consumer message.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Upsert(PendingChange),
    Reconcile {
        collection: String,
        keep: HashSet<String>,
    },
}

/// Durable outbound queue backed by a `KvStore`.
pub struct LocalOutbox {
    kv: Arc<dyn KvStore>,
    consumer: Option<mpsc::UnboundedSender<OutboundMessage>>,
    /// Serializes read-modify-write of the queue document.
    queue_lock: Mutex<()>,
}

impl LocalOutbox {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            consumer: None,
            queue_lock: Mutex::new(()),
        }
    }

    /// Attach a consumer that receives drained changes.
    pub fn with_consumer(mut self, consumer: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// Changes currently waiting in the queue.
    pub async fn pending(&self) -> Result<Vec<PendingChange>> {
        Ok(match self.kv.get(keys::PENDING_SYNC_CHANGES).await? {
            Some(v) => serde_json::from_value(v).unwrap_or_default(),
            None => Vec::new(),
        })
    }

    async fn enqueue(&self, key: &str, record: Value) -> Result<()> {
        let _guard = self.queue_lock.lock().await;
        let mut queue = self.pending().await?;
        queue.push(PendingChange {
            key: key.to_string(),
            record,
            queued_at: crate::time_utils::now_millis(),
        });
        if queue.len() > MAX_PENDING_CHANGES {
            let excess = queue.len() - MAX_PENDING_CHANGES;
            tracing::warn!(dropped = excess, "Outbound queue full, dropping oldest changes");
            queue.drain(..excess);
        }
        let value = serde_json::to_value(&queue).map_err(anyhow::Error::from)?;
        self.kv.set(keys::PENDING_SYNC_CHANGES, value).await?;
        Ok(())
    }
}

#[async_trait]
impl OutboundSync for LocalOutbox {
    async fn save_with_sync(&self, key: &str, record: Value) -> Result<()> {
        self.kv.set(key, record.clone()).await?;
        self.enqueue(key, record).await
    }

    async fn queue_for_sync(&self, key: &str, record: Value) -> Result<()> {
        self.enqueue(key, record).await
    }

    async fn process_pending_changes(&self) -> OutboundReport {
        let Some(consumer) = &self.consumer else {
            return OutboundReport::default();
        };

        let _guard = self.queue_lock.lock().await;
        let queue = match self.pending().await {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read outbound queue");
                return OutboundReport::default();
            }
        };

        let mut report = OutboundReport::default();
        let mut remaining = Vec::new();
        for change in queue {
            match consumer.send(OutboundMessage::Upsert(change.clone())) {
                Ok(()) => report.success += 1,
                Err(_) => {
                    report.failed += 1;
                    remaining.push(change);
                }
            }
        }

        match serde_json::to_value(&remaining) {
            Ok(v) => {
                if let Err(e) = self.kv.set(keys::PENDING_SYNC_CHANGES, v).await {
                    tracing::warn!(error = %e, "Failed to persist outbound queue");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode outbound queue"),
        }

        tracing::debug!(
            success = report.success,
            failed = report.failed,
            "Processed pending outbound changes"
        );
        report
    }

    async fn reconcile_posts(&self, collection: &str, current_keys: &HashSet<String>) -> Result<()> {
        tracing::info!(
            collection,
            keep = current_keys.len(),
            "Reconciling downstream records"
        );
        let Some(consumer) = &self.consumer else {
            tracing::debug!(collection, "No outbound consumer attached, skipping reconcile");
            return Ok(());
        };
        consumer
            .send(OutboundMessage::Reconcile {
                collection: collection.to_string(),
                keep: current_keys.clone(),
            })
            .map_err(|_| anyhow::anyhow!("outbound consumer closed"))?;
        Ok(())
    }
}

/// Spawn a consumer that records every drained change in the log and
/// returns the sender to attach with [`LocalOutbox::with_consumer`].
///
/// Must be called from within a tokio runtime.
pub fn spawn_log_consumer() -> mpsc::UnboundedSender<OutboundMessage> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message {
                OutboundMessage::Upsert(change) => tracing::info!(
                    key = %change.key,
                    queued_at = change.queued_at,
                    "Outbound change delivered"
                ),
                OutboundMessage::Reconcile { collection, keep } => tracing::info!(
                    collection = %collection,
                    keep = keep.len(),
                    "Outbound reconcile delivered"
                ),
            }
        }
        tracing::debug!("Outbound consumer stopped");
    });
    tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_with_sync_persists_and_queues() {
        let kv = Arc::new(InMemoryStore::new());
        let outbox = LocalOutbox::new(kv.clone());

        outbox
            .save_with_sync(keys::PROFILE, json!({"first_name": "Ada"}))
            .await
            .unwrap();
        outbox
            .queue_for_sync(keys::MY_POSTS, json!({"activity_id": "1"}))
            .await
            .unwrap();

        assert_eq!(
            kv.get(keys::PROFILE).await.unwrap(),
            Some(json!({"first_name": "Ada"}))
        );
        let pending = outbox.pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].key, keys::MY_POSTS);
    }

    #[tokio::test]
    async fn test_process_without_consumer_keeps_queue() {
        let kv = Arc::new(InMemoryStore::new());
        let outbox = LocalOutbox::new(kv);
        outbox.queue_for_sync("k", json!(1)).await.unwrap();

        let report = outbox.process_pending_changes().await;
        assert_eq!(report, OutboundReport::default());
        assert_eq!(outbox.pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_process_drains_to_consumer() {
        let kv = Arc::new(InMemoryStore::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let outbox = LocalOutbox::new(kv).with_consumer(tx);
        outbox.queue_for_sync("a", json!(1)).await.unwrap();
        outbox.queue_for_sync("b", json!(2)).await.unwrap();

        let report = outbox.process_pending_changes().await;

        assert_eq!(report.success, 2);
        assert_eq!(report.failed, 0);
        assert!(outbox.pending().await.unwrap().is_empty());
        match rx.recv().await {
            Some(OutboundMessage::Upsert(change)) => assert_eq!(change.key, "a"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_sends_stay_queued() {
        let kv = Arc::new(InMemoryStore::new());
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let outbox = LocalOutbox::new(kv).with_consumer(tx);
        outbox.queue_for_sync("a", json!(1)).await.unwrap();

        let report = outbox.process_pending_changes().await;
        assert_eq!(report.failed, 1);
        assert_eq!(outbox.pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_queue_is_bounded() {
        let kv = Arc::new(InMemoryStore::new());
        let outbox = LocalOutbox::new(kv);
        for i in 0..MAX_PENDING_CHANGES + 10 {
            outbox.queue_for_sync("k", json!(i)).await.unwrap();
        }

        let pending = outbox.pending().await.unwrap();
        assert_eq!(pending.len(), MAX_PENDING_CHANGES);
        assert_eq!(pending[0].record, json!(10));
    }

    #[tokio::test]
    async fn test_reconcile_reports_closed_consumer() {
        let kv = Arc::new(InMemoryStore::new());
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let outbox = LocalOutbox::new(kv).with_consumer(tx);
        let keep: HashSet<String> = ["1".to_string()].into_iter().collect();

        assert!(outbox.reconcile_posts(keys::MY_POSTS, &keep).await.is_err());
    }

    #[tokio::test]
    async fn test_log_consumer_drains_queue() {
        let kv = Arc::new(InMemoryStore::new());
        let outbox = LocalOutbox::new(kv).with_consumer(spawn_log_consumer());
        outbox.queue_for_sync("a", json!(1)).await.unwrap();

        let report = outbox.process_pending_changes().await;

        assert_eq!(report.success, 1);
        assert!(outbox.pending().await.unwrap().is_empty());
    }
}
