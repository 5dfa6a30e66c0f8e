// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable wake alarms.
//!
//! Alarms are named, minute-granularity, and persisted in the key-value
//! store so that they survive a process restart. A polling loop fires due
//! alarms by name; it never calls back into the closure that armed them.

use crate::db::{keys, KvStore};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Name of the background sync alarm.
pub const SYNC_ALARM_NAME: &str = "background-sync";

/// Smallest delay the alarm facility accepts.
pub const MIN_ALARM_DELAY_MINUTES: i64 = 1;

/// How often the alarm loop looks for due alarms.
pub const ALARM_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Host timer facility.
#[async_trait]
pub trait AlarmScheduler: Send + Sync {
    /// Arm (or re-arm) `name` to fire after `delay`. Delays below one minute are raised to one minute.
    async fn create(&self, name: &str, delay: Duration) -> Result<DateTime<Utc>>;

    /// Disarm `name`. Returns whether an alarm was armed.
    async fn clear(&self, name: &str) -> Result<bool>;

    /// When `name` is due, if armed.
    async fn next_due(&self, name: &str) -> Result<Option<DateTime<Utc>>>;

    /// Remove and return every alarm due at or before `now`.
    async fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<String>>;
}

/// Alarms persisted in the key-value store as `{name: due_at_ms}`.
pub struct StoredAlarms {
    kv: Arc<dyn KvStore>,
    lock: Mutex<()>,
}

impl StoredAlarms {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, i64>> {
        Ok(match self.kv.get(keys::SYNC_ALARMS).await? {
            Some(v) => serde_json::from_value(v).unwrap_or_default(),
            None => BTreeMap::new(),
        })
    }

    async fn store(&self, alarms: &BTreeMap<String, i64>) -> Result<()> {
        let value = serde_json::to_value(alarms).map_err(anyhow::Error::from)?;
        self.kv.set(keys::SYNC_ALARMS, value).await?;
        Ok(())
    }
}

#[async_trait]
impl AlarmScheduler for StoredAlarms {
    async fn create(&self, name: &str, delay: Duration) -> Result<DateTime<Utc>> {
        let delay = delay.max(Duration::minutes(MIN_ALARM_DELAY_MINUTES));
        let due = Utc::now() + delay;

        let _guard = self.lock.lock().await;
        let mut alarms = self.load().await?;
        alarms.insert(name.to_string(), due.timestamp_millis());
        self.store(&alarms).await?;

        tracing::debug!(alarm = name, due = %crate::time_utils::format_utc_rfc3339(due), "Alarm armed");
        Ok(due)
    }

    async fn clear(&self, name: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut alarms = self.load().await?;
        let existed = alarms.remove(name).is_some();
        if existed {
            self.store(&alarms).await?;
        }
        Ok(existed)
    }

    async fn next_due(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        let alarms = self.load().await?;
        Ok(alarms
            .get(name)
            .and_then(|ms| DateTime::from_timestamp_millis(*ms)))
    }

    async fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        let mut alarms = self.load().await?;
        let now_ms = now.timestamp_millis();

        let due: Vec<String> = alarms
            .iter()
            .filter(|(_, at)| **at <= now_ms)
            .map(|(name, _)| name.clone())
            .collect();

        if !due.is_empty() {
            alarms.retain(|_, at| *at > now_ms);
            self.store(&alarms).await?;
        }
        Ok(due)
    }
}

/// Poll for due alarms forever, calling `on_fire` with each due alarm name.
pub async fn run_alarm_loop<F, Fut>(
    alarms: Arc<dyn AlarmScheduler>,
    poll_interval: std::time::Duration,
    on_fire: F,
) where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let due = match alarms.take_due(Utc::now()).await {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read alarms");
                continue;
            }
        };

        for name in due {
            tracing::info!(alarm = %name, "Alarm fired");
            on_fire(name).await;
        }
    }
}
