// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data processors, one per endpoint type.
//!
//! Each processor maps a raw API payload to a normalized record, merges it
//! into the stored document, and hands the result to the outbound sync
//! bridge. Processors never fail: malformed payloads are logged and skipped.

pub mod analytics;
pub mod audience;
pub mod extract;
pub mod network_info;
pub mod posts;
pub mod profile;
pub mod profile_views;

use crate::db::StateStore;
use crate::models::EndpointType;
use crate::services::outbound::OutboundSync;
use serde::Serialize;
use serde_json::Value;

/// Dependencies shared by all processors.
pub struct ProcessorContext<'a> {
    pub store: &'a StateStore,
    pub outbound: &'a dyn OutboundSync,
    /// Capture time stamped on records (ms since epoch)
    pub now: i64,
}

impl<'a> ProcessorContext<'a> {
    pub fn new(store: &'a StateStore, outbound: &'a dyn OutboundSync) -> Self {
        Self {
            store,
            outbound,
            now: crate::time_utils::now_millis(),
        }
    }

    /// Persist a whole document through the outbound bridge.
    ///
    /// Falls back to a plain store write if the bridge fails.
    pub(crate) async fn save_with_sync<T: Serialize>(&self, key: &str, record: &T) {
        let value = match serde_json::to_value(record) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to encode record");
                return;
            }
        };

        if let Err(e) = self.outbound.save_with_sync(key, value.clone()).await {
            tracing::warn!(key, error = %e, "Outbound save failed, storing locally");
            self.store.save_value(key, value).await;
        }
    }

    pub(crate) async fn queue_for_sync<T: Serialize>(&self, key: &str, record: &T) {
        match serde_json::to_value(record) {
            Ok(value) => {
                if let Err(e) = self.outbound.queue_for_sync(key, value).await {
                    tracing::warn!(key, error = %e, "Failed to queue record for outbound sync");
                }
            }
            Err(e) => tracing::error!(key, error = %e, "Failed to encode record"),
        }
    }
}

/// Route a successful payload to the processor for `endpoint`.
pub async fn process(endpoint: EndpointType, ctx: &ProcessorContext<'_>, payload: &Value) {
    match endpoint {
        EndpointType::Analytics => {
            analytics::process(ctx, payload).await;
        }
        EndpointType::Profile => {
            profile::process(ctx, payload).await;
        }
        EndpointType::Audience => {
            audience::process(ctx, payload).await;
        }
        EndpointType::MyPosts => {
            posts::process(ctx, payload).await;
        }
        EndpointType::ProfileViews => {
            profile_views::process(ctx, payload).await;
        }
        EndpointType::NetworkInfo => {
            network_info::process(ctx, payload).await;
        }
    }
}
