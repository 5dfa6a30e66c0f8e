// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduling documents: user sync configuration and runtime sync state.
//!
//! Both documents are read and written as whole objects. Field names are
//! camelCase because the popup UI reads them directly.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Maximum number of history entries retained in [`SyncState`].
pub const MAX_HISTORY_ENTRIES: usize = 20;

/// Remote endpoints harvested by the background sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub enum EndpointType {
    Analytics,
    Profile,
    Audience,
    MyPosts,
    ProfileViews,
    NetworkInfo,
}

impl EndpointType {
    /// Every known endpoint, in declaration order.
    pub const ALL: [EndpointType; 6] = [
        EndpointType::Analytics,
        EndpointType::Profile,
        EndpointType::Audience,
        EndpointType::MyPosts,
        EndpointType::ProfileViews,
        EndpointType::NetworkInfo,
    ];

    /// Endpoints that cannot be called without a profile URN.
    pub const REQUIRES_PROFILE_URN: [EndpointType; 3] = [
        EndpointType::MyPosts,
        EndpointType::ProfileViews,
        EndpointType::NetworkInfo,
    ];

    /// Endpoints that cannot be called without a public identifier.
    pub const REQUIRES_PUBLIC_IDENTIFIER: [EndpointType; 1] = [EndpointType::Profile];

    /// Endpoints that 404 for accounts without creator access.
    pub const CREATOR_ONLY: [EndpointType; 2] = [EndpointType::Analytics, EndpointType::Audience];

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointType::Analytics => "analytics",
            EndpointType::Profile => "profile",
            EndpointType::Audience => "audience",
            EndpointType::MyPosts => "myPosts",
            EndpointType::ProfileViews => "profileViews",
            EndpointType::NetworkInfo => "networkInfo",
        }
    }

    pub fn requires_profile_urn(&self) -> bool {
        Self::REQUIRES_PROFILE_URN.contains(self)
    }

    pub fn requires_public_identifier(&self) -> bool {
        Self::REQUIRES_PUBLIC_IDENTIFIER.contains(self)
    }

    pub fn is_creator_only(&self) -> bool {
        Self::CREATOR_ONLY.contains(self)
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EndpointType::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown endpoint type: {}", s))
    }
}

/// Per-endpoint opt-in map with every endpoint enabled.
pub fn default_endpoints() -> BTreeMap<EndpointType, bool> {
    EndpointType::ALL.into_iter().map(|e| (e, true)).collect()
}

/// Deserialize an endpoint map, dropping unknown keys and filling in
/// missing endpoints with `true`.
fn deserialize_endpoints<'de, D>(deserializer: D) -> Result<BTreeMap<EndpointType, bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, bool> = BTreeMap::deserialize(deserializer)?;
    let mut endpoints = default_endpoints();
    endpoints.extend(known_endpoint_entries(raw));
    Ok(endpoints)
}

fn deserialize_endpoint_patch<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<EndpointType, bool>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, bool>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|m| known_endpoint_entries(m).collect()))
}

fn known_endpoint_entries(
    raw: BTreeMap<String, bool>,
) -> impl Iterator<Item = (EndpointType, bool)> {
    raw.into_iter()
        .filter_map(|(k, v)| k.parse::<EndpointType>().ok().map(|e| (e, v)))
}

/// User-controlled sync configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub base_interval_minutes: u32,
    pub jitter_minutes: u32,
    pub max_api_calls_per_sync: u32,
    pub active_hours_only: bool,
    pub max_consecutive_failures: u32,
    #[serde(deserialize_with = "deserialize_endpoints")]
    pub endpoints: BTreeMap<EndpointType, bool>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_interval_minutes: 120,
            jitter_minutes: 30,
            max_api_calls_per_sync: 3,
            active_hours_only: true,
            max_consecutive_failures: 5,
            endpoints: default_endpoints(),
        }
    }
}

impl SyncConfig {
    /// Apply a partial update. The endpoint map is merged key by key.
    pub fn merge(&mut self, patch: &SyncConfigPatch) {
        if let Some(v) = patch.enabled {
            self.enabled = v;
        }
        if let Some(v) = patch.base_interval_minutes {
            self.base_interval_minutes = v;
        }
        if let Some(v) = patch.jitter_minutes {
            self.jitter_minutes = v;
        }
        if let Some(v) = patch.max_api_calls_per_sync {
            self.max_api_calls_per_sync = v;
        }
        if let Some(v) = patch.active_hours_only {
            self.active_hours_only = v;
        }
        if let Some(v) = patch.max_consecutive_failures {
            self.max_consecutive_failures = v;
        }
        if let Some(endpoints) = &patch.endpoints {
            self.endpoints.extend(endpoints.iter().map(|(k, v)| (*k, *v)));
        }
    }

    /// Endpoints the user has opted into, in declaration order.
    pub fn enabled_endpoints(&self) -> Vec<EndpointType> {
        EndpointType::ALL
            .into_iter()
            .filter(|e| self.endpoints.get(e).copied().unwrap_or(true))
            .collect()
    }
}

/// Partial configuration update sent by the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfigPatch {
    pub enabled: Option<bool>,
    #[validate(range(min = 1, max = 1440))]
    pub base_interval_minutes: Option<u32>,
    #[validate(range(max = 720))]
    pub jitter_minutes: Option<u32>,
    #[validate(range(min = 1, max = 6))]
    pub max_api_calls_per_sync: Option<u32>,
    pub active_hours_only: Option<bool>,
    #[validate(range(min = 1, max = 100))]
    pub max_consecutive_failures: Option<u32>,
    #[serde(
        deserialize_with = "deserialize_endpoint_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub endpoints: Option<BTreeMap<EndpointType, bool>>,
}

/// One completed sync cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Cycle start (ms since epoch)
    pub timestamp: i64,
    pub endpoints_fetched: Vec<EndpointType>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    /// Wall-clock duration in milliseconds
    pub duration: i64,
    pub api_call_count: u32,
}

/// Runtime sync state. The only source of truth across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncState {
    pub enabled: bool,
    pub last_sync_time: Option<i64>,
    pub last_sync_success: bool,
    pub consecutive_failures: u32,
    pub next_sync_time: Option<i64>,
    pub total_syncs: u64,
    pub total_api_calls: u64,
    pub circuit_breaker_tripped: bool,
    pub last_error: Option<String>,
    pub sync_history: Vec<HistoryEntry>,
    pub endpoint_last_sync: BTreeMap<EndpointType, i64>,
    pub endpoint_last_success: BTreeMap<EndpointType, bool>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            enabled: false,
            last_sync_time: None,
            last_sync_success: false,
            consecutive_failures: 0,
            next_sync_time: None,
            total_syncs: 0,
            total_api_calls: 0,
            circuit_breaker_tripped: false,
            last_error: None,
            sync_history: Vec::new(),
            endpoint_last_sync: BTreeMap::new(),
            endpoint_last_success: BTreeMap::new(),
        }
    }
}

impl SyncState {
    /// Append a history entry, dropping the oldest entries beyond the cap.
    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.sync_history.push(entry);
        self.trim_history();
    }

    pub fn trim_history(&mut self) {
        if self.sync_history.len() > MAX_HISTORY_ENTRIES {
            let excess = self.sync_history.len() - MAX_HISTORY_ENTRIES;
            self.sync_history.drain(..excess);
        }
    }

    /// Last sync time for an endpoint, 0 if never synced.
    pub fn endpoint_last_sync_or_zero(&self, endpoint: EndpointType) -> i64 {
        self.endpoint_last_sync.get(&endpoint).copied().unwrap_or(0)
    }
}
