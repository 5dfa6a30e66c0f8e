// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Profile-Sync: background analytics harvesting for a social profile
//!
//! This crate periodically fetches a member's analytics, profile, audience
//! and post data from the remote web API on a jittered, backed-off
//! schedule, and exposes the sync controls over a small JSON API.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod processors;
pub mod routes;
pub mod services;
pub mod sync;
pub mod time_utils;

use config::Config;
use std::sync::Arc;
use sync::SyncOrchestrator;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub orchestrator: Arc<SyncOrchestrator>,
}
