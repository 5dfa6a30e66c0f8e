// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod records;
pub mod sync;

pub use records::{
    AnalyticsRecord, AudienceRecord, AudienceSegment, PostRecord, ProfileIdentifiers,
    ProfileRecord, CAPTURE_SOURCE,
};
pub use sync::{EndpointType, HistoryEntry, SyncConfig, SyncConfigPatch, SyncState};
