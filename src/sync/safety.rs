// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pure safety checks over persisted sync state.

/// Hard floor between two cycles, independent of the configured interval.
pub const MIN_SYNC_INTERVAL_MS: i64 = 30 * 60 * 1000;

/// A user idle for longer than this is treated as away.
pub const INACTIVITY_THRESHOLD_MS: i64 = 2 * 60 * 60 * 1000;

/// Cap on the back-off multiplier.
pub const MAX_BACKOFF_MULTIPLIER: u32 = 6;

/// `min(2^failures, 6)`.
pub fn backoff_multiplier(consecutive_failures: u32) -> u32 {
    2u32.checked_pow(consecutive_failures)
        .unwrap_or(u32::MAX)
        .min(MAX_BACKOFF_MULTIPLIER)
}

/// Whether enough time has passed since the last cycle. The first sync always may run.
pub fn min_interval_elapsed(last_sync_time: Option<i64>, now: i64) -> bool {
    match last_sync_time {
        Some(last) => now - last >= MIN_SYNC_INTERVAL_MS,
        None => true,
    }
}

/// Whether the user counts as recently active.
///
/// An unknown activity time counts as active.
pub fn user_recently_active(last_active_at: Option<i64>, now: i64) -> bool {
    match last_active_at {
        Some(at) => now - at <= INACTIVITY_THRESHOLD_MS,
        None => true,
    }
}

pub fn should_trip_breaker(consecutive_failures: u32, max_consecutive_failures: u32) -> bool {
    consecutive_failures >= max_consecutive_failures
}
