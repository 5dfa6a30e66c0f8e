//! Creator analytics processor.

use super::extract::{first_count, locate_entity, merge_count, require_object};
use super::ProcessorContext;
use crate::db::keys;
use crate::models::{AnalyticsRecord, CAPTURE_SOURCE};
use serde_json::Value;

const MARKERS: [&str; 3] = ["creatoranalytics", "analytics", "topcardcore"];

const IMPRESSIONS: [&str; 5] = [
    "impressions",
    "impressionCount",
    "totalImpressions",
    "value.impressions",
    "postImpressions",
];
const MEMBERS_REACHED: [&str; 4] = [
    "membersReached",
    "uniqueImpressionsCount",
    "reach",
    "value.membersReached",
];
const ENGAGEMENTS: [&str; 4] = [
    "engagements",
    "engagementCount",
    "totalEngagements",
    "value.engagements",
];
const PROFILE_VIEWS: [&str; 3] = ["profileViews", "profileViewCount", "value.profileViews"];
const SEARCH_APPEARANCES: [&str; 3] = [
    "searchAppearances",
    "searchAppearanceCount",
    "value.searchAppearances",
];
const FOLLOWERS: [&str; 4] = [
    "followers",
    "followerCount",
    "followersCount",
    "value.followers",
];

/// Extract an analytics record from a payload.
pub fn extract(payload: &Value) -> AnalyticsRecord {
    let entity = locate_entity(payload, &MARKERS);
    AnalyticsRecord {
        impressions: first_count(entity, &IMPRESSIONS),
        members_reached: first_count(entity, &MEMBERS_REACHED),
        engagements: first_count(entity, &ENGAGEMENTS),
        profile_views: first_count(entity, &PROFILE_VIEWS),
        search_appearances: first_count(entity, &SEARCH_APPEARANCES),
        followers: first_count(entity, &FOLLOWERS),
        ..Default::default()
    }
}

/// Merge a fresh extraction over the stored analytics document.
pub fn merge(existing: Option<AnalyticsRecord>, observed: AnalyticsRecord) -> AnalyticsRecord {
    let existing = existing.unwrap_or_default();
    AnalyticsRecord {
        impressions: merge_count(existing.impressions, observed.impressions),
        members_reached: merge_count(existing.members_reached, observed.members_reached),
        engagements: merge_count(existing.engagements, observed.engagements),
        profile_views: merge_count(existing.profile_views, observed.profile_views),
        search_appearances: merge_count(existing.search_appearances, observed.search_appearances),
        followers: merge_count(existing.followers, observed.followers),
        source: observed.source,
        captured_at: observed.captured_at,
    }
}

pub async fn process(ctx: &ProcessorContext<'_>, payload: &Value) -> Option<AnalyticsRecord> {
    require_object(payload, "analytics")?;

    let mut observed = extract(payload);
    observed.source = CAPTURE_SOURCE.to_string();
    observed.captured_at = ctx.now;

    let existing = ctx.store.get_document(keys::ANALYTICS).await;
    let record = merge(existing, observed);

    tracing::info!(
        impressions = ?record.impressions,
        followers = ?record.followers,
        "Captured creator analytics"
    );
    ctx.save_with_sync(keys::ANALYTICS, &record).await;
    Some(record)
}
