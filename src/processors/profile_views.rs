//! Profile view count processor. Results merge into the analytics document.

use super::extract::{first_count, included, locate_entity, merge_count, require_object};
use super::ProcessorContext;
use crate::db::keys;
use crate::models::{AnalyticsRecord, CAPTURE_SOURCE};
use serde_json::Value;

const MARKERS: [&str; 3] = ["profileview", "wvmp", "viewer"];

const PROFILE_VIEWS: [&str; 8] = [
    "profileViews",
    "numViews",
    "viewCount",
    "totalViews",
    "value.numViews",
    "value.profileViews",
    "value.extraProfileViewers",
    "extraProfileViewers",
];

/// Observed view count, scanning every included entity as a last resort.
pub fn extract(payload: &Value) -> Option<u64> {
    let entity = locate_entity(payload, &MARKERS);
    first_count(entity, &PROFILE_VIEWS).or_else(|| {
        included(payload)
            .iter()
            .find_map(|e| first_count(e, &PROFILE_VIEWS))
    })
}

pub async fn process(ctx: &ProcessorContext<'_>, payload: &Value) -> Option<AnalyticsRecord> {
    require_object(payload, "profileViews")?;

    let observed = extract(payload);
    let mut record: AnalyticsRecord = ctx
        .store
        .get_document(keys::ANALYTICS)
        .await
        .unwrap_or_default();
    record.profile_views = merge_count(record.profile_views, observed);
    record.source = CAPTURE_SOURCE.to_string();
    record.captured_at = ctx.now;

    tracing::info!(
        observed = ?observed,
        profile_views = ?record.profile_views,
        "Captured profile views"
    );
    ctx.save_with_sync(keys::ANALYTICS, &record).await;
    Some(record)
}
