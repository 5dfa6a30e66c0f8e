//! Follower audience processor.

use super::extract::{
    as_number, first_count, first_number, first_string, included, locate_entity, lookup,
    merge_count, require_object,
};
use super::ProcessorContext;
use crate::db::keys;
use crate::models::{AudienceRecord, AudienceSegment, CAPTURE_SOURCE};
use serde_json::Value;

const MARKERS: [&str; 3] = ["audience", "followerinsights", "follower"];

const TOTAL_FOLLOWERS: [&str; 5] = [
    "totalFollowers",
    "followerCount",
    "followersCount",
    "totalFollowerCount",
    "value.totalFollowers",
];
const NEW_FOLLOWERS: [&str; 4] = [
    "newFollowers",
    "newFollowerCount",
    "followerGains",
    "value.newFollowers",
];
const GROWTH_PERCENT: [&str; 4] = [
    "followerGrowthPercent",
    "growthPercentage",
    "percentChange",
    "value.followerGrowthPercent",
];

/// Where demographic lists may live on the entity.
const DEMOGRAPHIC_LISTS: [&str; 4] = [
    "demographics",
    "followerDemographics",
    "topDemographics",
    "value.demographics",
];
const SEGMENT_LABEL: [&str; 4] = ["label", "name", "title.text", "value"];
const SEGMENT_CATEGORY: [&str; 3] = ["category", "type", "demographicType"];
const SEGMENT_PERCENT: [&str; 3] = ["percentage", "percent", "share"];

fn segment(item: &Value, inherited: Option<&str>) -> Option<AudienceSegment> {
    let label = first_string(item, &SEGMENT_LABEL)?;
    let percentage = first_number(item, &SEGMENT_PERCENT)?;
    Some(AudienceSegment {
        category: first_string(item, &SEGMENT_CATEGORY).or_else(|| inherited.map(str::to_string)),
        label,
        percentage,
    })
}

/// Collect demographic segments.
///
/// Lists may be flat, or grouped as `{category, items: [...]}`.
fn demographics(entity: &Value) -> Vec<AudienceSegment> {
    let Some(list) = DEMOGRAPHIC_LISTS
        .iter()
        .find_map(|p| lookup(entity, p).and_then(Value::as_array))
    else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for item in list {
        match item.get("items").and_then(Value::as_array) {
            Some(group) => {
                let category = first_string(item, &SEGMENT_CATEGORY);
                out.extend(group.iter().filter_map(|g| segment(g, category.as_deref())));
            }
            None => out.extend(segment(item, None)),
        }
    }
    out
}

/// Extract an audience record from a payload.
pub fn extract(payload: &Value) -> AudienceRecord {
    let entity = locate_entity(payload, &MARKERS);

    let mut record = AudienceRecord {
        total_followers: first_count(entity, &TOTAL_FOLLOWERS),
        new_followers: first_count(entity, &NEW_FOLLOWERS),
        follower_growth_percent: first_number(entity, &GROWTH_PERCENT),
        demographics: demographics(entity),
        ..Default::default()
    };

    // Follower totals sometimes sit on a sibling entity
    if record.total_followers.is_none() {
        record.total_followers = included(payload)
            .iter()
            .find_map(|e| lookup(e, "followerCount").and_then(as_number))
            .filter(|f| *f >= 0.0)
            .map(|f| f.round() as u64);
    }
    record
}

pub fn merge(existing: Option<AudienceRecord>, observed: AudienceRecord) -> AudienceRecord {
    let existing = existing.unwrap_or_default();
    AudienceRecord {
        total_followers: merge_count(existing.total_followers, observed.total_followers),
        new_followers: observed.new_followers.or(existing.new_followers),
        follower_growth_percent: observed
            .follower_growth_percent
            .or(existing.follower_growth_percent),
        demographics: if observed.demographics.is_empty() {
            existing.demographics
        } else {
            observed.demographics
        },
        source: observed.source,
        captured_at: observed.captured_at,
    }
}

pub async fn process(ctx: &ProcessorContext<'_>, payload: &Value) -> Option<AudienceRecord> {
    require_object(payload, "audience")?;

    let mut observed = extract(payload);
    observed.source = CAPTURE_SOURCE.to_string();
    observed.captured_at = ctx.now;

    let existing = ctx.store.get_document(keys::AUDIENCE).await;
    let record = merge(existing, observed);

    tracing::info!(
        total_followers = ?record.total_followers,
        segments = record.demographics.len(),
        "Captured audience"
    );
    ctx.save_with_sync(keys::AUDIENCE, &record).await;
    Some(record)
}
