//! Network size processor. Results merge into the profile document.

use super::extract::{first_count, locate_entity, merge_count, require_object};
use super::ProcessorContext;
use crate::db::keys;
use crate::models::{ProfileRecord, CAPTURE_SOURCE};
use serde_json::Value;

const MARKERS: [&str; 3] = ["networkinfo", "followinginfo", "memberrelationship"];

const FOLLOWERS: [&str; 5] = [
    "followersCount",
    "followerCount",
    "followingInfo.followerCount",
    "followingInfo.followersCount",
    "data.followersCount",
];
const CONNECTIONS: [&str; 4] = [
    "connectionsCount",
    "connectionCount",
    "distance.connectionsCount",
    "data.connectionsCount",
];

/// Observed (followers, connections).
pub fn extract(payload: &Value) -> (Option<u64>, Option<u64>) {
    let entity = locate_entity(payload, &MARKERS);
    (
        first_count(entity, &FOLLOWERS),
        first_count(entity, &CONNECTIONS),
    )
}

pub async fn process(ctx: &ProcessorContext<'_>, payload: &Value) -> Option<ProfileRecord> {
    require_object(payload, "networkInfo")?;

    let (followers, connections) = extract(payload);
    let mut record: ProfileRecord = ctx
        .store
        .get_document(keys::PROFILE)
        .await
        .unwrap_or_default();
    record.followers_count = merge_count(record.followers_count, followers);
    record.connections_count = merge_count(record.connections_count, connections);
    record.source = CAPTURE_SOURCE.to_string();
    record.captured_at = ctx.now;

    tracing::info!(
        followers = ?record.followers_count,
        connections = ?record.connections_count,
        "Captured network info"
    );
    ctx.save_with_sync(keys::PROFILE, &record).await;
    Some(record)
}
