// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authored posts processor.
//!
//! Fetched posts are reconciled against the stored list by activity id.
//! New posts are inserted, known posts are merged field by field, and a
//! known post whose metrics moved is queued again for outbound sync.

use super::extract::{
    elements, entity_type, first_count, first_number, first_string, included, lookup,
    require_object,
};
use super::ProcessorContext;
use crate::db::keys;
use crate::models::{PostRecord, CAPTURE_SOURCE};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Most recent posts kept in the stored list.
pub const MAX_STORED_POSTS: usize = 100;

const ACTIVITY_URN_PREFIX: &str = "urn:li:activity:";

/// Included entity types that describe a post.
const MARKERS: [&str; 4] = ["update", "activity", "share", "post"];

const URN: [&str; 6] = [
    "activityUrn",
    "urn",
    "entityUrn",
    "updateMetadata.urn",
    "metadata.backendUrn",
    "backendUrn",
];
const ACTIVITY_ID: [&str; 2] = ["activityId", "id"];
const TEXT: [&str; 5] = [
    "commentary.text.text",
    "commentary.text",
    "text.text",
    "text",
    "content.text",
];
const CREATED_AT: [&str; 5] = [
    "createdAt",
    "created.time",
    "publishedAt",
    "postedAt",
    "firstPublishedAt",
];
const IMPRESSIONS: [&str; 4] = [
    "impressions",
    "impressionCount",
    "numImpressions",
    "analytics.impressions",
];
const REACTIONS: [&str; 5] = [
    "reactions",
    "numLikes",
    "likeCount",
    "reactionCount",
    "socialDetail.totalSocialActivityCounts.numLikes",
];
const COMMENTS: [&str; 4] = [
    "comments",
    "numComments",
    "commentCount",
    "socialDetail.totalSocialActivityCounts.numComments",
];
const REPOSTS: [&str; 5] = [
    "reposts",
    "numShares",
    "shareCount",
    "repostCount",
    "socialDetail.totalSocialActivityCounts.numShares",
];

/// Bits below the timestamp in a Snowflake-style activity id.
const SNOWFLAKE_TIMESTAMP_SHIFT: u32 = 22;
/// 2015-01-01T00:00:00Z
const EARLIEST_PLAUSIBLE_MS: i64 = 1_420_070_400_000;
/// 2031-01-01T00:00:00Z
const LATEST_PLAUSIBLE_MS: i64 = 1_924_992_000_000;

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostsOutcome {
    pub inserted: usize,
    /// Known posts whose metrics changed and were queued again.
    pub updated: usize,
    pub unchanged: usize,
    /// Stored posts missing from the fetched set.
    pub stale: usize,
    pub stored: usize,
}

/// Numeric activity id from an activity URN (possibly embedded in a
/// longer URN such as `urn:li:fs_updateV2:(urn:li:activity:123,...)`).
pub fn activity_id_from_urn(urn: &str) -> Option<String> {
    let start = urn.find(ACTIVITY_URN_PREFIX)? + ACTIVITY_URN_PREFIX.len();
    let digits: String = urn[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    (!digits.is_empty()).then_some(digits)
}

/// Decode the creation time embedded in a Snowflake-style id.
///
/// Returns `None` when the decoded time falls outside the plausible window.
pub fn timestamp_from_activity_id(id: &str) -> Option<i64> {
    let raw: u64 = id.parse().ok()?;
    let ms = i64::try_from(raw >> SNOWFLAKE_TIMESTAMP_SHIFT).ok()?;
    (EARLIEST_PLAUSIBLE_MS..LATEST_PLAUSIBLE_MS)
        .contains(&ms)
        .then_some(ms)
}

fn activity_id(entity: &Value) -> Option<(String, Option<String>)> {
    for path in URN {
        if let Some(urn) = lookup(entity, path).and_then(Value::as_str) {
            if let Some(id) = activity_id_from_urn(urn) {
                return Some((id.clone(), Some(format!("{}{}", ACTIVITY_URN_PREFIX, id))));
            }
        }
    }

    ACTIVITY_ID.iter().find_map(|path| {
        let id = match lookup(entity, path)? {
            Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
                s.clone()
            }
            Value::Number(n) => n.as_u64()?.to_string(),
            _ => return None,
        };
        let urn = format!("{}{}", ACTIVITY_URN_PREFIX, id);
        Some((id, Some(urn)))
    })
}

fn posted_at(entity: &Value, id: &str) -> Option<i64> {
    first_number(entity, &CREATED_AT)
        .map(|ms| ms.round() as i64)
        .filter(|ms| *ms > 0)
        .or_else(|| timestamp_from_activity_id(id))
}

/// Parse one post entity, `None` if it carries no activity id.
pub fn extract_post(entity: &Value) -> Option<PostRecord> {
    let (activity_id, activity_urn) = activity_id(entity)?;
    Some(PostRecord {
        posted_at: posted_at(entity, &activity_id),
        text: first_string(entity, &TEXT),
        impressions: first_count(entity, &IMPRESSIONS),
        reactions: first_count(entity, &REACTIONS),
        comments: first_count(entity, &COMMENTS),
        reposts: first_count(entity, &REPOSTS),
        activity_id,
        activity_urn,
        ..Default::default()
    })
}

/// All posts in a payload, deduplicated by activity id.
///
/// Reads `elements` when present, otherwise post-like `included`
/// entities. Later duplicates are merged into earlier ones.
pub fn extract(payload: &Value) -> Vec<PostRecord> {
    let from_elements = elements(payload);
    let candidates: Vec<&Value> = if from_elements.is_empty() {
        included(payload)
            .iter()
            .filter(|e| {
                entity_type(e).is_some_and(|t| MARKERS.iter().any(|m| t.contains(m)))
            })
            .collect()
    } else {
        from_elements.iter().collect()
    };

    let mut posts: Vec<PostRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for post in candidates.into_iter().filter_map(extract_post) {
        match index.get(&post.activity_id) {
            Some(&i) => posts[i].merge_from(post),
            None => {
                index.insert(post.activity_id.clone(), posts.len());
                posts.push(post);
            }
        }
    }
    posts
}

/// Newest first, unknown times last, capped.
fn sort_and_cap(posts: &mut Vec<PostRecord>) {
    posts.sort_by(|a, b| match (a.posted_at, b.posted_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    posts.truncate(MAX_STORED_POSTS);
}

pub async fn process(ctx: &ProcessorContext<'_>, payload: &Value) -> Option<PostsOutcome> {
    require_object(payload, "myPosts")?;

    let fetched = extract(payload);
    if fetched.is_empty() {
        tracing::info!("No posts found in payload, leaving stored posts untouched");
        return None;
    }

    let mut posts: Vec<PostRecord> = ctx
        .store
        .get_document(keys::MY_POSTS)
        .await
        .unwrap_or_default();
    let mut index: HashMap<String, usize> = posts
        .iter()
        .enumerate()
        .map(|(i, p)| (p.activity_id.clone(), i))
        .collect();

    let fetched_ids: HashSet<String> = fetched.iter().map(|p| p.activity_id.clone()).collect();
    let mut outcome = PostsOutcome {
        stale: index.keys().filter(|id| !fetched_ids.contains(*id)).count(),
        ..Default::default()
    };

    let mut to_queue = Vec::new();
    for mut post in fetched {
        post.source = CAPTURE_SOURCE.to_string();
        post.captured_at = ctx.now;

        match index.get(&post.activity_id) {
            Some(&i) => {
                let changed = post.metrics_differ(&posts[i]);
                posts[i].merge_from(post);
                if changed {
                    outcome.updated += 1;
                    to_queue.push(posts[i].clone());
                } else {
                    outcome.unchanged += 1;
                }
            }
            None => {
                outcome.inserted += 1;
                index.insert(post.activity_id.clone(), posts.len());
                to_queue.push(post.clone());
                posts.push(post);
            }
        }
    }

    sort_and_cap(&mut posts);
    outcome.stored = posts.len();
    let kept: HashSet<&str> = posts.iter().map(|p| p.activity_id.as_str()).collect();
    to_queue.retain(|p| kept.contains(p.activity_id.as_str()));
    ctx.store.save_document(keys::MY_POSTS, &posts).await;

    for post in &to_queue {
        ctx.queue_for_sync(keys::MY_POSTS, post).await;
    }

    if outcome.stale > 0 {
        if let Err(e) = ctx.outbound.reconcile_posts(keys::MY_POSTS, &fetched_ids).await {
            tracing::warn!(error = %e, "Post reconciliation failed");
        }
    }

    tracing::info!(
        inserted = outcome.inserted,
        updated = outcome.updated,
        stale = outcome.stale,
        stored = outcome.stored,
        "Captured posts"
    );
    Some(outcome)
}
