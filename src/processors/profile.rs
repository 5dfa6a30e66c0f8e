// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile processor.
//!
//! Also handles the `/me` bootstrap response, which uses the same entity
//! shapes as the profile endpoint.

use super::extract::{
    first_count, first_string, locate_entity, lookup, merge_count, require_object,
};
use super::ProcessorContext;
use crate::db::keys;
use crate::models::records::normalize_profile_urn;
use crate::models::{ProfileRecord, CAPTURE_SOURCE};
use serde_json::Value;

const MARKERS: [&str; 5] = [
    "dash.identity.profile.profile",
    "identity.profile.profile",
    "topcardcore",
    "miniprofile",
    "profile",
];

const PROFILE_URN: [&str; 5] = [
    "entityUrn",
    "dashEntityUrn",
    "objectUrn",
    "miniProfile.entityUrn",
    "plainId",
];
const PUBLIC_IDENTIFIER: [&str; 3] = ["publicIdentifier", "vanityName", "miniProfile.publicIdentifier"];
const FIRST_NAME: [&str; 3] = ["firstName", "localizedFirstName", "miniProfile.firstName"];
const LAST_NAME: [&str; 3] = ["lastName", "localizedLastName", "miniProfile.lastName"];
const FULL_NAME: [&str; 3] = ["fullName", "name", "title.text"];
const HEADLINE: [&str; 4] = ["headline", "occupation", "localizedHeadline", "miniProfile.occupation"];
const LOCATION: [&str; 4] = [
    "locationName",
    "geoLocationName",
    "geoLocation.geo.defaultLocalizedName",
    "location.defaultLocalizedName",
];
const INDUSTRY: [&str; 3] = ["industryName", "industry.name", "industry"];
const FOLLOWERS: [&str; 3] = ["followersCount", "followerCount", "followingInfo.followerCount"];
const CONNECTIONS: [&str; 2] = ["connectionsCount", "connectionCount"];

/// Candidate locations of a vector image reference.
const IMAGE_PATHS: [&str; 5] = [
    "profilePicture.displayImageReference.vectorImage",
    "profilePicture.displayImageReferenceResolutionResult.vectorImage",
    "picture.com.linkedin.common.VectorImage",
    "miniProfile.picture.com.linkedin.common.VectorImage",
    "vectorImage",
];

/// Preferred avatar width in pixels.
const TARGET_IMAGE_WIDTH: i64 = 400;

/// Flatten a vector image (`rootUrl` + artifacts) into one URL.
///
/// Picks the artifact whose width is closest to the target, preferring the
/// larger artifact on ties.
pub fn picture_url(entity: &Value) -> Option<String> {
    IMAGE_PATHS.iter().find_map(|path| {
        let image = lookup(entity, path)?;
        let root = image.get("rootUrl").and_then(Value::as_str).unwrap_or("");
        let artifacts = image.get("artifacts")?.as_array()?;

        let best = artifacts
            .iter()
            .filter_map(|a| {
                let width = a.get("width").and_then(Value::as_i64)?;
                let segment = a
                    .get("fileIdentifyingUrlPathSegment")
                    .and_then(Value::as_str)?;
                Some((width, segment))
            })
            .min_by_key(|(width, _)| ((width - TARGET_IMAGE_WIDTH).abs(), -width))?;

        Some(format!("{}{}", root, best.1))
    })
}

/// Split "First Middle Last" into ("First", "Middle Last").
fn split_full_name(full: &str) -> (Option<String>, Option<String>) {
    let mut parts = full.trim().splitn(2, char::is_whitespace);
    let first = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
    let last = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    (first, last)
}

/// Extract a profile record from a payload.
pub fn extract(payload: &Value) -> ProfileRecord {
    let entity = locate_entity(payload, &MARKERS);

    let mut first_name = first_string(entity, &FIRST_NAME);
    let mut last_name = first_string(entity, &LAST_NAME);
    if first_name.is_none() && last_name.is_none() {
        if let Some(full) = first_string(entity, &FULL_NAME) {
            (first_name, last_name) = split_full_name(&full);
        }
    }

    ProfileRecord {
        profile_urn: first_string(entity, &PROFILE_URN)
            .filter(|u| u.starts_with("urn:"))
            .map(|u| normalize_profile_urn(&u)),
        public_identifier: first_string(entity, &PUBLIC_IDENTIFIER),
        first_name,
        last_name,
        headline: first_string(entity, &HEADLINE),
        location: first_string(entity, &LOCATION),
        industry: first_string(entity, &INDUSTRY),
        profile_picture_url: picture_url(entity),
        followers_count: first_count(entity, &FOLLOWERS),
        connections_count: first_count(entity, &CONNECTIONS),
        ..Default::default()
    }
}

/// Merge a fresh profile over the stored one.
///
/// Descriptive fields come from the new capture when present; counts keep
/// known non-zero values.
pub fn merge(existing: Option<ProfileRecord>, observed: ProfileRecord) -> ProfileRecord {
    let existing = existing.unwrap_or_default();
    ProfileRecord {
        profile_urn: observed.profile_urn.or(existing.profile_urn),
        public_identifier: observed.public_identifier.or(existing.public_identifier),
        first_name: observed.first_name.or(existing.first_name),
        last_name: observed.last_name.or(existing.last_name),
        headline: observed.headline.or(existing.headline),
        location: observed.location.or(existing.location),
        industry: observed.industry.or(existing.industry),
        profile_picture_url: observed.profile_picture_url.or(existing.profile_picture_url),
        followers_count: merge_count(existing.followers_count, observed.followers_count),
        connections_count: merge_count(existing.connections_count, observed.connections_count),
        source: observed.source,
        captured_at: observed.captured_at,
    }
}

pub async fn process(ctx: &ProcessorContext<'_>, payload: &Value) -> Option<ProfileRecord> {
    require_object(payload, "profile")?;

    let mut observed = extract(payload);
    observed.source = CAPTURE_SOURCE.to_string();
    observed.captured_at = ctx.now;

    let existing = ctx.store.get_document(keys::PROFILE).await;
    let record = merge(existing, observed);

    tracing::info!(
        has_urn = record.profile_urn.is_some(),
        has_public_id = record.public_identifier.is_some(),
        "Captured profile"
    );
    ctx.save_with_sync(keys::PROFILE, &record).await;
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::testing::Fixture;
    use serde_json::json;

    fn me_payload() -> Value {
        json!({
            "data": {"*miniProfile": "urn:li:fs_miniProfile:ACoAAA1"},
            "included": [{
                "$type": "com.linkedin.voyager.identity.shared.MiniProfile",
                "entityUrn": "urn:li:fs_miniProfile:ACoAAA1",
                "publicIdentifier": "ada-lovelace",
                "firstName": "Ada",
                "lastName": "Lovelace",
                "occupation": "Analyst",
                "picture": {
                    "com.linkedin.common.VectorImage": {
                        "rootUrl": "https://media.example/img/",
                        "artifacts": [
                            {"width": 100, "fileIdentifyingUrlPathSegment": "100.jpg"},
                            {"width": 400, "fileIdentifyingUrlPathSegment": "400.jpg"},
                            {"width": 800, "fileIdentifyingUrlPathSegment": "800.jpg"}
                        ]
                    }
                }
            }]
        })
    }

    #[test]
    fn test_extract_me_response() {
        let record = extract(&me_payload());

        assert_eq!(record.profile_urn.as_deref(), Some("urn:li:fsd_profile:ACoAAA1"));
        assert_eq!(record.public_identifier.as_deref(), Some("ada-lovelace"));
        assert_eq!(record.first_name.as_deref(), Some("Ada"));
        assert_eq!(record.headline.as_deref(), Some("Analyst"));
        assert_eq!(
            record.profile_picture_url.as_deref(),
            Some("https://media.example/img/400.jpg")
        );
    }

    #[test]
    fn test_picture_prefers_larger_on_tie() {
        let entity = json!({
            "vectorImage": {
                "rootUrl": "r/",
                "artifacts": [
                    {"width": 300, "fileIdentifyingUrlPathSegment": "300"},
                    {"width": 500, "fileIdentifyingUrlPathSegment": "500"}
                ]
            }
        });
        assert_eq!(picture_url(&entity).as_deref(), Some("r/500"));
    }

    #[test]
    fn test_full_name_split_only_without_explicit_names() {
        let payload = json!({"fullName": "Grace Brewster Hopper"});
        let record = extract(&payload);
        assert_eq!(record.first_name.as_deref(), Some("Grace"));
        assert_eq!(record.last_name.as_deref(), Some("Brewster Hopper"));

        let payload = json!({"fullName": "Grace Hopper", "firstName": "G."});
        let record = extract(&payload);
        assert_eq!(record.first_name.as_deref(), Some("G."));
        assert_eq!(record.last_name, None);
    }

    #[tokio::test]
    async fn test_process_keeps_network_counts() {
        let fx = Fixture::new();
        fx.store
            .save_document(
                keys::PROFILE,
                &ProfileRecord {
                    followers_count: Some(500),
                    connections_count: Some(300),
                    ..Default::default()
                },
            )
            .await;

        let record = process(&fx.ctx(), &me_payload()).await.unwrap();

        assert_eq!(record.followers_count, Some(500));
        assert_eq!(record.connections_count, Some(300));
        assert_eq!(record.first_name.as_deref(), Some("Ada"));

        let ids = fx.store.profile_identifiers().await;
        assert_eq!(ids.public_identifier.as_deref(), Some("ada-lovelace"));
    }
}
