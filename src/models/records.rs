//! Captured domain documents produced by the data processors.
//!
//! These documents are shared with other consumers (trend history, the
//! outbound sync bridge), so field names stay snake_case.

use serde::{Deserialize, Serialize};

/// Capture source tag stamped on every record written by background sync.
pub const CAPTURE_SOURCE: &str = "background_sync";

/// Creator analytics summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsRecord {
    pub impressions: Option<u64>,
    pub members_reached: Option<u64>,
    pub engagements: Option<u64>,
    pub profile_views: Option<u64>,
    pub search_appearances: Option<u64>,
    pub followers: Option<u64>,
    pub source: String,
    pub captured_at: i64,
}

/// The signed-in member's profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileRecord {
    pub profile_urn: Option<String>,
    pub public_identifier: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub profile_picture_url: Option<String>,
    pub followers_count: Option<u64>,
    pub connections_count: Option<u64>,
    pub source: String,
    pub captured_at: i64,
}

/// One slice of an audience demographic breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudienceSegment {
    pub category: Option<String>,
    pub label: String,
    pub percentage: f64,
}

/// Follower audience summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudienceRecord {
    pub total_followers: Option<u64>,
    pub new_followers: Option<u64>,
    pub follower_growth_percent: Option<f64>,
    pub demographics: Vec<AudienceSegment>,
    pub source: String,
    pub captured_at: i64,
}

/// A post authored by the member, keyed by its activity id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostRecord {
    pub activity_id: String,
    pub activity_urn: Option<String>,
    pub text: Option<String>,
    pub posted_at: Option<i64>,
    pub impressions: Option<u64>,
    pub reactions: Option<u64>,
    pub comments: Option<u64>,
    pub reposts: Option<u64>,
    pub source: String,
    pub captured_at: i64,
}

impl PostRecord {
    /// Whether any engagement metric differs from `other`.
    pub fn metrics_differ(&self, other: &PostRecord) -> bool {
        self.impressions != other.impressions
            || self.reactions != other.reactions
            || self.comments != other.comments
            || self.reposts != other.reposts
    }

    /// Merge a freshly captured copy of this post, preferring new non-null values.
    pub fn merge_from(&mut self, newer: PostRecord) {
        fn prefer<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        prefer(&mut self.activity_urn, newer.activity_urn);
        prefer(&mut self.text, newer.text);
        prefer(&mut self.posted_at, newer.posted_at);
        prefer(&mut self.impressions, newer.impressions);
        prefer(&mut self.reactions, newer.reactions);
        prefer(&mut self.comments, newer.comments);
        prefer(&mut self.reposts, newer.reposts);
        self.source = newer.source;
        self.captured_at = newer.captured_at;
    }
}

/// Identifiers needed by identifier-dependent endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileIdentifiers {
    pub profile_urn: Option<String>,
    pub public_identifier: Option<String>,
}

impl ProfileIdentifiers {
    pub fn from_profile(profile: &ProfileRecord) -> Self {
        Self {
            profile_urn: profile.profile_urn.as_deref().map(normalize_profile_urn),
            public_identifier: profile
                .public_identifier
                .clone()
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.profile_urn.is_none() && self.public_identifier.is_none()
    }
}

const PROFILE_URN_PREFIX: &str = "urn:li:fsd_profile:";
const LEGACY_URN_PREFIXES: [&str; 3] = [
    "urn:li:fs_miniProfile:",
    "urn:li:fs_profile:",
    "urn:li:member:",
];

/// Convert legacy member URN variants to the `fsd_profile` namespace.
///
/// The trailing segment is the member id in every variant.
pub fn normalize_profile_urn(urn: &str) -> String {
    if urn.starts_with(PROFILE_URN_PREFIX) {
        return urn.to_string();
    }
    if LEGACY_URN_PREFIXES.iter().any(|p| urn.starts_with(p)) {
        if let Some(id) = urn.rsplit(':').next().filter(|id| !id.is_empty()) {
            return format!("{}{}", PROFILE_URN_PREFIX, id);
        }
    }
    urn.to_string()
}
