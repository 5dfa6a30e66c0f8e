// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tolerant extraction from normalized API payloads.
//!
//! Response shapes vary by API version, so every field is read through an
//! ordered list of candidate dot paths and the first usable value wins.
//! Adding a new alias means adding a path, not a branch.

use serde_json::{Map, Value};

/// Keys that may carry an entity's type name.
const TYPE_KEYS: [&str; 3] = ["$type", "_type", "type"];

/// Follow a dot-separated path through nested objects.
///
/// Keys containing dots (e.g. `com.linkedin.common.VectorImage`) are
/// resolved by trying the longest matching key first.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    let obj = value.as_object()?;
    if let Some(v) = obj.get(path) {
        return Some(v);
    }

    let mut split = path.len();
    while let Some(idx) = path[..split].rfind('.') {
        let (head, rest) = (&path[..idx], &path[idx + 1..]);
        if let Some(child) = obj.get(head) {
            if let Some(found) = lookup(child, rest) {
                return Some(found);
            }
        }
        split = idx;
    }
    None
}

/// Coerce a JSON value to a finite number. Non-numeric strings are absent.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// First numeric value across the candidate paths.
pub fn first_number(value: &Value, paths: &[&str]) -> Option<f64> {
    paths
        .iter()
        .find_map(|p| lookup(value, p).and_then(as_number))
}

/// First non-negative count across the candidate paths.
pub fn first_count(value: &Value, paths: &[&str]) -> Option<u64> {
    paths.iter().find_map(|p| {
        lookup(value, p)
            .and_then(as_number)
            .filter(|f| *f >= 0.0)
            .map(|f| f.round() as u64)
    })
}

/// First non-empty string across the candidate paths.
pub fn first_string(value: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|p| {
        lookup(value, p)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Type name of a normalized entity, lowercased.
pub fn entity_type(entity: &Value) -> Option<String> {
    TYPE_KEYS
        .iter()
        .find_map(|k| entity.get(*k).and_then(Value::as_str))
        .map(str::to_ascii_lowercase)
}

/// The flat `included` list of a normalized response.
pub fn included(payload: &Value) -> &[Value] {
    payload
        .get("included")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// The `elements` list, at the top level or under `data`.
pub fn elements(payload: &Value) -> &[Value] {
    ["elements", "data.elements"]
        .iter()
        .find_map(|p| lookup(payload, p).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// First `included` entity whose type contains `marker`.
///
/// Markers are tried in order, so earlier markers take priority.
pub fn find_included<'a>(payload: &'a Value, markers: &[&str]) -> Option<&'a Value> {
    let entities = included(payload);
    markers.iter().find_map(|marker| {
        entities.iter().find(|e| {
            e.is_object()
                && entity_type(e).is_some_and(|t| t.contains(&marker.to_ascii_lowercase()))
        })
    })
}

/// Locate the entity a processor should read.
///
/// Order: a typed `included` entity, then the first object in `elements`,
/// then the payload itself.
pub fn locate_entity<'a>(payload: &'a Value, markers: &[&str]) -> &'a Value {
    if let Some(entity) = find_included(payload, markers) {
        return entity;
    }
    if let Some(first) = elements(payload).iter().find(|e| e.is_object()) {
        return first;
    }
    payload
}

/// The payload as an object, or `None` (with a log line) if it is not one.
pub fn require_object<'a>(payload: &'a Value, processor: &str) -> Option<&'a Map<String, Value>> {
    let obj = payload.as_object();
    if obj.is_none() {
        tracing::warn!(processor, "Payload is not an object, skipping");
    }
    obj
}

/// Keep a known non-zero value unless the new observation is non-zero.
pub fn merge_count(existing: Option<u64>, observed: Option<u64>) -> Option<u64> {
    match observed {
        Some(v) if v > 0 => Some(v),
        _ => existing.filter(|v| *v > 0).or(observed).or(existing),
    }
}
