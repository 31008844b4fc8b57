// SPDX-License-Identifier: Apache-2.0

//! The fixed, idempotent transformation pipeline applied to every `meta.json` document.
//!
//! Each step is a pure function over a [`serde_json::Value`] so it can be unit-tested without
//! touching the filesystem; [`migrate`] runs all three in the documented order and reports
//! whether the document actually changed, so a second run is a guaranteed no-op.

use serde_json::{Map, Value};

/// The eight legacy top-level metric scalars folded into `footprint` by step 3, paired with the
/// footprint key each becomes. These predate the introduction of the `footprint` object, when
/// every summary statistic lived as its own top-level `<metric>_<stat>` field.
const DEPRECATED_FOOTPRINT_SCALARS: &[(&str, &str)] = &[
    ("flops_any_avg", "flops_any"),
    ("mem_bw_avg", "mem_bw"),
    ("mem_used_max", "mem_used"),
    ("net_bw_avg", "net_bw"),
    ("file_bw_avg", "file_bw"),
    ("cpu_load_avg", "cpu_load"),
    ("clock_avg", "clock"),
    ("cpu_user_avg", "cpu_user"),
];

/// Runs the full migration pipeline over `doc` in place, returning `true` if anything changed.
/// Idempotent: running it twice on the same document only changes it the first time.
#[must_use]
pub fn migrate(doc: &mut Value) -> bool {
    let Some(obj) = doc.as_object_mut() else { return false };
    let mut changed = false;
    changed |= exclusive_to_shared(obj);
    changed |= inject_missing_fields(obj);
    changed |= fold_deprecated_scalars_into_footprint(obj);
    changed
}

/// Step 1: replace the integer `exclusive` field (`0`, `1`, `2`) with the string `shared` field
/// (`"none"`, `"multi_user"`, `"single_user"`). Leaves `shared` alone if `exclusive` is absent or
/// already a string (a document already migrated).
fn exclusive_to_shared(obj: &mut Map<String, Value>) -> bool {
    let Some(Value::Number(n)) = obj.get("exclusive") else {
        return false;
    };
    let shared = match n.as_i64() {
        Some(0) => "none",
        Some(1) => "multi_user",
        Some(2) => "single_user",
        _ => {
            // Not one of the three known codes; leave untouched rather than guess.
            return false;
        }
    };
    let _ = obj.insert("shared".to_owned(), Value::String(shared.to_owned()));
    let _ = obj.remove("exclusive");
    true
}

/// Step 2: fills in fields that older documents never wrote, with their documented defaults.
fn inject_missing_fields(obj: &mut Map<String, Value>) -> bool {
    let mut changed = false;

    if !obj.contains_key("submitTime") {
        if let Some(start_time) = obj.get("startTime").cloned() {
            let _ = obj.insert("submitTime".to_owned(), start_time);
            changed = true;
        }
    }
    if !obj.contains_key("energy") {
        let _ = obj.insert("energy".to_owned(), Value::from(0.0));
        changed = true;
    }
    if !obj.contains_key("requestedMemory") {
        let _ = obj.insert("requestedMemory".to_owned(), Value::from(0));
        changed = true;
    }
    if !obj.contains_key("shared") {
        let _ = obj.insert("shared".to_owned(), Value::String("none".to_owned()));
        changed = true;
    }

    changed
}

/// Step 3: moves each deprecated top-level metric scalar into `footprint` (unless a value is
/// already there, which wins) and removes the top-level duplicate.
fn fold_deprecated_scalars_into_footprint(obj: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    let mut pending = Vec::new();

    for (legacy_key, footprint_key) in DEPRECATED_FOOTPRINT_SCALARS {
        if let Some(value) = obj.get(*legacy_key).cloned() {
            pending.push((*footprint_key, value));
        }
    }
    if pending.is_empty() {
        return false;
    }

    let footprint = obj
        .entry("footprint")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .expect("footprint is always written as an object");

    for (footprint_key, value) in pending {
        if !footprint.contains_key(footprint_key) {
            let _ = footprint.insert(footprint_key.to_owned(), value);
        }
    }
    for (legacy_key, _) in DEPRECATED_FOOTPRINT_SCALARS {
        if obj.remove(*legacy_key).is_some() {
            changed = true;
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn migrates_exclusive_two_to_single_user() {
        let mut doc = json!({
            "exclusive": 2,
            "flops_any_avg": 1.23,
            "startTime": 1_700_000_000,
        });
        assert!(migrate(&mut doc));
        assert_eq!(doc["shared"], json!("single_user"));
        assert!(doc.get("exclusive").is_none());
        assert_eq!(doc["footprint"]["flops_any"], json!(1.23));
        assert!(doc.get("flops_any_avg").is_none());
        assert_eq!(doc["submitTime"], json!(1_700_000_000));
        assert_eq!(doc["energy"], json!(0.0));
        assert_eq!(doc["requestedMemory"], json!(0));
    }

    #[test]
    fn exclusive_zero_and_one_map_to_none_and_multi_user() {
        let mut zero = json!({ "exclusive": 0 });
        let _ = migrate(&mut zero);
        assert_eq!(zero["shared"], json!("none"));

        let mut one = json!({ "exclusive": 1 });
        let _ = migrate(&mut one);
        assert_eq!(one["shared"], json!("multi_user"));
    }

    #[test]
    fn existing_footprint_value_wins_over_legacy_scalar() {
        let mut doc = json!({
            "flops_any_avg": 9.99,
            "footprint": { "flops_any": 1.0 },
        });
        let _ = migrate(&mut doc);
        assert_eq!(doc["footprint"]["flops_any"], json!(1.0));
        assert!(doc.get("flops_any_avg").is_none());
    }

    #[test]
    fn already_migrated_document_is_untouched() {
        let mut doc = json!({
            "shared": "single_user",
            "submitTime": 1,
            "startTime": 1,
            "energy": 12.0,
            "requestedMemory": 1024,
            "footprint": { "flops_any": 1.23 },
        });
        assert!(!migrate(&mut doc));
    }

    #[test]
    fn running_twice_is_idempotent() {
        let mut doc = json!({
            "exclusive": 1,
            "flops_any_avg": 1.23,
            "startTime": 5,
        });
        assert!(migrate(&mut doc));
        let first = doc.clone();
        assert!(!migrate(&mut doc));
        assert_eq!(doc, first);
    }

    #[test]
    fn missing_submit_time_falls_back_to_start_time_only_when_start_time_present() {
        let mut doc = json!({});
        let _ = migrate(&mut doc);
        assert!(doc.get("submitTime").is_none());
    }

    #[test]
    fn non_object_documents_are_left_alone() {
        let mut doc = json!([1, 2, 3]);
        assert!(!migrate(&mut doc));
    }

    #[test]
    fn unrecognised_exclusive_code_is_left_untouched_but_shared_still_gets_its_default() {
        let mut doc = json!({ "exclusive": 7 });
        let _ = migrate(&mut doc);
        assert_eq!(doc["exclusive"], json!(7));
        // `shared` was never set by the (declined) step 1, so step 2's default still applies.
        assert_eq!(doc["shared"], json!("none"));
    }
}
