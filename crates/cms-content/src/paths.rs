//! Path parsing and the mirrored data/shadow walk
//!
//! Property writes address nested fields with dot-delimited paths
//! (`object.part.text`); a backslash escapes a literal dot inside a
//! segment (`tags.link\.intro.name`). The shadow mirrors the structure
//! of `data`: a write must resolve through fields `data` actually has,
//! unless it is forced to introduce a brand-new substructure.
//!
//! # Example
//!
//! ```
//! use cms_content::paths::parse_path;
//!
//! assert_eq!(parse_path("tags.link1.name"), vec!["tags", "link1", "name"]);
//! assert_eq!(parse_path(r"tags.a\.b.name"), vec!["tags", "a.b", "name"]);
//! ```

use serde_json::Value;

use crate::error::{Error, Result};

/// The JSON object map used for `data` and `shadow` throughout the crate
pub type JsonMap = serde_json::Map<String, Value>;

/// Split a dot-delimited path into segments, honoring `\.` escapes.
pub fn parse_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    segments.push(current);
    segments
}

/// Escape a single segment for embedding in a dot-delimited path.
pub fn escape_segment(segment: &str) -> String {
    segment.replace('\\', r"\\").replace('.', r"\.")
}

/// Join segments back into a display path (for error reporting).
fn join_path(segments: &[String]) -> String {
    segments
        .iter()
        .map(|segment| escape_segment(segment))
        .collect::<Vec<_>>()
        .join(".")
}

/// Read the value at `segments`, if present.
pub fn get_value<'a>(map: &'a JsonMap, segments: &[String]) -> Option<&'a Value> {
    let (leaf, intermediate) = segments.split_last()?;
    let mut current = map;
    for segment in intermediate {
        current = current.get(segment.as_str())?.as_object()?;
    }
    current.get(leaf.as_str())
}

/// Record a write in `shadow`, validating the path against `data`.
///
/// `data` and `shadow` are walked in lock-step: every segment must
/// resolve through `data` (intermediate segments through objects). Once
/// the walk exceeds what `data` contains the write is rejected, unless
/// `force` is set; forcing is how brand-new substructures (a freshly
/// created tag's properties) come into existence. The write itself only
/// ever touches `shadow`; on rejection nothing is written at all.
pub fn write_shadow(
    data: &JsonMap,
    shadow: &mut JsonMap,
    segments: &[String],
    value: Value,
    force: bool,
) -> Result<()> {
    let Some((leaf, intermediate)) = segments.split_last() else {
        return Err(Error::PathDiverged {
            path: String::new(),
            segment: String::new(),
        });
    };

    // Validate against data before touching the shadow.
    let mut current = data;
    for (index, segment) in segments.iter().enumerate() {
        let is_leaf = index + 1 == segments.len();
        match current.get(segment.as_str()) {
            Some(Value::Object(next)) if !is_leaf => current = next,
            Some(_) if is_leaf => {}
            Some(_) => {
                if force {
                    break;
                }
                return Err(Error::PathNotObject {
                    path: join_path(segments),
                    segment: segment.clone(),
                });
            }
            None => {
                if force {
                    break;
                }
                return Err(Error::PathDiverged {
                    path: join_path(segments),
                    segment: segment.clone(),
                });
            }
        }
    }

    // Materialize the shadow path and set the leaf.
    let mut current = shadow;
    for segment in intermediate {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(JsonMap::new()));
        let Value::Object(next) = entry else {
            return Err(Error::PathNotObject {
                path: join_path(segments),
                segment: segment.clone(),
            });
        };
        current = next;
    }
    current.insert(leaf.clone(), value);
    Ok(())
}

/// Merge a fetched or saved entity into `data`.
///
/// Top-level keys are added or replaced; keys the incoming entity does
/// not mention are never truncated.
pub fn merge_entity(data: &mut JsonMap, incoming: &JsonMap) {
    for (key, value) in incoming {
        data.insert(key.clone(), value.clone());
    }
}

/// Fold a saved shadow snapshot into `data`, skipping the listed
/// top-level keys (the `tags` subtree is never blindly overwritten).
pub fn fold_shadow(data: &mut JsonMap, saved: &JsonMap, skip_top: &[&str]) {
    for (key, value) in saved {
        if skip_top.contains(&key.as_str()) {
            continue;
        }
        fold_value(data, key, value);
    }
}

fn fold_value(data: &mut JsonMap, key: &str, value: &Value) {
    match (data.get_mut(key), value) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (nested_key, nested_value) in incoming {
                fold_value(existing, nested_key, nested_value);
            }
        }
        _ => {
            data.insert(key.to_string(), value.clone());
        }
    }
}

/// Remove entries from `shadow` that the save confirmed, leaving leaves
/// whose value changed after the save was dispatched untouched.
pub fn clear_saved(shadow: &mut JsonMap, saved: &JsonMap) {
    for (key, saved_value) in saved {
        match (shadow.get_mut(key), saved_value) {
            (Some(Value::Object(nested)), Value::Object(saved_nested)) => {
                clear_saved(nested, saved_nested);
                if nested.is_empty() {
                    shadow.remove(key);
                }
            }
            (Some(current), _) if current == saved_value => {
                shadow.remove(key);
            }
            _ => {}
        }
    }
}

/// Copy entries of `src` into `dest` where `dest` has no value yet.
///
/// Used by the failure-merge after an unsuccessful save: the live
/// shadow's entries (edits made while the save was in flight) always
/// win over the fork's.
pub fn merge_missing(dest: &mut JsonMap, src: &JsonMap) {
    for (key, value) in src {
        match (dest.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_missing(existing, incoming);
            }
            (Some(_), _) => {}
            (None, _) => {
                dest.insert(key.clone(), value.clone());
            }
        }
    }
}
