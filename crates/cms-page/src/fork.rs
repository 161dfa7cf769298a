//! Fork/merge isolation and the tag write target
//!
//! A save must not mutate the live, cached instance while its network
//! round-trip is pending, because the user keeps editing. The fork carries
//! private copies of `data`, `shadow`, and the delete accumulators;
//! reconciliation and persistence run against it. On success the fork's
//! state folds into the live instance; on failure it merges back
//! without discarding anything the user did in the meantime.

use serde_json::Value;

use cms_content::object::ContentObject;
use cms_content::paths::{self, JsonMap, escape_segment};

use crate::error::Result;
use crate::page::Page;

/// Where reconciliation writes tag parts: the live object (standalone
/// reconcile) or a fork (a pending save).
pub(crate) trait TagStore: Send {
    /// Part names the tag actually declares.
    fn declared_parts(&self, tag: &str) -> Vec<String>;
    /// Current value of a tag part, pending writes first.
    fn part_value(&self, tag: &str, part: &str) -> Option<Value>;
    fn write_part(&mut self, tag: &str, part: &str, value: Value, force: bool) -> Result<()>;
    fn queue_delete(&mut self, tag: &str, block_element: &str);
    /// Make a freshly created (server-confirmed) tag visible to
    /// declared-part lookups within this store.
    fn fold_created_tag(&mut self, name: &str, tag: Value);
}

pub(crate) fn part_path(tag: &str, part: &str) -> String {
    format!(
        "tags.{}.properties.{}",
        escape_segment(tag),
        escape_segment(part)
    )
}

fn declared_parts_of(data: &JsonMap, tag: &str) -> Vec<String> {
    let segments = [
        "tags".to_string(),
        tag.to_string(),
        "properties".to_string(),
    ];
    match paths::get_value(data, &segments) {
        Some(Value::Object(properties)) => properties.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

fn part_value_of(shadow: &JsonMap, data: &JsonMap, tag: &str, part: &str) -> Option<Value> {
    let segments = [
        "tags".to_string(),
        tag.to_string(),
        "properties".to_string(),
        part.to_string(),
    ];
    paths::get_value(shadow, &segments)
        .or_else(|| paths::get_value(data, &segments))
        .cloned()
}

/// Tag writes against the live, cached instance.
pub(crate) struct LiveStore<'a> {
    pub(crate) page: &'a Page,
}

impl TagStore for LiveStore<'_> {
    fn declared_parts(&self, tag: &str) -> Vec<String> {
        declared_parts_of(&self.page.object().data_snapshot(), tag)
    }

    fn part_value(&self, tag: &str, part: &str) -> Option<Value> {
        part_value_of(
            &self.page.object().shadow_snapshot(),
            &self.page.object().data_snapshot(),
            tag,
            part,
        )
    }

    fn write_part(&mut self, tag: &str, part: &str, value: Value, force: bool) -> Result<()> {
        let path = part_path(tag, part);
        if force {
            self.page.object().update_forced(&path, value)?;
        } else {
            self.page.object().update(&path, value)?;
        }
        Ok(())
    }

    fn queue_delete(&mut self, tag: &str, block_element: &str) {
        self.page.queue_delete(tag, block_element);
    }

    fn fold_created_tag(&mut self, _name: &str, _tag: Value) {
        // already folded into the live object's data by the engine
    }
}

/// Private working copy of a page's persistable state.
pub(crate) struct PageFork {
    pub(crate) data: JsonMap,
    pub(crate) shadow: JsonMap,
    pub(crate) deleted_tags: Vec<String>,
    pub(crate) deleted_blocks: Vec<String>,
}

impl PageFork {
    pub(crate) fn from_live(page: &Page) -> Self {
        let (deleted_tags, deleted_blocks) = page.deleted_snapshot();
        Self {
            data: page.object().data_snapshot(),
            shadow: page.object().shadow_snapshot(),
            deleted_tags,
            deleted_blocks,
        }
    }

    /// The save body: `{page: {…shadow, id}, unlock, delete}`.
    pub(crate) fn save_body(&self, object: &ContentObject, unlock: bool) -> Value {
        let mut entity = self.shadow.clone();
        if let Some(id) = object.id() {
            entity.insert("id".to_string(), Value::String(id.to_string()));
        }
        let mut body = JsonMap::new();
        body.insert("page".to_string(), Value::Object(entity));
        body.insert("unlock".to_string(), Value::Bool(unlock));
        body.insert(
            "delete".to_string(),
            Value::Array(
                self.deleted_tags
                    .iter()
                    .map(|tag| Value::String(tag.clone()))
                    .collect(),
            ),
        );
        Value::Object(body)
    }
}

impl TagStore for PageFork {
    fn declared_parts(&self, tag: &str) -> Vec<String> {
        declared_parts_of(&self.data, tag)
    }

    fn part_value(&self, tag: &str, part: &str) -> Option<Value> {
        part_value_of(&self.shadow, &self.data, tag, part)
    }

    fn write_part(&mut self, tag: &str, part: &str, value: Value, force: bool) -> Result<()> {
        let segments = cms_content::paths::parse_path(&part_path(tag, part));
        paths::write_shadow(&self.data, &mut self.shadow, &segments, value, force)
            .map_err(Into::into)
    }

    fn queue_delete(&mut self, tag: &str, block_element: &str) {
        self.deleted_tags.push(tag.to_string());
        self.deleted_blocks.push(block_element.to_string());
    }

    fn fold_created_tag(&mut self, name: &str, tag: Value) {
        let slot = self
            .data
            .entry("tags".to_string())
            .or_insert_with(|| Value::Object(JsonMap::new()));
        if let Value::Object(tags) = slot {
            tags.insert(name.to_string(), tag);
        }
    }
}
