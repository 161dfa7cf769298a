//! Link/tag reconciliation
//!
//! Before a page persists, the anchors the user edited into its
//! editable regions are reconciled against the tags the server knows:
//! unmatched anchors get a fresh magic-link tag, matched anchors update
//! their tag's parts, and link tags whose anchor disappeared from the
//! document are queued for deletion. Obsolete detection runs strictly
//! after creation so fresh tags are never misclassified.

use std::collections::HashSet;

use serde_json::Value;

use cms_content::MAGIC_LINK_CONSTRUCT;
use cms_gateway::Request;

use crate::dom::{Dom, NodeId};
use crate::error::{Error, Result};
use crate::fork::TagStore;
use crate::page::{Block, Page, channelled};

/// Attribute marking the root of a nested rich-text editor; anchors
/// below it manage their own tags.
pub const NESTED_EDITOR_ATTR: &str = "data-rich-root";

/// Outcome of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Names of tags created for new anchors
    pub created: Vec<String>,
    /// Names of tags whose parts changed
    pub updated: Vec<String>,
    /// Names of tags queued for deletion
    pub deleted: Vec<String>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

pub(crate) async fn reconcile_links(
    page: &Page,
    dom: &mut Dom,
    store: &mut dyn TagStore,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    let anchors = collect_anchors(page, dom);
    dedupe_anchor_ids(dom, &anchors);

    for anchor in &anchors {
        let tracked = dom
            .element_id(*anchor)
            .and_then(|id| page.block(id));
        match tracked {
            Some(block) => {
                let declared = store.declared_parts(&block.tagname);
                let mut touched = false;
                for (part, value) in extract_parts(dom, *anchor) {
                    if !declared.contains(&part) {
                        continue;
                    }
                    if store.part_value(&block.tagname, &part).as_ref() == Some(&value) {
                        continue;
                    }
                    store.write_part(&block.tagname, &part, value, false)?;
                    touched = true;
                }
                if touched {
                    report.updated.push(block.tagname.clone());
                }
            }
            None => {
                let (name, tag) = create_link_tag(page).await?;
                let element = match dom.element_id(*anchor) {
                    Some(id) => id.to_string(),
                    None => {
                        let id = format!("link-{}", uuid::Uuid::new_v4().simple());
                        dom.set_element_id(*anchor, id.clone());
                        id
                    }
                };
                // the tag exists server-side regardless of how the save ends
                page.object().merge_data_entry("tags", &name, tag.clone())?;
                store.fold_created_tag(&name, tag);
                page.add_block(Block {
                    element,
                    tagname: name.clone(),
                    construct: Some(MAGIC_LINK_CONSTRUCT.to_string()),
                });
                for (part, value) in extract_parts(dom, *anchor) {
                    store.write_part(&name, &part, value, true)?;
                }
                report.created.push(name);
            }
        }
    }

    // Obsolete link tags: a tracked magic-link block whose element no
    // longer exists in the document.
    for block in page.blocks_snapshot() {
        if block.construct.as_deref() != Some(MAGIC_LINK_CONSTRUCT) {
            continue;
        }
        if dom.find_by_element_id(&block.element).is_some() {
            continue;
        }
        store.queue_delete(&block.tagname, &block.element);
        page.remove_block(&block.element);
        report.deleted.push(block.tagname.clone());
    }

    tracing::debug!(
        created = report.created.len(),
        updated = report.updated.len(),
        deleted = report.deleted.len(),
        "link reconciliation"
    );
    Ok(report)
}

/// Anchors inside tracked editables that are content-editable and not
/// owned by a nested editor.
fn collect_anchors(page: &Page, dom: &Dom) -> Vec<NodeId> {
    let mut anchors = Vec::new();
    for editable in page.editables_snapshot() {
        let Some(root) = dom.find_by_element_id(&editable.element) else {
            continue;
        };
        for node in dom.descendants(root) {
            if node == root || dom.tag(node) != Some("a") {
                continue;
            }
            let blocked = dom.path_between(root, node).iter().any(|between| {
                dom.attr(*between, NESTED_EDITOR_ATTR).is_some()
                    || dom.attr(*between, "contenteditable") == Some("false")
            });
            if !blocked {
                anchors.push(node);
            }
        }
    }
    anchors
}

/// Strip duplicated DOM ids (copy/paste artifacts) from all but the
/// first occurrence; stripped anchors are treated as new.
fn dedupe_anchor_ids(dom: &mut Dom, anchors: &[NodeId]) {
    let mut seen = HashSet::new();
    for anchor in anchors {
        if let Some(id) = dom.element_id(*anchor).map(str::to_string) {
            if !seen.insert(id) {
                tracing::debug!("duplicate anchor id, stripping");
                dom.strip_element_id(*anchor);
            }
        }
    }
}

/// Tag-part values carried by an anchor's attributes.
fn extract_parts(dom: &Dom, anchor: NodeId) -> Vec<(String, Value)> {
    let mut parts = Vec::new();

    if let Some(reference) = dom.attr(anchor, "data-cms-id") {
        parts.push(("ref".to_string(), Value::String(reference.to_string())));
    } else if let Some(href) = dom.attr(anchor, "href") {
        let (url, fragment) = match href.split_once('#') {
            Some((url, fragment)) => (url, Some(fragment)),
            None => (href, None),
        };
        parts.push(("url".to_string(), Value::String(url.to_string())));
        if let Some(fragment) = fragment {
            parts.push(("anchor".to_string(), Value::String(fragment.to_string())));
        }
    }

    for (attr, part) in [
        ("title", "title"),
        ("target", "target"),
        ("hreflang", "language"),
        ("class", "class"),
    ] {
        if let Some(value) = dom.attr(anchor, attr) {
            parts.push((part.to_string(), Value::String(value.to_string())));
        }
    }
    parts
}

/// Create a magic-link tag for one anchor (one call per anchor).
async fn create_link_tag(page: &Page) -> Result<(String, Value)> {
    let object = page.object();
    let client = object.client()?;
    let id = object.id().expect("page was read before reconciliation");
    let request = channelled(
        object,
        Request::post(
            format!("page/newtag/{id}"),
            serde_json::json!({ "construct": MAGIC_LINK_CONSTRUCT }),
        ),
    );
    let response = client.gateway().call(request).await?;
    let tag = response
        .payload
        .get("tag")
        .cloned()
        .ok_or_else(|| Error::TagPayload("create response carries no tag".to_string()))?;
    let name = tag
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::TagPayload("created tag has no name".to_string()))?
        .to_string();
    Ok((name, tag))
}
