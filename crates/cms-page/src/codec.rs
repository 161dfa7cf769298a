//! Encode/decode between rendered markup and template notation
//!
//! `encode` turns a rendered subtree into a storable template string:
//! every tracked block or editable inside it collapses to a compact
//! `<node tagname>` token. `decode` goes the other way, asking the
//! backend to render the referenced tags (a single batched call, no
//! matter how many tokens the template contains) and splicing the
//! fragments back in.

use serde_json::{Value, json};

use cms_content::template::{BLOCK_ID_PREFIX, collapse_encoded, expand_nodes, scan_nodes};
use cms_gateway::Request;

use crate::dom::{Dom, NodeId};
use crate::error::{Error, Result};
use crate::page::{Page, channelled};

impl Page {
    /// Serialize the subtree rooted at `node` into template notation.
    ///
    /// Tracked elements are emptied and relabeled with the reserved
    /// prefix before serialization; the placeholders then collapse to
    /// `<node tagname>` tokens. The document itself is left untouched.
    pub fn encode(&self, dom: &Dom, node: NodeId) -> Result<String> {
        let mut tracked: Vec<(String, String)> = self
            .blocks_snapshot()
            .into_iter()
            .map(|block| (block.element, block.tagname))
            .collect();
        tracked.extend(
            self.editables_snapshot()
                .into_iter()
                .map(|editable| (editable.element, editable.tagname)),
        );

        let mut working = dom.clone_subtree(node);
        for (element, tagname) in &tracked {
            if let Some(found) = working.find_by_element_id(element) {
                working.clear_children(found);
                working.set_element_id(found, format!("{BLOCK_ID_PREFIX}{tagname}"));
            }
        }
        let html = working.serialize(working.root());
        Ok(collapse_encoded(&html))
    }

    /// Expand template notation back into markup.
    ///
    /// Issues exactly one render call covering every `<node …>` token;
    /// a template without tokens never touches the network.
    pub async fn decode(&self, text: &str) -> Result<String> {
        let tokens = scan_nodes(text);
        if tokens.is_empty() {
            return Ok(text.to_string());
        }

        let mut placeholders: Vec<(String, String)> = Vec::new();
        let expanded = expand_nodes(text, |_, name| {
            let placeholder = format!("{BLOCK_ID_PREFIX}{}", uuid::Uuid::new_v4().simple());
            placeholders.push((placeholder.clone(), name.to_string()));
            format!("<div id=\"{placeholder}\"></div>")
        });

        let mut names: Vec<String> = Vec::new();
        for (_, name) in &placeholders {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }

        let object = self.object();
        object.read().await?;
        let client = object.client()?;
        let id = object.id().expect("read resolves the id");
        let request = channelled(
            object,
            Request::post(format!("page/render/{id}"), json!({ "tags": names })),
        );
        let response = client.gateway().call(request).await?;
        let rendered = response
            .payload
            .get("tags")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::RenderPayload("render response carries no tags".to_string()))?;

        let mut result = expanded;
        for (placeholder, name) in &placeholders {
            let fragment = rendered
                .get(name)
                .and_then(Value::as_str)
                .ok_or_else(|| Error::RenderPayload(format!("no rendering for tag {name:?}")))?;
            result = result.replace(&format!("<div id=\"{placeholder}\"></div>"), fragment);
        }
        Ok(result)
    }
}
