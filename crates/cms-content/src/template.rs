//! The compact template notation
//!
//! Persisted page content refers to rendered blocks with `<node NAME>`
//! tokens instead of concrete markup. Encoding collapses rendered block
//! elements (relabeled with a reserved id prefix) back into tokens;
//! decoding replaces tokens with placeholder elements whose rendered
//! content is spliced in afterwards.

use std::sync::LazyLock;

use regex::Regex;

/// Reserved id prefix marking encoded block elements.
///
/// Only ever present in `encode`'s intermediate HTML; author-supplied
/// element ids never carry it.
pub const BLOCK_ID_PREFIX: &str = "cms-encoded--";

/// `<node NAME>` token; names match `[a-z0-9_-]+` case-insensitively.
static NODE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<node ([a-z0-9_-]+)>").expect("invalid node token regex"));

/// An encoded, emptied block element: `<tag id="PREFIXname" ...></tag>`.
/// The serializer writes `id` as the first attribute, which this pattern
/// relies on.
static ENCODED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"<([a-zA-Z][a-zA-Z0-9]*) id="{BLOCK_ID_PREFIX}((?i)[a-z0-9_-]+)"[^>]*>\s*</[a-zA-Z][a-zA-Z0-9]*>"#
    ))
    .expect("invalid encoded block regex")
});

/// One `<node …>` occurrence in a template string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeToken {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// Find all `<node …>` tokens in `text`, in order of appearance.
pub fn scan_nodes(text: &str) -> Vec<NodeToken> {
    NODE_TOKEN
        .captures_iter(text)
        .map(|caps| {
            let token = caps.get(0).expect("match group 0");
            NodeToken {
                name: caps[1].to_string(),
                start: token.start(),
                end: token.end(),
            }
        })
        .collect()
}

/// Replace every `<node …>` token using `placeholder`, which receives
/// the occurrence index and tag name and returns the replacement markup.
pub fn expand_nodes(text: &str, mut placeholder: impl FnMut(usize, &str) -> String) -> String {
    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;
    for (index, token) in scan_nodes(text).iter().enumerate() {
        result.push_str(&text[cursor..token.start]);
        result.push_str(&placeholder(index, &token.name));
        cursor = token.end;
    }
    result.push_str(&text[cursor..]);
    result
}

/// Collapse encoded block elements back into `<node name>` tokens.
pub fn collapse_encoded(html: &str) -> String {
    ENCODED_BLOCK.replace_all(html, "<node $2>").into_owned()
}
