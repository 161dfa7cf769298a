//! Canned payloads matching the REST backend's load-response shapes

use serde_json::{Value, json};

/// A page load payload with the fields the client reads most.
pub fn page_payload(id: u64, name: &str) -> Value {
    json!({
        "page": {
            "id": id,
            "name": name,
            "fileName": format!("{}.html", name.to_lowercase().replace(' ', "-")),
            "description": "",
            "folderId": 42,
            "templateId": 7,
            "priority": 1,
            "tags": {}
        }
    })
}

/// A folder load payload.
pub fn folder_payload(id: u64, name: &str) -> Value {
    json!({
        "folder": {
            "id": id,
            "name": name,
            "description": "",
            "publishDir": "/",
            "nodeId": 1
        }
    })
}

/// A tag entry as it appears under a page's `tags` map.
///
/// `parts` become the tag's declared properties; reconciliation only
/// writes part names that appear here.
pub fn tag_value(name: &str, construct: &str, parts: &[(&str, &str)]) -> Value {
    let properties: serde_json::Map<String, Value> = parts
        .iter()
        .map(|(part, value)| (part.to_string(), Value::String(value.to_string())))
        .collect();
    json!({
        "name": name,
        "construct": construct,
        "active": true,
        "properties": properties
    })
}
