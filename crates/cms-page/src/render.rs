//! Render response descriptors
//!
//! A page render reports which elements in the produced markup are
//! tracked blocks (non-editable tag placeholders) and which are
//! editable regions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A rendered, non-editable placeholder representing a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    /// DOM element id
    pub element: String,
    /// Name of the tag the block renders
    pub tagname: String,
    /// Construct id of the tag, when the backend reports it
    #[serde(default)]
    pub construct: Option<String>,
}

/// A rendered, user-editable region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableDescriptor {
    /// DOM element id
    pub element: String,
    /// Name of the tag the editable belongs to
    pub tagname: String,
    /// Part of the tag this editable writes
    pub partname: String,
}

/// The portion of a render response the page tracks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub blocks: Vec<BlockDescriptor>,
    #[serde(default)]
    pub editables: Vec<EditableDescriptor>,
}

impl RenderedPage {
    /// Parse a render payload.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        serde_json::from_value(payload.clone())
            .map_err(|error| Error::RenderPayload(error.to_string()))
    }
}
