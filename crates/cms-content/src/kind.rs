//! Entity kinds and their editing rules
//!
//! The registry knows, per kind: which properties editors may write,
//! which constraints apply, which parent properties can yield this
//! kind's id during chainback resolution, and the REST path segment.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Construct id reserved for tags representing inline anchors
pub const MAGIC_LINK_CONSTRUCT: &str = "magiclink";

/// Entity type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Page,
    Folder,
    File,
    Image,
    Node,
    Template,
    Tag,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Folder => "folder",
            Self::File => "file",
            Self::Image => "image",
            Self::Node => "node",
            Self::Template => "template",
            Self::Tag => "tag",
        }
    }

    /// REST path segment for this kind (`page/load/7`, `folder/save/3`).
    pub fn rest_segment(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable entity identifier; servers hand these out as numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract an id from a JSON value (string or integer).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ObjectId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A validation rule attached to a writable property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    MaxLength(usize),
}

impl Constraint {
    pub fn check(&self, name: &str, value: &Value) -> Result<()> {
        match self {
            Self::MaxLength(max) => {
                if let Some(text) = value.as_str() {
                    if text.chars().count() > *max {
                        return Err(Error::ConstraintViolation {
                            name: name.to_string(),
                            reason: format!("length exceeds {max}"),
                        });
                    }
                }
                Ok(())
            }
        }
    }
}

/// Editing rules for one entity kind
#[derive(Debug, Clone)]
pub struct KindSpec {
    pub kind: ObjectKind,
    /// Whitelist of properties editors may write
    pub writable: &'static [&'static str],
    pub constraints: &'static [(&'static str, Constraint)],
    /// Parent properties that can yield this kind's id, tried in order
    pub parent_id_candidates: &'static [&'static str],
}

impl KindSpec {
    pub fn is_writable(&self, name: &str) -> bool {
        self.writable.contains(&name)
    }

    pub fn check_constraints(&self, name: &str, value: &Value) -> Result<()> {
        for (prop, constraint) in self.constraints {
            if *prop == name {
                constraint.check(name, value)?;
            }
        }
        Ok(())
    }
}

/// Registry of kind specs.
///
/// # Example
///
/// ```
/// use cms_content::kind::{KindRegistry, ObjectKind};
///
/// let kinds = KindRegistry::with_builtins();
/// assert!(kinds.spec(ObjectKind::Page).is_writable("name"));
/// assert!(!kinds.spec(ObjectKind::Page).is_writable("id"));
/// ```
#[derive(Debug, Clone)]
pub struct KindRegistry {
    specs: HashMap<ObjectKind, KindSpec>,
}

impl KindRegistry {
    pub fn with_builtins() -> Self {
        let specs = [
            KindSpec {
                kind: ObjectKind::Page,
                writable: &[
                    "name",
                    "fileName",
                    "description",
                    "templateId",
                    "folderId",
                    "priority",
                    "language",
                ],
                constraints: &[
                    ("name", Constraint::MaxLength(255)),
                    ("fileName", Constraint::MaxLength(64)),
                ],
                parent_id_candidates: &["pageId", "contentId"],
            },
            KindSpec {
                kind: ObjectKind::Folder,
                writable: &["name", "description", "publishDir"],
                constraints: &[("name", Constraint::MaxLength(255))],
                parent_id_candidates: &["folderId", "motherId"],
            },
            KindSpec {
                kind: ObjectKind::File,
                writable: &["name", "description"],
                constraints: &[("name", Constraint::MaxLength(64))],
                parent_id_candidates: &["fileId"],
            },
            KindSpec {
                kind: ObjectKind::Image,
                writable: &["name", "description"],
                constraints: &[("name", Constraint::MaxLength(64))],
                parent_id_candidates: &["imageId", "fileId"],
            },
            KindSpec {
                kind: ObjectKind::Node,
                writable: &[],
                constraints: &[],
                parent_id_candidates: &["nodeId"],
            },
            KindSpec {
                kind: ObjectKind::Template,
                writable: &["name"],
                constraints: &[("name", Constraint::MaxLength(255))],
                parent_id_candidates: &["templateId"],
            },
            KindSpec {
                kind: ObjectKind::Tag,
                writable: &["active"],
                constraints: &[],
                parent_id_candidates: &["tagId"],
            },
        ]
        .into_iter()
        .map(|spec| (spec.kind, spec))
        .collect();
        Self { specs }
    }

    pub fn spec(&self, kind: ObjectKind) -> &KindSpec {
        self.specs
            .get(&kind)
            .expect("registry is seeded with every kind")
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
