//! Page synchronization for the CMS client
//!
//! Builds on `cms-content`'s object layer with everything a rendered,
//! editable page needs:
//!
//! - **View tracking**: blocks and editable regions reported by renders
//! - **Link/tag reconciliation**: anchors in editable content kept in
//!   sync with magic-link tags (create, update, delete)
//! - **Fork/merge saves**: a save works on a private copy so concurrent
//!   edits are never lost to an in-flight round-trip
//! - **encode/decode**: the bidirectional transform between rendered
//!   markup and the persisted `<node name>` template notation
//!
//! The [`dom`] module provides the arena-indexed document model these
//! operations run against; it stands in for the browser document.

mod codec;
pub mod dom;
pub mod error;
mod fork;
pub mod page;
pub mod reconcile;
pub mod render;

pub use dom::{Dom, NodeId};
pub use error::{Error, Result};
pub use page::{Block, Editable, Page, PageStore};
pub use reconcile::{NESTED_EDITOR_ATTR, ReconcileReport};
pub use render::{BlockDescriptor, EditableDescriptor, RenderedPage};
