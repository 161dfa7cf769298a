//! Content object resolution, caching, and shadow diffing
//!
//! The data-access core of the CMS editing client:
//!
//! - **Identity cache**: one live instance per `(kind, channel, id)`
//! - **Content object**: fetch-once semantics, parent-chain id
//!   resolution, shadow-diff property writes, and save/fold persistence
//! - **Chainback factory**: typed lookup requests resolved against the
//!   cache
//! - **Template notation**: the `<node name>` tokens persisted content
//!   uses to refer to rendered blocks
//!
//! # Architecture
//!
//! ```text
//!        ContentClient (factory)
//!          |          |
//!    IdentityCache  KindRegistry
//!          |
//!    ContentObject (data + shadow)
//!          |
//!       Gateway (cms-gateway)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cms_content::{ContentClient, LookupRequest, ObjectKind};
//!
//! let client = ContentClient::new(config, transport, authenticator);
//! let page = client.page(15)?;
//! page.read().await?;
//! page.set_prop("name", "Welcome".into())?;
//! page.save(Default::default()).await?;
//! ```

pub mod cache;
pub mod error;
pub mod events;
pub mod factory;
pub mod kind;
pub mod object;
pub mod paths;
pub mod template;

pub use cache::{CacheKey, IdentityCache};
pub use error::{Error, Result};
pub use events::ObjectEvent;
pub use factory::{ContentClient, LookupRequest};
pub use kind::{Constraint, KindRegistry, KindSpec, MAGIC_LINK_CONSTRUCT, ObjectId, ObjectKind};
pub use object::{ContentObject, SaveOptions};
pub use template::{BLOCK_ID_PREFIX, NodeToken};
