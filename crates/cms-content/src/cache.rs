//! Identity cache
//!
//! Process-wide registry guaranteeing that at most one live
//! `ContentObject` exists per `(kind, channel, id)` key. Lookups never
//! overwrite: registering a key that is already present returns the
//! cached instance. No lock is held while caller code runs, so nested
//! resolution (a parent resolving a child resolving the same parent) is
//! safe.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::kind::{ObjectId, ObjectKind};
use crate::object::ContentObject;

/// Cache identity of one entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ObjectKind,
    pub channel: u32,
    pub id: ObjectId,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.channel, self.id)
    }
}

/// The identity map. Pure in-memory; no network access.
#[derive(Default)]
pub struct IdentityCache {
    entries: Mutex<HashMap<CacheKey, Arc<ContentObject>>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached instance for `key`, if any.
    pub fn lookup(&self, key: &CacheKey) -> Option<Arc<ContentObject>> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Register `object` under its key, returning the canonical instance.
    ///
    /// When the key is already occupied the cached instance is returned
    /// and `object` is discarded; overwriting never occurs. An object
    /// whose id is still unknown cannot be registered and is returned
    /// as-is.
    pub fn register(&self, object: Arc<ContentObject>) -> Arc<ContentObject> {
        let Some(key) = object.cache_key() else {
            return object;
        };
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.get(&key) {
            if !Arc::ptr_eq(existing, &object) {
                tracing::debug!(%key, "identity collision, keeping cached instance");
            }
            return Arc::clone(existing);
        }
        entries.insert(key, Arc::clone(&object));
        object
    }

    /// Remove the entry for `key` (the entity was deleted server-side).
    pub fn evict(&self, key: &CacheKey) -> Option<Arc<ContentObject>> {
        self.entries.lock().unwrap().remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}
