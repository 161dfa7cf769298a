//! Lifecycle notifications emitted by the client

use crate::cache::CacheKey;

/// Events broadcast around persistence operations.
///
/// `BeforeSave` fires after an object was fully read and before its diff
/// is serialized; `Saved` after the response was folded back; `Deleted`
/// after the cache entry was evicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectEvent {
    BeforeSave(CacheKey),
    Saved(CacheKey),
    Deleted(CacheKey),
}
