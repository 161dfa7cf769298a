//! The content object
//!
//! A `ContentObject` is the client-side proxy for one server-held
//! entity. Its authoritative state (`data`) holds what the server last
//! confirmed; local edits accumulate in a sparse overlay (`shadow`)
//! until a save folds them back. Identity is owned by the
//! [`IdentityCache`](crate::cache::IdentityCache); objects whose id is
//! still unknown resolve it through their parent chain before fetching.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;

use cms_gateway::Request;

use crate::cache::CacheKey;
use crate::error::{Error, Result};
use crate::events::ObjectEvent;
use crate::factory::{ClientCore, ContentClient};
use crate::kind::{ObjectId, ObjectKind};
use crate::paths::{self, JsonMap};

#[derive(Debug, Default)]
struct ObjectState {
    id: Option<ObjectId>,
    data: JsonMap,
    shadow: JsonMap,
    fetched: bool,
}

/// Options for [`ContentObject::save`]
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Release the server-side edit lock after saving
    pub unlock: bool,
}

/// Client-side proxy for one server-held entity
#[derive(Debug)]
pub struct ContentObject {
    kind: ObjectKind,
    channel: u32,
    core: Weak<ClientCore>,
    state: Mutex<ObjectState>,
    parent: Mutex<Option<Weak<ContentObject>>>,
    // Single-flight guard: a second fetch while one is pending parks
    // here and then observes `fetched` instead of re-issuing the call.
    fetch_flight: tokio::sync::Mutex<()>,
}

impl ContentObject {
    pub(crate) fn create(
        kind: ObjectKind,
        channel: u32,
        core: Weak<ClientCore>,
        id: Option<ObjectId>,
        data: Option<JsonMap>,
    ) -> Arc<Self> {
        let fetched = data.is_some();
        Arc::new(Self {
            kind,
            channel,
            core,
            state: Mutex::new(ObjectState {
                id,
                data: data.unwrap_or_default(),
                shadow: JsonMap::new(),
                fetched,
            }),
            parent: Mutex::new(None),
            fetch_flight: tokio::sync::Mutex::new(()),
        })
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.state.lock().unwrap().id.clone()
    }

    pub fn is_fetched(&self) -> bool {
        self.state.lock().unwrap().fetched
    }

    /// The identity key, once the id is known.
    pub fn cache_key(&self) -> Option<CacheKey> {
        self.id().map(|id| CacheKey {
            kind: self.kind,
            channel: self.channel,
            id,
        })
    }

    /// The client this object belongs to.
    pub fn client(&self) -> Result<ContentClient> {
        Ok(ContentClient::from_core(self.core()?))
    }

    /// Attach the object whose data can yield this object's id.
    pub fn set_parent(&self, parent: &Arc<ContentObject>) {
        *self.parent.lock().unwrap() = Some(Arc::downgrade(parent));
    }

    pub fn parent(&self) -> Option<Arc<ContentObject>> {
        self.parent.lock().unwrap().as_ref().and_then(Weak::upgrade)
    }

    fn core(&self) -> Result<Arc<ClientCore>> {
        self.core.upgrade().ok_or(Error::ClientReleased)
    }

    fn describe(&self) -> String {
        self.describe_id(self.id().as_ref())
    }

    // usable while the state lock is held
    fn describe_id(&self, id: Option<&ObjectId>) -> String {
        match id {
            Some(id) => format!("{}:{}:{}", self.kind, self.channel, id),
            None => format!("{}:{}:<unresolved>", self.kind, self.channel),
        }
    }

    // ---- fetch / read ---------------------------------------------------

    /// Fetch the object's data once. Idempotent after success; while a
    /// fetch is in flight, concurrent callers park and share its result
    /// instead of issuing a second request.
    pub async fn fetch(self: &Arc<Self>) -> Result<()> {
        if self.is_fetched() {
            return Ok(());
        }
        let _flight = self.fetch_flight.lock().await;
        if self.is_fetched() {
            return Ok(());
        }
        let key = self.cache_key().ok_or_else(|| Error::CannotGetObjectId {
            kind: self.kind.to_string(),
            detail: "fetch requires a resolved id".to_string(),
        })?;
        let core = self.core()?;
        let request = self.channelled(Request::get(format!(
            "{}/load/{}",
            self.kind.rest_segment(),
            key.id
        )));
        tracing::debug!(key = %key, "fetching object");
        let response = core.gateway.call(request).await?;
        let entity = extract_entity(self.kind, &response.payload)?;
        let mut state = self.state.lock().unwrap();
        paths::merge_entity(&mut state.data, &entity);
        state.fetched = true;
        Ok(())
    }

    /// Ensure the object's data is present, resolving the id through the
    /// parent chain first when necessary.
    pub async fn read(self: &Arc<Self>) -> Result<()> {
        self.read_with(Vec::new()).await
    }

    /// The visited stack breaks cycles between mutually dependent
    /// objects: a parent already on the stack is not re-entered, and
    /// resolution proceeds with whatever data it has so far.
    pub(crate) fn read_with(
        self: &Arc<Self>,
        mut visited: Vec<Arc<ContentObject>>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        let this = Arc::clone(self);
        Box::pin(async move {
            if this.is_fetched() {
                return Ok(());
            }
            if this.id().is_none() {
                let parent = this.parent().ok_or_else(|| Error::CannotGetObjectId {
                    kind: this.kind.to_string(),
                    detail: "id unknown and no parent to resolve it from".to_string(),
                })?;
                let cyclic = visited.iter().any(|seen| Arc::ptr_eq(seen, &parent));
                if cyclic {
                    tracing::debug!(
                        kind = %this.kind,
                        "parent already on the resolution stack, breaking cycle"
                    );
                } else {
                    visited.push(Arc::clone(&this));
                    parent.read_with(visited).await?;
                }
                let id = this.id_from_parent(&parent)?;
                this.adopt_id(id);
            }
            this.fetch().await
        })
    }

    /// Derive this object's id from the parent's properties, trying the
    /// kind's candidate names in order; the first value present wins.
    fn id_from_parent(&self, parent: &Arc<ContentObject>) -> Result<ObjectId> {
        let core = self.core()?;
        let candidates = core.kinds.spec(self.kind).parent_id_candidates;
        {
            let state = parent.state.lock().unwrap();
            for candidate in candidates {
                let value = state
                    .shadow
                    .get(*candidate)
                    .or_else(|| state.data.get(*candidate));
                if let Some(id) = value.and_then(ObjectId::from_value) {
                    return Ok(id);
                }
            }
        }
        Err(Error::CannotGetObjectId {
            kind: self.kind.to_string(),
            detail: format!(
                "parent {} has none of {:?}",
                parent.describe(),
                candidates
            ),
        })
    }

    /// Record a newly discovered id and eagerly register in the cache;
    /// the cache key was incomplete until now.
    fn adopt_id(self: &Arc<Self>, id: ObjectId) {
        self.state.lock().unwrap().id = Some(id);
        if let Ok(core) = self.core() {
            core.cache.register(Arc::clone(self));
        }
    }

    // ---- property access ------------------------------------------------

    /// Read a top-level property: the shadow value when a pending edit
    /// exists, the authoritative value otherwise, `Null` when absent.
    pub fn prop(&self, name: &str) -> Result<Value> {
        let state = self.state.lock().unwrap();
        if !state.fetched {
            return Err(Error::UnfetchedAccess {
                key: self.describe_id(state.id.as_ref()),
            });
        }
        Ok(state
            .shadow
            .get(name)
            .or_else(|| state.data.get(name))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Write a top-level property, subject to the kind's writable
    /// whitelist and constraints.
    pub fn set_prop(&self, name: &str, value: Value) -> Result<()> {
        if !self.is_fetched() {
            return Err(Error::UnfetchedAccess {
                key: self.describe(),
            });
        }
        let core = self.core()?;
        let spec = core.kinds.spec(self.kind);
        if !spec.is_writable(name) {
            return Err(Error::ReadOnlyAttribute {
                kind: self.kind.to_string(),
                name: name.to_string(),
            });
        }
        spec.check_constraints(name, &value)?;
        self.update(name, value)
    }

    /// Record a write at a dot-delimited path.
    pub fn update(&self, path: &str, value: Value) -> Result<()> {
        self.apply_update(path, value, false)
    }

    /// Record a write that may introduce fields `data` does not have yet.
    pub fn update_forced(&self, path: &str, value: Value) -> Result<()> {
        self.apply_update(path, value, true)
    }

    fn apply_update(&self, path: &str, value: Value, force: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.fetched {
            return Err(Error::UnfetchedAccess {
                key: self.describe_id(state.id.as_ref()),
            });
        }
        let segments = paths::parse_path(path);
        let ObjectState { data, shadow, .. } = &mut *state;
        paths::write_shadow(data, shadow, &segments, value, force)
    }

    /// Fold a server-confirmed entry into a top-level object-valued
    /// field of `data` (a freshly created tag into `tags`). Bypasses the
    /// shadow: the value is already authoritative.
    pub fn merge_data_entry(&self, field: &str, key: &str, value: Value) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .data
            .entry(field.to_string())
            .or_insert_with(|| Value::Object(JsonMap::new()));
        let Value::Object(map) = slot else {
            return Err(Error::PathNotObject {
                path: field.to_string(),
                segment: field.to_string(),
            });
        };
        map.insert(key.to_string(), value);
        Ok(())
    }

    // ---- persistence ----------------------------------------------------

    /// Persist pending edits.
    ///
    /// The shadow is snapshotted at dispatch time; edits recorded while
    /// the request is in flight stay pending. On success the response is
    /// folded into `data` (left-biased — fields the response omits are
    /// kept) and the saved snapshot is cleared from the shadow; on
    /// failure the shadow is left untouched so a retry resends the same
    /// diff.
    pub async fn save(self: &Arc<Self>, options: SaveOptions) -> Result<()> {
        self.read().await?;
        let core = self.core()?;
        let key = self.cache_key().expect("read resolves the id");
        let _ = core.events.send(ObjectEvent::BeforeSave(key.clone()));

        let saved = self.shadow_snapshot();
        let mut body = JsonMap::new();
        body.insert(self.kind.as_str().to_string(), self.persisted_json(&saved));
        body.insert("unlock".to_string(), Value::Bool(options.unlock));
        let body = Value::Object(body);
        let request = self.channelled(Request::post(
            format!("{}/save/{}", self.kind.rest_segment(), key.id),
            body,
        ));
        tracing::debug!(key = %key, fields = saved.len(), "saving object");
        let response = core.gateway.call(request).await?;
        self.absorb_save_success(&saved, response.payload.get(self.kind.as_str()));
        let _ = core.events.send(ObjectEvent::Saved(key));
        Ok(())
    }

    /// The persisted form of a shadow snapshot: `{…shadow, id}`.
    pub fn persisted_json(&self, shadow: &JsonMap) -> Value {
        let mut object = shadow.clone();
        if let Some(id) = self.id() {
            object.insert("id".to_string(), Value::String(id.to_string()));
        }
        Value::Object(object)
    }

    /// Fold a successful save back into the live instance.
    pub fn absorb_save_success(&self, saved: &JsonMap, returned: Option<&Value>) {
        let mut state = self.state.lock().unwrap();
        if let Some(Value::Object(entity)) = returned {
            paths::merge_entity(&mut state.data, entity);
        }
        let ObjectState { data, shadow, .. } = &mut *state;
        paths::fold_shadow(data, saved, &["tags"]);
        paths::clear_saved(shadow, saved);
    }

    /// Fold a failed fork's shadow back without discarding live edits.
    pub fn absorb_save_failure(&self, fork_shadow: &JsonMap) {
        let mut state = self.state.lock().unwrap();
        paths::merge_missing(&mut state.shadow, fork_shadow);
    }

    /// Delete the entity server-side and drop it from the cache.
    pub async fn delete(self: &Arc<Self>) -> Result<()> {
        self.read().await?;
        let core = self.core()?;
        let key = self.cache_key().expect("read resolves the id");
        let request = self.channelled(Request::post(
            format!("{}/delete/{}", self.kind.rest_segment(), key.id),
            Value::Null,
        ));
        core.gateway.call(request).await?;
        core.cache.evict(&key);
        let _ = core.events.send(ObjectEvent::Deleted(key));
        Ok(())
    }

    // ---- snapshots / lifecycle ------------------------------------------

    pub fn data_snapshot(&self) -> JsonMap {
        self.state.lock().unwrap().data.clone()
    }

    pub fn shadow_snapshot(&self) -> JsonMap {
        self.state.lock().unwrap().shadow.clone()
    }

    /// Wipe payloads while preserving identity; the next `read` fetches
    /// fresh data.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.data.clear();
        state.shadow.clear();
        state.fetched = false;
    }

    fn channelled(&self, request: Request) -> Request {
        if self.channel == 0 {
            request
        } else {
            request.with_query("channel", self.channel.to_string())
        }
    }
}

fn extract_entity(kind: ObjectKind, payload: &Value) -> Result<JsonMap> {
    payload
        .get(kind.as_str())
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| {
            Error::MalformedPayload(format!("response carries no {:?} entity", kind.as_str()))
        })
}
