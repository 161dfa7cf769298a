//! The chainback factory
//!
//! Turns lookup requests into canonical cache hits or fresh instances.
//! The request is an explicit struct: a lookup names an id, constructor
//! data, or a parent to chain back through, never an ambiguous
//! positional shape.

use std::sync::Arc;

use tokio::sync::broadcast;

use cms_batch::Batcher;
use cms_gateway::{Authenticator, ClientConfig, Gateway, Transport};

use crate::cache::{CacheKey, IdentityCache};
use crate::error::{Error, Result};
use crate::events::ObjectEvent;
use crate::kind::{KindRegistry, ObjectId, ObjectKind};
use crate::object::ContentObject;
use crate::paths::JsonMap;

/// Instantiation batch size for plural lookups
const LOOKUP_BATCH: usize = 50;

/// How many lifecycle events may queue up per subscriber
const EVENT_CAPACITY: usize = 64;

/// What a lookup is allowed to name.
///
/// Exactly one of `id`, `data`, or `parent` drives the resolution
/// strategy (checked in that order); a request naming none of them is
/// rejected with [`Error::UnknownArgument`].
#[derive(Debug, Clone, Default)]
pub struct LookupRequest {
    pub kind: Option<ObjectKind>,
    pub channel: Option<u32>,
    pub id: Option<ObjectId>,
    pub data: Option<JsonMap>,
    pub parent: Option<Arc<ContentObject>>,
}

impl LookupRequest {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<ObjectId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Constructor data for an entity the caller already holds; the
    /// object starts out fetched.
    pub fn with_data(mut self, data: JsonMap) -> Self {
        self.data = Some(data);
        self
    }

    /// Chain back through `parent` to discover the id on first read.
    pub fn with_parent(mut self, parent: &Arc<ContentObject>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }
}

/// Shared innards of a client: gateway, identity cache, kind registry,
/// event channel. Objects hold a weak reference back here.
pub(crate) struct ClientCore {
    pub(crate) gateway: Gateway,
    pub(crate) cache: IdentityCache,
    pub(crate) kinds: KindRegistry,
    pub(crate) events: broadcast::Sender<ObjectEvent>,
    pub(crate) batcher: Batcher,
}

/// Front door of the data-access layer.
///
/// Cheap to clone; all clones share one identity cache and one session.
#[derive(Clone)]
pub struct ContentClient {
    core: Arc<ClientCore>,
}

impl ContentClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            core: Arc::new(ClientCore {
                gateway: Gateway::new(config, transport, authenticator),
                cache: IdentityCache::new(),
                kinds: KindRegistry::with_builtins(),
                events,
                batcher: Batcher::new(LOOKUP_BATCH).expect("nonzero batch size"),
            }),
        }
    }

    pub(crate) fn from_core(core: Arc<ClientCore>) -> Self {
        Self { core }
    }

    /// Resolve a lookup to the canonical instance for its identity.
    pub fn resolve(&self, request: LookupRequest) -> Result<Arc<ContentObject>> {
        let kind = request
            .kind
            .ok_or_else(|| Error::UnknownArgument("request names no kind".to_string()))?;
        let channel = request
            .channel
            .unwrap_or(self.core.gateway.config().default_channel);

        if let Some(id) = request.id {
            let key = CacheKey { kind, channel, id };
            if let Some(existing) = self.core.cache.lookup(&key) {
                return Ok(existing);
            }
            let object = ContentObject::create(
                kind,
                channel,
                Arc::downgrade(&self.core),
                Some(key.id),
                None,
            );
            if let Some(parent) = &request.parent {
                object.set_parent(parent);
            }
            return Ok(self.core.cache.register(object));
        }

        if let Some(data) = request.data {
            let id = data
                .get("id")
                .and_then(ObjectId::from_value)
                .ok_or_else(|| {
                    Error::InvalidData("constructor data carries no usable id".to_string())
                })?;
            let key = CacheKey { kind, channel, id };
            if let Some(existing) = self.core.cache.lookup(&key) {
                tracing::debug!(key = %key, "constructor data for cached identity, reusing instance");
                return Ok(existing);
            }
            let object = ContentObject::create(
                kind,
                channel,
                Arc::downgrade(&self.core),
                Some(key.id),
                Some(data),
            );
            return Ok(self.core.cache.register(object));
        }

        if let Some(parent) = request.parent {
            let object =
                ContentObject::create(kind, channel, Arc::downgrade(&self.core), None, None);
            object.set_parent(&parent);
            return Ok(object);
        }

        Err(Error::UnknownArgument(format!(
            "lookup for kind {kind} names neither id, data, nor parent"
        )))
    }

    /// Resolve many ids of one kind, instantiating in batches so large
    /// listings never monopolize the executor.
    pub async fn resolve_all(
        &self,
        kind: ObjectKind,
        ids: Vec<ObjectId>,
    ) -> Result<Vec<Arc<ContentObject>>> {
        let client = self.clone();
        let report = self
            .core
            .batcher
            .try_run(ids, |id| client.resolve(LookupRequest::new(kind).with_id(id)))
            .await?;
        Ok(report.results)
    }

    pub fn page(&self, id: impl Into<ObjectId>) -> Result<Arc<ContentObject>> {
        self.resolve(LookupRequest::new(ObjectKind::Page).with_id(id))
    }

    pub fn folder(&self, id: impl Into<ObjectId>) -> Result<Arc<ContentObject>> {
        self.resolve(LookupRequest::new(ObjectKind::Folder).with_id(id))
    }

    pub fn file(&self, id: impl Into<ObjectId>) -> Result<Arc<ContentObject>> {
        self.resolve(LookupRequest::new(ObjectKind::File).with_id(id))
    }

    pub fn node(&self, id: impl Into<ObjectId>) -> Result<Arc<ContentObject>> {
        self.resolve(LookupRequest::new(ObjectKind::Node).with_id(id))
    }

    pub fn template(&self, id: impl Into<ObjectId>) -> Result<Arc<ContentObject>> {
        self.resolve(LookupRequest::new(ObjectKind::Template).with_id(id))
    }

    pub async fn pages(&self, ids: Vec<ObjectId>) -> Result<Vec<Arc<ContentObject>>> {
        self.resolve_all(ObjectKind::Page, ids).await
    }

    /// Subscribe to lifecycle events (before-save, saved, deleted).
    pub fn subscribe(&self) -> broadcast::Receiver<ObjectEvent> {
        self.core.events.subscribe()
    }

    pub fn gateway(&self) -> &Gateway {
        &self.core.gateway
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.core.cache
    }

    pub fn kinds(&self) -> &KindRegistry {
        &self.core.kinds
    }

    /// Broadcast a lifecycle event. Concrete entity implementations
    /// (the page's fork/merge save) drive their own persistence flows
    /// and emit through here.
    pub fn emit(&self, event: ObjectEvent) {
        let _ = self.core.events.send(event);
    }
}
