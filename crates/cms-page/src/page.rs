//! The page entity and its store
//!
//! A [`Page`] pairs the canonical [`ContentObject`] with render-derived
//! view state: which elements are tracked blocks, which are editable
//! regions, and which tags are slated for deletion. The [`PageStore`]
//! guarantees one `Page` per identity, mirroring the identity cache one
//! level up.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use cms_content::object::ContentObject;
use cms_content::{CacheKey, ContentClient, Error as ContentError, LookupRequest, ObjectEvent, ObjectId, ObjectKind, SaveOptions};
use cms_content::paths::JsonMap;
use cms_gateway::Request;

use crate::dom::Dom;
use crate::error::Result;
use crate::fork::{LiveStore, PageFork};
use crate::reconcile::{ReconcileReport, reconcile_links};
use crate::render::RenderedPage;

/// A tracked, non-editable placeholder element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// DOM element id
    pub element: String,
    pub tagname: String,
    pub construct: Option<String>,
}

/// A tracked editable region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editable {
    /// DOM element id
    pub element: String,
    pub tagname: String,
    pub partname: String,
}

#[derive(Debug, Default)]
struct PageView {
    blocks: BTreeMap<String, Block>,
    editables: BTreeMap<String, Editable>,
    deleted_tags: Vec<String>,
    deleted_blocks: Vec<String>,
    // memoized editable element id -> nested block element ids
    nested: Option<BTreeMap<String, Vec<String>>>,
}

struct PageInner {
    object: Arc<ContentObject>,
    view: Mutex<PageView>,
}

/// The richest concrete entity type: a page with rendered content.
///
/// Cheap to clone; clones share the same object and view state.
#[derive(Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

impl Page {
    fn from_object(object: Arc<ContentObject>) -> Self {
        Self {
            inner: Arc::new(PageInner {
                object,
                view: Mutex::new(PageView::default()),
            }),
        }
    }

    pub fn object(&self) -> &Arc<ContentObject> {
        &self.inner.object
    }

    pub async fn read(&self) -> Result<()> {
        self.inner.object.read().await.map_err(Into::into)
    }

    pub fn prop(&self, name: &str) -> Result<Value> {
        self.inner.object.prop(name).map_err(Into::into)
    }

    pub fn set_prop(&self, name: &str, value: Value) -> Result<()> {
        self.inner.object.set_prop(name, value).map_err(Into::into)
    }

    /// The tag entry with the given name, `Null` when absent.
    pub fn tag(&self, name: &str) -> Result<Value> {
        let tags = self.inner.object.prop("tags")?;
        Ok(tags.get(name).cloned().unwrap_or(Value::Null))
    }

    // ---- view tracking --------------------------------------------------

    /// Merge a render response into the tracked view state.
    ///
    /// Element ids must be unique across blocks and editables; later
    /// duplicates are stripped here, before any reconciliation sees
    /// them.
    pub fn track_render(&self, rendered: &RenderedPage) {
        let mut view = self.inner.view.lock().unwrap();
        for block in &rendered.blocks {
            if view.editables.contains_key(&block.element) {
                tracing::warn!(element = %block.element, "duplicate element id across block and editable, stripping block");
                continue;
            }
            view.blocks
                .entry(block.element.clone())
                .or_insert_with(|| Block {
                    element: block.element.clone(),
                    tagname: block.tagname.clone(),
                    construct: block.construct.clone(),
                });
        }
        for editable in &rendered.editables {
            if view.blocks.contains_key(&editable.element) {
                tracing::warn!(element = %editable.element, "duplicate element id across editable and block, stripping editable");
                continue;
            }
            view.editables
                .entry(editable.element.clone())
                .or_insert_with(|| Editable {
                    element: editable.element.clone(),
                    tagname: editable.tagname.clone(),
                    partname: editable.partname.clone(),
                });
        }
        view.nested = None;
    }

    pub fn blocks_snapshot(&self) -> Vec<Block> {
        self.inner.view.lock().unwrap().blocks.values().cloned().collect()
    }

    pub fn editables_snapshot(&self) -> Vec<Editable> {
        self.inner
            .view
            .lock()
            .unwrap()
            .editables
            .values()
            .cloned()
            .collect()
    }

    pub(crate) fn block(&self, element: &str) -> Option<Block> {
        self.inner.view.lock().unwrap().blocks.get(element).cloned()
    }

    pub(crate) fn add_block(&self, block: Block) {
        let mut view = self.inner.view.lock().unwrap();
        view.blocks.insert(block.element.clone(), block);
        view.nested = None;
    }

    pub(crate) fn remove_block(&self, element: &str) {
        let mut view = self.inner.view.lock().unwrap();
        view.blocks.remove(element);
        view.nested = None;
    }

    /// Queue a tag (and its block element) for server-side deletion on
    /// the next save.
    pub fn queue_delete(&self, tag: &str, block_element: &str) {
        let mut view = self.inner.view.lock().unwrap();
        if !view.deleted_tags.iter().any(|queued| queued == tag) {
            view.deleted_tags.push(tag.to_string());
        }
        if !view.deleted_blocks.iter().any(|queued| queued == block_element) {
            view.deleted_blocks.push(block_element.to_string());
        }
    }

    /// Remove a tag from the page: drop its tracked blocks and queue
    /// the server-side deletion.
    pub fn delete_tag(&self, tag: &str) {
        let blocks: Vec<Block> = self
            .blocks_snapshot()
            .into_iter()
            .filter(|block| block.tagname == tag)
            .collect();
        for block in &blocks {
            self.remove_block(&block.element);
        }
        match blocks.first() {
            Some(block) => self.queue_delete(tag, &block.element),
            None => self.queue_delete(tag, ""),
        }
    }

    pub(crate) fn deleted_snapshot(&self) -> (Vec<String>, Vec<String>) {
        let view = self.inner.view.lock().unwrap();
        (view.deleted_tags.clone(), view.deleted_blocks.clone())
    }

    /// Block element ids nested inside the given editable, memoized
    /// until the tracked view changes.
    pub fn blocks_in_editable(&self, dom: &Dom, editable_element: &str) -> Vec<String> {
        let mut view = self.inner.view.lock().unwrap();
        if view.nested.is_none() {
            let mut nested = BTreeMap::new();
            for editable in view.editables.values() {
                let Some(root) = dom.find_by_element_id(&editable.element) else {
                    continue;
                };
                let mut inside = Vec::new();
                for block in view.blocks.values() {
                    if let Some(node) = dom.find_by_element_id(&block.element) {
                        if node != root && dom.contains(root, node) {
                            inside.push(block.element.clone());
                        }
                    }
                }
                nested.insert(editable.element.clone(), inside);
            }
            view.nested = Some(nested);
        }
        view.nested
            .as_ref()
            .unwrap()
            .get(editable_element)
            .cloned()
            .unwrap_or_default()
    }

    // ---- reconciliation / persistence -----------------------------------

    /// Reconcile anchors against tags on the live instance.
    pub async fn reconcile(&self, dom: &mut Dom) -> Result<ReconcileReport> {
        self.read().await?;
        let mut store = LiveStore { page: self };
        reconcile_links(self, dom, &mut store).await
    }

    /// Save the page through a fork.
    ///
    /// The live instance is never mutated while the round-trip is
    /// pending; edits made in the meantime survive a failure untouched
    /// and stay pending after a success.
    pub async fn save(&self, dom: &mut Dom, options: SaveOptions) -> Result<()> {
        let object = &self.inner.object;
        object.read().await?;
        let client = object.client().map_err(ContentError::from)?;
        let key = object.cache_key().expect("read resolves the id");
        client.emit(ObjectEvent::BeforeSave(key.clone()));

        let mut fork = PageFork::from_live(self);
        // reconciliation completes fully before persistence is dispatched
        reconcile_links(self, dom, &mut fork).await?;

        let body = fork.save_body(object, options.unlock);
        let request = channelled(
            object,
            Request::post(format!("page/save/{}", key.id), body),
        );
        match client.gateway().call(request).await {
            Ok(response) => {
                object.absorb_save_success(&fork.shadow, response.payload.get("page"));
                self.settle_deletes(&fork, true);
                client.emit(ObjectEvent::Saved(key));
                Ok(())
            }
            Err(error) => {
                object.absorb_save_failure(&fork.shadow);
                self.settle_deletes(&fork, false);
                Err(ContentError::Gateway(error).into())
            }
        }
    }

    /// After a save: on success drop everything the fork persisted from
    /// the live accumulators; on failure adopt the fork's queue so a
    /// retry resends it.
    fn settle_deletes(&self, fork: &PageFork, saved: bool) {
        let mut view = self.inner.view.lock().unwrap();
        if saved {
            view.deleted_tags.retain(|tag| !fork.deleted_tags.contains(tag));
            view.deleted_blocks
                .retain(|element| !fork.deleted_blocks.contains(element));
        } else {
            for tag in &fork.deleted_tags {
                if !view.deleted_tags.contains(tag) {
                    view.deleted_tags.push(tag.clone());
                }
            }
            for element in &fork.deleted_blocks {
                if !view.deleted_blocks.contains(element) {
                    view.deleted_blocks.push(element.clone());
                }
            }
        }
    }
}

/// Append the channel query for channelled objects.
pub(crate) fn channelled(object: &ContentObject, request: Request) -> Request {
    if object.channel() == 0 {
        request
    } else {
        request.with_query("channel", object.channel().to_string())
    }
}

/// One `Page` per identity, layered over the identity cache.
pub struct PageStore {
    client: ContentClient,
    pages: Mutex<HashMap<CacheKey, Page>>,
}

impl PageStore {
    pub fn new(client: ContentClient) -> Self {
        Self {
            client,
            pages: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &ContentClient {
        &self.client
    }

    /// The page for `id`, reusing the existing instance when present.
    pub fn page(&self, id: impl Into<ObjectId>) -> Result<Page> {
        let object = self.client.page(id)?;
        Ok(self.adopt(object))
    }

    /// A page from constructor data the caller already holds.
    pub fn page_from_data(&self, data: JsonMap) -> Result<Page> {
        let object = self
            .client
            .resolve(LookupRequest::new(ObjectKind::Page).with_data(data))?;
        Ok(self.adopt(object))
    }

    fn adopt(&self, object: Arc<ContentObject>) -> Page {
        let key = object.cache_key().expect("id-addressed lookups have keys");
        let mut pages = self.pages.lock().unwrap();
        pages
            .entry(key)
            .or_insert_with(|| Page::from_object(object))
            .clone()
    }
}
