//! Views
//!
//! A [`View`] is a read-only projection of one [`Collection`]: documents
//! failing the filter are left out, the remaining ones are pruned to the
//! included fields (all fields when none are listed) minus the excluded
//! ones. The identity field always survives pruning.
//!
//! Views listen to the collection's expanded structural patches and
//! re-publish their own minimal stream:
//!
//! - without a filter, patches touching a pruned field are dropped
//! - with a filter, the projections of the touched documents before and
//!   after the mutation are diffed, so documents crossing the filter
//!   boundary appear as full add sequences or removals
//!
//! Events carry the collection's snapshots. Empty results emit nothing.

use crate::collection::Collection;
use crate::config::{Filter, ViewOptions};
use crate::events::{EventBus, Handler, PatchBatch, PatchEvent, PatchSource, SubscriptionId};
use crate::expand::expand_patches;
use crate::snapshot::Snapshot;
use crate::translate::to_addressable;
use evig_core::{Document, Patch, Result, ID_KEY};
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

struct ViewInner {
    collection: Collection,
    included: IndexSet<String>,
    excluded: IndexSet<String>,
    filter: Option<Filter>,
    events: EventBus<PatchEvent>,
    subscription: Mutex<Option<SubscriptionId>>,
}

/// Filtered, field-pruned projection of a collection
///
/// Cloning yields another handle to the same view. Dropping the last
/// handle detaches it from the collection.
#[derive(Clone)]
pub struct View {
    inner: Arc<ViewInner>,
}

impl View {
    /// Bind a view to `collection`
    pub fn new(collection: &Collection, options: ViewOptions) -> Self {
        let inner = Arc::new(ViewInner {
            collection: collection.clone(),
            included: options.included_fields.into_iter().collect(),
            excluded: options.excluded_fields.into_iter().collect(),
            filter: options.filter,
            events: EventBus::new(),
            subscription: Mutex::new(None),
        });

        let weak: Weak<ViewInner> = Arc::downgrade(&inner);
        let id = collection.subscribe(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_collection_event(event);
            }
        });
        *inner.subscription.lock() = Some(id);

        Self { inner }
    }

    /// Convenience constructor mirroring [`Collection::create`]
    pub fn create(collection: &Collection, options: ViewOptions) -> Self {
        Self::new(collection, options)
    }

    /// The source collection
    pub fn collection(&self) -> &Collection {
        &self.inner.collection
    }

    /// Included fields, in configuration order
    pub fn included_fields(&self) -> impl Iterator<Item = &str> {
        self.inner.included.iter().map(String::as_str)
    }

    /// Excluded fields, in configuration order
    pub fn excluded_fields(&self) -> impl Iterator<Item = &str> {
        self.inner.excluded.iter().map(String::as_str)
    }

    /// Projected document, or `None` if absent or filtered out
    pub fn get(&self, id: &str) -> Option<Document> {
        let doc = self.inner.collection.get(id)?;
        self.inner
            .passes(&doc)
            .then(|| self.inner.transform(&doc))
    }

    /// Projection of the whole collection
    pub fn snapshot(&self) -> Snapshot {
        self.inner.project(&self.inner.collection.snapshot(), None)
    }

    /// True if a patch touches a field this view keeps
    pub fn is_patch_applicable(&self, patch: &Patch) -> bool {
        self.inner.is_patch_applicable(patch)
    }

    /// Register an event handler
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&PatchEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(handler)
    }

    /// Remove an event handler
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    /// Stop following the collection
    ///
    /// The view's own handlers stay registered but receive nothing more.
    pub fn destroy(&self) {
        self.inner.detach();
    }
}

impl Drop for ViewInner {
    fn drop(&mut self) {
        self.detach();
    }
}

impl ViewInner {
    fn detach(&self) {
        if let Some(id) = self.subscription.lock().take() {
            self.collection.unsubscribe(id);
            debug!(target: "evig::view", collection = %self.collection.name(), "View detached");
        }
    }

    fn passes(&self, doc: &Document) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(doc))
    }

    fn keeps_field(&self, field: &str) -> bool {
        if field == ID_KEY {
            return true;
        }
        if self.excluded.contains(field) {
            return false;
        }
        self.included.is_empty() || self.included.contains(field)
    }

    fn is_patch_applicable(&self, patch: &Patch) -> bool {
        patch.field().map_or(true, |field| self.keeps_field(field))
    }

    fn transform(&self, doc: &Document) -> Document {
        if self.included.is_empty() && self.excluded.is_empty() {
            return doc.clone();
        }
        Document::from_map(
            doc.iter()
                .filter(|(field, _)| self.keeps_field(field))
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect(),
        )
    }

    /// Filtered, pruned copy of `snapshot`, optionally limited to `only`
    fn project(&self, snapshot: &Snapshot, only: Option<&FxHashSet<&str>>) -> Snapshot {
        let entries: IndexMap<String, Arc<Document>> = snapshot
            .iter()
            .filter(|(id, _)| only.map_or(true, |ids| ids.contains(id)))
            .filter(|(_, doc)| self.passes(doc))
            .map(|(id, doc)| (id.to_string(), Arc::new(self.transform(doc))))
            .collect();
        Snapshot::from_entries(entries)
    }

    fn on_collection_event(&self, event: &PatchEvent) {
        match event {
            PatchEvent::ExpandedStructuralPatches(batch) => {
                let patches = match self.recompute(batch) {
                    Ok(patches) => patches,
                    Err(e) => {
                        warn!(target: "evig::view", collection = %self.collection.name(), error = %e, "View recomputation failed");
                        return;
                    }
                };
                if patches.is_empty() {
                    return;
                }
                debug!(target: "evig::view", collection = %self.collection.name(), patches = patches.len(), "Re-emitting patches");

                let addressable = to_addressable(&patches);
                self.events
                    .emit(&PatchEvent::ExpandedStructuralPatches(PatchBatch {
                        patches,
                        snapshot: batch.snapshot.clone(),
                        previous: batch.previous.clone(),
                    }));
                self.events.emit(&PatchEvent::ExpandedPatches(PatchBatch {
                    patches: addressable,
                    snapshot: batch.snapshot.clone(),
                    previous: batch.previous.clone(),
                }));
            }
            PatchEvent::Destroy => self.events.emit(&PatchEvent::Destroy),
            _ => {}
        }
    }

    fn recompute(&self, batch: &PatchBatch<Patch>) -> Result<Vec<Patch>> {
        if self.filter.is_none() {
            return Ok(batch
                .patches
                .iter()
                .filter(|patch| self.is_patch_applicable(patch))
                .cloned()
                .collect());
        }

        let touched: FxHashSet<&str> = batch.patches.iter().filter_map(Patch::doc_id).collect();
        if touched.is_empty() {
            return Ok(Vec::new());
        }
        let before = self.project(&batch.previous, Some(&touched));
        let after = self.project(&batch.snapshot, Some(&touched));
        let target: IndexMap<String, Document> = after
            .iter()
            .map(|(id, doc)| (id.to_string(), doc.clone()))
            .collect();

        let (_, patches) = before.produce(|draft| {
            draft.reconcile(target);
            Ok(())
        })?;
        Ok(expand_patches(&patches))
    }
}

impl PatchSource for View {
    fn get_document(&self, id: &str) -> Option<Document> {
        self.get(id)
    }

    fn current_snapshot(&self) -> Snapshot {
        self.snapshot()
    }

    fn add_listener(&self, handler: Handler<PatchEvent>) -> SubscriptionId {
        self.inner.events.subscribe_arc(handler)
    }

    fn remove_listener(&self, id: SubscriptionId) -> bool {
        self.unsubscribe(id)
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("collection", &self.inner.collection.name())
            .field("included", &self.inner.included)
            .field("excluded", &self.inner.excluded)
            .field("filter", &self.inner.filter.is_some())
            .finish()
    }
}
