//! Collections
//!
//! A [`Collection`] owns the authoritative snapshot of one named document
//! set. Every mutation is queued on the collection's [`SerialQueue`] and,
//! once it runs:
//!
//! 1. produces the new snapshot and its structural patches
//! 2. publishes the new snapshot
//! 3. emits the five patch events, in order, synchronously
//! 4. persists the derived backend ops as one atomic batch
//!
//! The mutation's future resolves after step 4. The snapshot is committed
//! before persistence: a failed backend write is reported to the caller
//! but the in-memory state stays advanced. Call
//! [`Collection::load_from_backend`] to resynchronize.

use crate::apply::apply_backend_ops;
use crate::config::CollectionOptions;
use crate::events::{EventBus, Handler, PatchBatch, PatchEvent, PatchSource, SubscriptionId};
use crate::expand::expand_patches;
use crate::snapshot::{Snapshot, SnapshotDraft};
use crate::translate::{to_addressable, to_backend_ops};
use evig_concurrency::SerialQueue;
use evig_core::{Backend, Document, Error, Patch, Result, WriteBatch, ID_KEY};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Initial or replacement contents for a collection
#[derive(Debug, Clone)]
pub enum Seed {
    /// Documents keyed by their own ids
    List(Vec<Document>),
    /// Explicit id -> document map; keys must equal the ids
    Map(IndexMap<String, Document>),
}

impl Seed {
    /// Resolve into an ordered id -> document map
    ///
    /// In a list a repeated id keeps its first position and its last value.
    pub fn into_map(self) -> Result<IndexMap<String, Document>> {
        match self {
            Seed::List(docs) => {
                let mut map = IndexMap::with_capacity(docs.len());
                for doc in docs {
                    let id = doc.validate()?.to_string();
                    map.insert(id, doc);
                }
                Ok(map)
            }
            Seed::Map(map) => {
                for (key, doc) in &map {
                    let id = doc.validate()?;
                    if id != key {
                        return Err(Error::InvalidDocument(format!(
                            "document id \"{}\" does not match its key \"{}\"",
                            id, key
                        )));
                    }
                }
                Ok(map)
            }
        }
    }
}

impl From<Vec<Document>> for Seed {
    fn from(docs: Vec<Document>) -> Self {
        Seed::List(docs)
    }
}

impl From<IndexMap<String, Document>> for Seed {
    fn from(docs: IndexMap<String, Document>) -> Self {
        Seed::Map(docs)
    }
}

struct CollectionInner {
    name: String,
    prefix: String,
    storage_key: String,
    backend: Arc<dyn Backend>,
    state: RwLock<Snapshot>,
    queue: SerialQueue,
    events: EventBus<PatchEvent>,
}

/// Reactive, persisted document collection
///
/// Cloning yields another handle to the same collection.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

impl Collection {
    /// Create an empty collection; nothing is read from the backend yet
    pub fn new(
        name: impl Into<String>,
        backend: Arc<dyn Backend>,
        options: CollectionOptions,
    ) -> Self {
        let name = name.into();
        let storage_key = format!("{}{}", options.prefix, name);
        Self {
            inner: Arc::new(CollectionInner {
                queue: SerialQueue::new(storage_key.clone()),
                name,
                prefix: options.prefix,
                storage_key,
                backend,
                state: RwLock::new(Snapshot::new()),
                events: EventBus::new(),
            }),
        }
    }

    /// Create a collection and [`initialize`](Self::initialize) it
    pub async fn create(
        name: impl Into<String>,
        backend: Arc<dyn Backend>,
        options: CollectionOptions,
        seed: Option<Seed>,
    ) -> Result<Self> {
        let collection = Self::new(name, backend, options);
        collection.initialize(seed).await?;
        Ok(collection)
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Storage key prefix
    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    /// Backend key holding this collection: prefix + name
    pub fn storage_key(&self) -> &str {
        &self.inner.storage_key
    }

    /// Identity field name
    pub fn id_key(&self) -> &'static str {
        ID_KEY
    }

    /// The injected backend
    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.inner.backend)
    }

    /// Mutations queued or running
    pub fn pending(&self) -> usize {
        self.inner.queue.pending()
    }

    /// Document by id, as of the last completed mutation
    pub fn get(&self, id: &str) -> Option<Arc<Document>> {
        self.inner.state.read().get_arc(id)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.inner.state.read().clone()
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

    /// Number of registered handlers
    pub fn listener_count(&self) -> usize {
        self.inner.events.len()
    }

    /// Add a new document
    ///
    /// Fails with [`Error::DuplicateId`] if the id is taken.
    pub async fn insert(&self, doc: Document) -> Result<()> {
        let id = doc.validate()?.to_string();
        let name = self.inner.name.clone();
        self.mutate("insert", move |draft| {
            if draft.contains(&id) {
                return Err(Error::DuplicateId {
                    id,
                    collection: name,
                });
            }
            draft.insert(doc)?;
            Ok(())
        })
        .await
    }

    /// Apply `recipe` to an existing document
    ///
    /// Fails with [`Error::NotFound`] if the id is absent.
    pub async fn update<F>(&self, id: impl Into<String>, recipe: F) -> Result<()>
    where
        F: FnOnce(&mut Document) + Send + 'static,
    {
        let id = id.into();
        let name = self.inner.name.clone();
        self.mutate("update", move |draft| match draft.get_mut(&id) {
            Some(doc) => {
                recipe(doc);
                Ok(())
            }
            None => Err(Error::NotFound {
                id,
                collection: name,
            }),
        })
        .await
    }

    /// Apply `recipe` to a document, creating `{ id }` first if absent
    pub async fn upsert<F>(&self, id: impl Into<String>, recipe: F) -> Result<()>
    where
        F: FnOnce(&mut Document) + Send + 'static,
    {
        let id = id.into();
        self.mutate("upsert", move |draft| {
            if !draft.contains(&id) {
                draft.insert(Document::new(id.clone()))?;
            }
            if let Some(doc) = draft.get_mut(&id) {
                recipe(doc);
            }
            Ok(())
        })
        .await
    }

    /// Delete a document
    ///
    /// Fails with [`Error::NotFound`] if the id is absent.
    pub async fn remove(&self, id: impl Into<String>) -> Result<()> {
        let id = id.into();
        let name = self.inner.name.clone();
        self.mutate("remove", move |draft| match draft.remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound {
                id,
                collection: name,
            }),
        })
        .await
    }

    /// Make the collection equal `data` with the fewest possible edits
    pub async fn replace_all(&self, data: impl Into<Seed>) -> Result<()> {
        let target = data.into().into_map()?;
        self.mutate("replace_all", move |draft| {
            draft.reconcile(target);
            Ok(())
        })
        .await
    }

    /// Replace the in-memory snapshot with the backend's contents
    ///
    /// Returns whether the storage key existed. Emits no events.
    pub async fn load_from_backend(&self) -> Result<bool> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .queue
            .add(move || async move { inner.load().await })
            .await
    }

    /// Load from the backend, seeding it when it holds nothing
    ///
    /// When the storage key does not exist and `seed` is given, the seed
    /// becomes the snapshot and every document is written in one batch.
    /// Emits no events.
    pub async fn initialize(&self, seed: Option<Seed>) -> Result<()> {
        let seed = seed.map(Seed::into_map).transpose()?;
        let inner = Arc::clone(&self.inner);
        self.inner
            .queue
            .add(move || async move {
                if inner.load().await? {
                    return Ok(());
                }
                match seed {
                    Some(docs) => inner.seed(docs).await,
                    None => Ok(()),
                }
            })
            .await
    }

    /// Emit [`PatchEvent::Destroy`] and drop every handler
    pub fn destroy(&self) {
        info!(target: "evig::collection", collection = %self.inner.name, "Destroying collection");
        self.inner.events.emit(&PatchEvent::Destroy);
        self.inner.events.clear();
    }

    async fn mutate<F>(&self, op: &'static str, recipe: F) -> Result<()>
    where
        F: FnOnce(&mut SnapshotDraft) -> Result<()> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        self.inner
            .queue
            .add(move || async move { inner.run_mutation(op, recipe).await })
            .await
    }
}

impl CollectionInner {
    async fn run_mutation<F>(&self, op: &'static str, recipe: F) -> Result<()>
    where
        F: FnOnce(&mut SnapshotDraft) -> Result<()>,
    {
        let previous = self.state.read().clone();
        let (snapshot, patches) = previous.produce(recipe)?;
        *self.state.write() = snapshot.clone();
        debug!(
            target: "evig::collection",
            collection = %self.name,
            op,
            patches = patches.len(),
            "Mutation applied"
        );

        let ops = self.propagate(patches, snapshot, previous)?;
        if ops.is_empty() {
            return Ok(());
        }
        apply_backend_ops(self.backend.as_ref(), &self.storage_key, &ops)
            .await
            .map_err(|e| {
                warn!(
                    target: "evig::collection",
                    collection = %self.name,
                    op,
                    error = %e,
                    "Persisting mutation failed; in-memory state is ahead of the backend"
                );
                e
            })
    }

    /// Emit every patch form, returning the backend ops to persist
    fn propagate(
        &self,
        patches: Vec<Patch>,
        snapshot: Snapshot,
        previous: Snapshot,
    ) -> Result<Vec<evig_core::BackendOp>> {
        let batch = |patches| PatchBatch {
            patches,
            snapshot: snapshot.clone(),
            previous: previous.clone(),
        };

        let expanded = expand_patches(&patches);
        let addressable = to_addressable(&patches);
        let expanded_addressable = to_addressable(&expanded);
        let ops = to_backend_ops(&addressable)?;

        self.events.emit(&PatchEvent::StructuralPatches(batch(patches)));
        self.events
            .emit(&PatchEvent::ExpandedStructuralPatches(batch(expanded)));
        self.events.emit(&PatchEvent::Patches(PatchBatch {
            patches: addressable,
            snapshot: snapshot.clone(),
            previous: previous.clone(),
        }));
        self.events.emit(&PatchEvent::ExpandedPatches(PatchBatch {
            patches: expanded_addressable,
            snapshot: snapshot.clone(),
            previous: previous.clone(),
        }));
        self.events.emit(&PatchEvent::BackendOps(PatchBatch {
            patches: ops.clone(),
            snapshot,
            previous,
        }));
        Ok(ops)
    }

    async fn load(&self) -> Result<bool> {
        if !self.backend.exists(&self.storage_key).await? {
            debug!(target: "evig::collection", collection = %self.name, "Nothing stored yet");
            return Ok(false);
        }
        let fields = self.backend.read_all_fields(&self.storage_key).await?;
        let mut docs = IndexMap::with_capacity(fields.len());
        for (field, text) in fields {
            docs.insert(field, Document::decode(&text)?);
        }
        let snapshot = Snapshot::from_map(docs)?;
        info!(
            target: "evig::collection",
            collection = %self.name,
            documents = snapshot.len(),
            "Loaded from backend"
        );
        *self.state.write() = snapshot;
        Ok(true)
    }

    async fn seed(&self, docs: IndexMap<String, Document>) -> Result<()> {
        let mut batch = WriteBatch::new();
        for (id, doc) in &docs {
            batch.set_field(id.clone(), doc.encode()?);
        }
        let snapshot = Snapshot::from_map(docs)?;
        let count = snapshot.len();
        *self.state.write() = snapshot;
        self.backend.write_batch(&self.storage_key, batch).await?;
        info!(target: "evig::collection", collection = %self.name, documents = count, "Seeded");
        Ok(())
    }
}

impl PatchSource for Collection {
    fn get_document(&self, id: &str) -> Option<Document> {
        self.get(id).map(|doc| doc.as_ref().clone())
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

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name)
            .field("storage_key", &self.inner.storage_key)
            .field("documents", &self.inner.state.read().len())
            .finish()
    }
}
