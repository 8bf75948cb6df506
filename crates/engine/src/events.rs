//! Patch events and subscriber lists
//!
//! Every collection and view owns an [`EventBus<PatchEvent>`]. Handlers run
//! synchronously on the emitting task, in registration order, and see each
//! batch before the next mutation starts.

use crate::snapshot::Snapshot;
use evig_core::{AddressablePatch, BackendOp, Document, Patch};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies one registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Shared event handler
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Ordered list of event handlers
pub struct EventBus<E> {
    handlers: RwLock<Vec<(SubscriptionId, Handler<E>)>>,
    next_id: AtomicU64,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<E> EventBus<E> {
    /// Empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; it runs after every handler registered before it
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe_arc(Arc::new(handler))
    }

    /// Register an already shared handler
    pub fn subscribe_arc(&self, handler: Handler<E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, handler));
        id
    }

    /// Remove a handler; false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// Deliver `event` to every handler
    ///
    /// Handlers may subscribe or unsubscribe while running; such changes
    /// take effect from the next emission.
    pub fn emit(&self, event: &E) {
        let handlers: Vec<Handler<E>> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    /// Drop every handler
    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.len())
            .finish()
    }
}

/// One mutation's patches plus the snapshots around it
#[derive(Debug, Clone)]
pub struct PatchBatch<P> {
    /// Patches in application order
    pub patches: Vec<P>,
    /// Collection snapshot after the mutation
    pub snapshot: Snapshot,
    /// Collection snapshot before the mutation
    pub previous: Snapshot,
}

impl<P> PatchBatch<P> {
    /// Number of patches
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// True when the mutation changed nothing
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

/// Events published by collections and views
///
/// A collection emits the five patch events for each mutation in
/// declaration order. Views re-emit only the two expanded forms.
#[derive(Debug, Clone)]
pub enum PatchEvent {
    /// Raw structural patches
    StructuralPatches(PatchBatch<Patch>),
    /// Structural patches with composite values expanded to leaves
    ExpandedStructuralPatches(PatchBatch<Patch>),
    /// Addressable form of the raw patches
    Patches(PatchBatch<AddressablePatch>),
    /// Addressable form of the expanded patches
    ExpandedPatches(PatchBatch<AddressablePatch>),
    /// Backend operations derived from the raw patches
    BackendOps(PatchBatch<BackendOp>),
    /// The source was destroyed; no further events follow
    Destroy,
}

impl PatchEvent {
    /// Short name for logs and tests
    pub fn kind(&self) -> &'static str {
        match self {
            PatchEvent::StructuralPatches(_) => "structural_patches",
            PatchEvent::ExpandedStructuralPatches(_) => "expanded_structural_patches",
            PatchEvent::Patches(_) => "patches",
            PatchEvent::ExpandedPatches(_) => "expanded_patches",
            PatchEvent::BackendOps(_) => "backend_ops",
            PatchEvent::Destroy => "destroy",
        }
    }
}

/// Anything that serves documents and publishes [`PatchEvent`]s
///
/// Implemented by collections and views so consumers can accept either.
pub trait PatchSource: Send + Sync {
    /// Current document by id, as this source presents it
    fn get_document(&self, id: &str) -> Option<Document>;

    /// Current contents, as this source presents them
    fn current_snapshot(&self) -> Snapshot;

    /// Register an event handler
    fn add_listener(&self, handler: Handler<PatchEvent>) -> SubscriptionId;

    /// Remove an event handler
    fn remove_listener(&self, id: SubscriptionId) -> bool;
}
