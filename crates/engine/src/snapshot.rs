//! Persistent collection snapshots
//!
//! A [`Snapshot`] maps document ids to documents. It is immutable once
//! built and cheap to clone: the map sits behind one `Arc` and every
//! document behind its own, so a new snapshot shares every document a
//! mutation did not touch.
//!
//! Mutation goes through [`Snapshot::produce`], which hands a
//! [`SnapshotDraft`] to a recipe and diffs the outcome. Documents the
//! recipe never borrowed mutably are skipped by pointer comparison.

use crate::produce::diff_maps;
use crate::reconcile::reconcile;
use evig_core::{Document, Error, Patch, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;

type Entries = IndexMap<String, Arc<Document>>;

/// Immutable id -> document map
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    docs: Arc<Entries>,
}

impl Snapshot {
    /// Empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from documents, keyed by their ids
    ///
    /// Later documents with a repeated id replace earlier ones in place.
    pub fn from_documents(docs: impl IntoIterator<Item = Document>) -> Result<Self> {
        let mut entries = Entries::new();
        for doc in docs {
            let id = doc.validate()?.to_string();
            entries.insert(id, Arc::new(doc));
        }
        Ok(Self::from_entries(entries))
    }

    /// Build from an id -> document map
    ///
    /// Every key must equal its document's id.
    pub fn from_map(docs: IndexMap<String, Document>) -> Result<Self> {
        let mut entries = Entries::with_capacity(docs.len());
        for (key, doc) in docs {
            check_key(&key, &doc)?;
            entries.insert(key, Arc::new(doc));
        }
        Ok(Self::from_entries(entries))
    }

    pub(crate) fn from_entries(entries: Entries) -> Self {
        Self {
            docs: Arc::new(entries),
        }
    }

    /// Document by id
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.docs.get(id).map(|doc| doc.as_ref())
    }

    /// Shared handle to a document
    pub fn get_arc(&self, id: &str) -> Option<Arc<Document>> {
        self.docs.get(id).cloned()
    }

    /// True if `id` is present
    pub fn contains(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// True when there are no documents
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Ids in snapshot order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.docs.keys().map(String::as_str)
    }

    /// `(id, document)` pairs in snapshot order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.docs.iter().map(|(id, doc)| (id.as_str(), doc.as_ref()))
    }

    /// The whole snapshot as one JSON object keyed by id
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.docs
                .iter()
                .map(|(id, doc)| (id.clone(), doc.to_value()))
                .collect(),
        )
    }

    /// True if both handles share the same underlying map
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.docs, &other.docs)
    }

    /// Editable copy sharing every document with this snapshot
    pub fn draft(&self) -> SnapshotDraft {
        SnapshotDraft {
            docs: self.docs.as_ref().clone(),
        }
    }

    /// Run `recipe` on a draft and diff the outcome
    ///
    /// Returns the new snapshot and the patches leading to it; `self` is
    /// left as it was. Patches follow the per-level order of
    /// [`crate::produce`] with document ids as the first segment. A
    /// failing recipe, or one that leaves a document whose `id` no longer
    /// matches its key, discards the draft.
    pub fn produce<F>(&self, recipe: F) -> Result<(Snapshot, Vec<Patch>)>
    where
        F: FnOnce(&mut SnapshotDraft) -> Result<()>,
    {
        let mut draft = self.draft();
        recipe(&mut draft)?;

        let mut patches = Vec::new();
        let mut path = Vec::with_capacity(4);
        for (id, doc) in &draft.docs {
            match self.docs.get(id) {
                Some(base) if Arc::ptr_eq(base, doc) => {}
                Some(base) => {
                    check_key(id, doc)?;
                    path.push(id.clone());
                    diff_maps(base.as_map(), doc.as_map(), &mut path, &mut patches);
                    path.pop();
                }
                None => {
                    check_key(id, doc)?;
                    patches.push(Patch::add(vec![id.clone()], doc.to_value()));
                }
            }
        }
        for id in self.docs.keys() {
            if !draft.docs.contains_key(id) {
                patches.push(Patch::remove(vec![id.clone()]));
            }
        }

        Ok((Self::from_entries(draft.docs), patches))
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.docs == other.docs
    }
}

fn check_key(key: &str, doc: &Document) -> Result<()> {
    let id = doc.validate()?;
    if id != key {
        return Err(Error::InvalidDocument(format!(
            "document id \"{}\" does not match its key \"{}\"",
            id, key
        )));
    }
    Ok(())
}

/// Mutable view of a snapshot handed to recipes
///
/// Only documents borrowed through [`SnapshotDraft::get_mut`] are copied.
#[derive(Debug, Clone)]
pub struct SnapshotDraft {
    docs: Entries,
}

impl SnapshotDraft {
    /// Document by id
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.docs.get(id).map(|doc| doc.as_ref())
    }

    /// Mutable document by id, copied on first write
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Document> {
        self.docs.get_mut(id).map(Arc::make_mut)
    }

    /// True if `id` is present
    pub fn contains(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// True when there are no documents
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Insert `doc` under its id, returning the document it replaced
    pub fn insert(&mut self, doc: Document) -> Result<Option<Arc<Document>>> {
        let id = doc.validate()?.to_string();
        Ok(self.docs.insert(id, Arc::new(doc)))
    }

    /// Remove a document, keeping the order of the rest
    pub fn remove(&mut self, id: &str) -> Option<Arc<Document>> {
        self.docs.shift_remove(id)
    }

    /// Make the draft deep-equal `target` with the fewest edits
    ///
    /// The draft takes the target's document order. Documents equal on
    /// both sides keep their shared handle.
    pub fn reconcile(&mut self, target: IndexMap<String, Document>) {
        let mut previous = std::mem::take(&mut self.docs);
        for (id, wanted) in target {
            let doc = match previous.swap_remove(&id) {
                Some(existing) if *existing == wanted => existing,
                Some(mut existing) => {
                    let fields: &mut Map<String, Value> =
                        Arc::make_mut(&mut existing).as_map_mut();
                    reconcile(fields, wanted.as_map());
                    existing
                }
                None => Arc::new(wanted),
            };
            self.docs.insert(id, doc);
        }
    }
}
