//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use bson::{Bson, Document};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{ListingError, Result};
use crate::traits::store::ListingStore;
use crate::types::{
    document::set_path,
    filter::Filter,
    listing::ListingId,
    outcome::{DeleteOutcome, InsertFailure, InsertManyOutcome, UpdateOutcome},
    pipeline::{sort_documents, Pipeline},
    query::{FindOptions, InsertMode},
};

type Validator = Box<dyn Fn(&Document) -> std::result::Result<(), String> + Send + Sync>;

/// In-memory listing collection.
///
/// Evaluates the same filters, updates and pipelines the real store gets,
/// with the same matching, ordering, duplicate-`_id` and upsert rules.
/// Data is lost when the store is dropped.
pub struct MemoryStore {
    docs: RwLock<Vec<Document>>,
    validator: Option<Validator>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
            validator: None,
        }
    }

    /// Reject documents the way a collection schema validator would.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Document) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the stored documents in natural order.
    pub fn documents(&self) -> Vec<Document> {
        self.read().map(|docs| docs.clone()).unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Document>>> {
        self.docs
            .read()
            .map_err(|e| ListingError::Storage(e.to_string().into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Document>>> {
        self.docs
            .write()
            .map_err(|e| ListingError::Storage(e.to_string().into()))
    }

    /// Assign an `_id` if missing and run the insert-time checks.
    fn prepare(&self, existing: &[Document], mut doc: Document) -> std::result::Result<Document, String> {
        if !doc.contains_key("_id") {
            doc.insert("_id", ListingId::generate().into_bson());
        }

        let id = doc.get("_id").cloned().unwrap_or(Bson::Null);
        if existing.iter().any(|d| d.get("_id") == Some(&id)) {
            return Err(format!("E11000 duplicate key error: _id {}", id));
        }

        if let Some(validator) = &self.validator {
            validator(&doc).map_err(|reason| format!("Document failed validation: {reason}"))?;
        }

        Ok(doc)
    }
}

fn id_of(doc: &Document) -> ListingId {
    ListingId::from(doc.get("_id").cloned().unwrap_or(Bson::Null))
}

/// Apply `$set`; returns whether anything changed. The document is left
/// untouched when any path cannot be set.
fn apply_set(doc: &mut Document, set: &Document) -> Result<bool> {
    let mut updated = doc.clone();
    for (path, value) in set {
        set_path(&mut updated, path, value.clone())
            .map_err(|message| ListingError::Storage(message.into()))?;
    }
    let changed = updated != *doc;
    *doc = updated;
    Ok(changed)
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn insert_one(&self, doc: Document) -> Result<ListingId> {
        let mut docs = self.write()?;
        let doc = self
            .prepare(&docs, doc)
            .map_err(|message| ListingError::Storage(message.into()))?;
        let id = id_of(&doc);
        docs.push(doc);
        Ok(id)
    }

    async fn insert_many(&self, batch: Vec<Document>, mode: InsertMode) -> Result<InsertManyOutcome> {
        let mut docs = self.write()?;
        let mut outcome = InsertManyOutcome {
            requested: batch.len(),
            ..Default::default()
        };

        for (index, doc) in batch.into_iter().enumerate() {
            match self.prepare(&docs, doc) {
                Ok(doc) => {
                    outcome.inserted_ids.insert(index, id_of(&doc));
                    docs.push(doc);
                }
                Err(message) => {
                    outcome.failures.push(InsertFailure { index, message });
                    if mode.is_ordered() {
                        break;
                    }
                }
            }
        }

        Ok(outcome)
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>> {
        Ok(self.read()?.iter().find(|d| filter.matches(d)).cloned())
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>> {
        let mut found: Vec<Document> = self
            .read()?
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();

        if let Some(sort) = &options.sort {
            sort_documents(&mut found, sort);
        }
        if let Some(limit) = options.limit {
            found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        Ok(found)
    }

    async fn update_one(&self, filter: &Filter, set: &Document, upsert: bool) -> Result<UpdateOutcome> {
        let mut docs = self.write()?;

        if let Some(doc) = docs.iter_mut().find(|d| filter.matches(d)) {
            let modified = apply_set(doc, set)?;
            return Ok(UpdateOutcome {
                matched: 1,
                modified: u64::from(modified),
                upserted_id: None,
            });
        }

        if !upsert {
            return Ok(UpdateOutcome::default());
        }

        let mut seed = Document::new();
        for (path, value) in filter.equality_fields() {
            set_path(&mut seed, path, value.clone())
                .map_err(|message| ListingError::Storage(message.into()))?;
        }
        apply_set(&mut seed, set)?;

        let doc = self
            .prepare(&docs, seed)
            .map_err(|message| ListingError::Storage(message.into()))?;
        let id = id_of(&doc);
        docs.push(doc);

        Ok(UpdateOutcome {
            matched: 0,
            modified: 0,
            upserted_id: Some(id),
        })
    }

    async fn update_many(&self, filter: &Filter, set: &Document) -> Result<UpdateOutcome> {
        let mut docs = self.write()?;
        let mut outcome = UpdateOutcome::default();

        for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
            outcome.matched += 1;
            if apply_set(doc, set)? {
                outcome.modified += 1;
            }
        }

        Ok(outcome)
    }

    async fn delete_one(&self, filter: &Filter) -> Result<DeleteOutcome> {
        let mut docs = self.write()?;
        let deleted = match docs.iter().position(|d| filter.matches(d)) {
            Some(index) => {
                docs.remove(index);
                1
            }
            None => 0,
        };
        Ok(DeleteOutcome { deleted })
    }

    async fn delete_many(&self, filter: &Filter) -> Result<DeleteOutcome> {
        let mut docs = self.write()?;
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok(DeleteOutcome {
            deleted: (before - docs.len()) as u64,
        })
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>> {
        let docs = self.read()?.clone();
        Ok(pipeline.apply(docs))
    }
}
