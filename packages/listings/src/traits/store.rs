//! The collection-level primitives the repository is built on.

use async_trait::async_trait;
use bson::Document;

use crate::error::Result;
use crate::types::{
    filter::Filter,
    listing::ListingId,
    outcome::{DeleteOutcome, InsertManyOutcome, UpdateOutcome},
    pipeline::Pipeline,
    query::{FindOptions, InsertMode},
};

/// A single logical collection of listing documents.
///
/// Every method is one round-trip to the backing store. Implementations do
/// not retry; errors are returned as they come.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Insert one document, returning its id (generated if `_id` is absent).
    async fn insert_one(&self, doc: Document) -> Result<ListingId>;

    /// Insert a batch.
    ///
    /// Per-record rejections are reported in the outcome's `failures`, not as
    /// an `Err`; `Err` is reserved for failures of the whole call.
    async fn insert_many(&self, docs: Vec<Document>, mode: InsertMode) -> Result<InsertManyOutcome>;

    /// First matching document in natural order.
    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>>;

    /// All matching documents, sorted and limited per `options`.
    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>>;

    /// `$set` the given fields on the first match. With `upsert`, a missing
    /// match inserts a document built from the filter's equality fields
    /// plus `set`.
    async fn update_one(&self, filter: &Filter, set: &Document, upsert: bool) -> Result<UpdateOutcome>;

    /// `$set` the given fields on every match.
    async fn update_many(&self, filter: &Filter, set: &Document) -> Result<UpdateOutcome>;

    /// Delete the first match.
    async fn delete_one(&self, filter: &Filter) -> Result<DeleteOutcome>;

    /// Delete every match.
    async fn delete_many(&self, filter: &Filter) -> Result<DeleteOutcome>;

    /// Run an aggregation pipeline and collect the result rows.
    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>>;
}
