//! MongoDB storage implementation.
//!
//! Every trait call maps onto exactly one driver call; filters, updates and
//! pipelines are rendered from the typed values in [`crate::types`].

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::{Client, Collection};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::traits::store::ListingStore;
use crate::types::{
    document::normalize_decimals,
    filter::Filter,
    listing::ListingId,
    outcome::{DeleteOutcome, InsertFailure, InsertManyOutcome, UpdateOutcome},
    pipeline::Pipeline,
    query::{FindOptions, InsertMode},
};

/// Database used by the public sample dataset.
pub const DEFAULT_DATABASE: &str = "sample_airbnb";

/// Collection used by the public sample dataset.
pub const DEFAULT_COLLECTION: &str = "listingsAndReviews";

/// Owns the driver client for the lifetime of a run.
///
/// Acquire once with [`MongoConnection::connect`], hand out stores with
/// [`MongoConnection::listings`], and call [`MongoConnection::close`] on the
/// way out whether the work succeeded or not.
pub struct MongoConnection {
    client: Client,
}

impl MongoConnection {
    /// Parse the connection string and verify the deployment answers.
    ///
    /// The driver connects lazily, so a `ping` is sent here to surface a bad
    /// URI or unreachable cluster before any operation runs.
    pub async fn connect(uri: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        tracing::debug!("connected to document store");
        Ok(Self { client })
    }

    /// Names of the databases visible to this connection.
    pub async fn database_names(&self) -> Result<Vec<String>> {
        Ok(self.client.list_database_names().await?)
    }

    /// Store scoped to one collection.
    pub fn listings(&self, database: &str, collection: &str) -> MongoStore {
        MongoStore {
            collection: self.client.database(database).collection(collection),
        }
    }

    /// Release pooled connections and background monitors.
    pub async fn close(self) {
        self.client.shutdown().await;
        tracing::debug!("document store connection closed");
    }
}

/// A listing collection in MongoDB.
#[derive(Clone)]
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    pub fn namespace(&self) -> String {
        self.collection.namespace().to_string()
    }
}

async fn collect(cursor: mongodb::Cursor<Document>) -> Result<Vec<Document>> {
    let docs: Vec<Document> = cursor.try_collect().await?;
    Ok(docs.into_iter().map(normalize_decimals).collect())
}

fn ensure_id(doc: &mut Document) -> ListingId {
    if !doc.contains_key("_id") {
        doc.insert("_id", ListingId::generate().into_bson());
    }
    ListingId::from(doc.get("_id").cloned().unwrap_or(Bson::Null))
}

#[async_trait]
impl ListingStore for MongoStore {
    async fn insert_one(&self, doc: Document) -> Result<ListingId> {
        let result = self.collection.insert_one(doc).await?;
        Ok(ListingId::from(result.inserted_id))
    }

    async fn insert_many(&self, mut docs: Vec<Document>, mode: InsertMode) -> Result<InsertManyOutcome> {
        // Ids are assigned up front: the driver's batch error does not expose
        // which ids made it in.
        let ids: Vec<ListingId> = docs.iter_mut().map(ensure_id).collect();
        let requested = docs.len();

        let failures = match self
            .collection
            .insert_many(&docs)
            .ordered(mode.is_ordered())
            .await
        {
            Ok(_) => Vec::new(),
            Err(err) => match err.kind.as_ref() {
                ErrorKind::InsertMany(failure) => match &failure.write_errors {
                    Some(errors) if !errors.is_empty() => errors
                        .iter()
                        .map(|e| InsertFailure {
                            index: e.index,
                            message: e.message.clone(),
                        })
                        .collect(),
                    _ => return Err(err.into()),
                },
                _ => return Err(err.into()),
            },
        };

        // Ordered batches stop at the first rejected record.
        let cutoff = match mode {
            InsertMode::Ordered => failures.iter().map(|f| f.index).min().unwrap_or(requested),
            InsertMode::Unordered => requested,
        };

        let inserted_ids: BTreeMap<usize, ListingId> = ids
            .into_iter()
            .enumerate()
            .take(cutoff)
            .filter(|(index, _)| !failures.iter().any(|f| f.index == *index))
            .collect();

        Ok(InsertManyOutcome {
            requested,
            inserted_ids,
            failures,
        })
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>> {
        let found = self.collection.find_one(filter.to_document()).await?;
        Ok(found.map(normalize_decimals))
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>> {
        let mut action = self.collection.find(filter.to_document());
        if let Some(sort) = &options.sort {
            action = action.sort(sort.to_document());
        }
        if let Some(limit) = options.limit {
            action = action.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        collect(action.await?).await
    }

    async fn update_one(&self, filter: &Filter, set: &Document, upsert: bool) -> Result<UpdateOutcome> {
        let result = self
            .collection
            .update_one(filter.to_document(), doc! { "$set": set.clone() })
            .upsert(upsert)
            .await?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted_id: result.upserted_id.map(ListingId::from),
        })
    }

    async fn update_many(&self, filter: &Filter, set: &Document) -> Result<UpdateOutcome> {
        let result = self
            .collection
            .update_many(filter.to_document(), doc! { "$set": set.clone() })
            .await?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted_id: None,
        })
    }

    async fn delete_one(&self, filter: &Filter) -> Result<DeleteOutcome> {
        let result = self.collection.delete_one(filter.to_document()).await?;
        Ok(DeleteOutcome {
            deleted: result.deleted_count,
        })
    }

    async fn delete_many(&self, filter: &Filter) -> Result<DeleteOutcome> {
        let result = self.collection.delete_many(filter.to_document()).await?;
        Ok(DeleteOutcome {
            deleted: result.deleted_count,
        })
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>> {
        collect(self.collection.aggregate(pipeline.to_documents()).await?).await
    }
}
