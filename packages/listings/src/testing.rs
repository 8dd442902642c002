//! Testing utilities: fixture listings and a store that always fails.
//!
//! Useful for exercising the repository without a running database.

use async_trait::async_trait;
use bson::{DateTime, Document};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{ListingError, Result};
use crate::traits::store::ListingStore;
use crate::types::{
    filter::Filter,
    listing::{Address, Listing, ListingId},
    outcome::{DeleteOutcome, InsertManyOutcome, UpdateOutcome},
    pipeline::Pipeline,
    query::{FindOptions, InsertMode},
};

/// Parse an RFC 3339 timestamp, panicking on bad input. Test data only.
pub fn date(rfc3339: &str) -> DateTime {
    DateTime::parse_rfc3339_str(rfc3339)
        .unwrap_or_else(|e| panic!("bad fixture date {rfc3339}: {e}"))
}

/// The listings the demo script creates.
pub fn sample_listings() -> Vec<Listing> {
    vec![
        Listing {
            summary: Some("A charming loft in Paris".into()),
            bedrooms: Some(1),
            bathrooms: Some(1.0),
            ..Listing::new("Lovely Loft")
        },
        Listing {
            summary: Some("Modern home with infinite views from the infinity pool".into()),
            property_type: Some("House".into()),
            bedrooms: Some(5),
            bathrooms: Some(4.5),
            beds: Some(5),
            ..Listing::new("Infinite Views")
        },
        Listing {
            property_type: Some("Apartment".into()),
            bedrooms: Some(1),
            ..Listing::new("Private room in London")
        },
        Listing {
            summary: Some("Enjoy relaxed beach living in this house with a private beach".into()),
            bedrooms: Some(4),
            bathrooms: Some(2.5),
            beds: Some(7),
            last_review: Some(date("2019-06-01T00:00:00Z")),
            ..Listing::new("Beautiful Beach House")
        },
    ]
}

/// A one-bedroom entire-home listing in a Sydney suburb.
pub fn sydney_listing(name: &str, suburb: &str, price: f64) -> Listing {
    Listing {
        bedrooms: Some(1),
        room_type: Some("Entire home/apt".into()),
        price: Some(price),
        address: Some(Address {
            suburb: Some(suburb.into()),
            market: Some("Sydney".into()),
            country: Some("Australia".into()),
            ..Default::default()
        }),
        ..Listing::new(name)
    }
}

/// Store whose every call fails with a storage error.
///
/// Counts calls so tests can assert an operation made exactly one
/// round-trip, or none when its arguments were rejected.
#[derive(Default)]
pub struct FailingStore {
    calls: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ListingError::Storage("connection reset by peer".into()))
    }
}

#[async_trait]
impl ListingStore for FailingStore {
    async fn insert_one(&self, _doc: Document) -> Result<ListingId> {
        self.fail()
    }

    async fn insert_many(&self, _docs: Vec<Document>, _mode: InsertMode) -> Result<InsertManyOutcome> {
        self.fail()
    }

    async fn find_one(&self, _filter: &Filter) -> Result<Option<Document>> {
        self.fail()
    }

    async fn find(&self, _filter: &Filter, _options: &FindOptions) -> Result<Vec<Document>> {
        self.fail()
    }

    async fn update_one(&self, _filter: &Filter, _set: &Document, _upsert: bool) -> Result<UpdateOutcome> {
        self.fail()
    }

    async fn update_many(&self, _filter: &Filter, _set: &Document) -> Result<UpdateOutcome> {
        self.fail()
    }

    async fn delete_one(&self, _filter: &Filter) -> Result<DeleteOutcome> {
        self.fail()
    }

    async fn delete_many(&self, _filter: &Filter) -> Result<DeleteOutcome> {
        self.fail()
    }

    async fn aggregate(&self, _pipeline: &Pipeline) -> Result<Vec<Document>> {
        self.fail()
    }
}
