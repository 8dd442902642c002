//! Typed facade over a document collection of rental listings.
//!
//! Every operation turns a few typed parameters into a filter, update or
//! aggregation pipeline, makes one round-trip to the store, and hands back a
//! structured outcome whose `Display` is a one-line report.
//!
//! # Usage
//!
//! ```rust,ignore
//! use listings::{ListingRepository, MemoryStore, MinimumsQuery};
//!
//! let repo = ListingRepository::new(MemoryStore::new());
//! let roomy = repo
//!     .find_with_minimums(&MinimumsQuery::new().with_min_bedrooms(4).with_max_results(5))
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`types`] - Listings, filters, pipelines and outcomes
//! - [`traits`] - The `ListingStore` seam
//! - [`stores`] - `MemoryStore` and (with the `mongodb` feature) `MongoStore`
//! - [`repository`] - The named operations
//! - [`report`] - Rendering of read results
//! - [`testing`] - Fixtures and a failing store

pub mod error;
pub mod report;
pub mod repository;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{ListingError, Result};
pub use repository::{cheapest_suburbs_pipeline, ListingRepository};
pub use stores::MemoryStore;
pub use traits::ListingStore;
pub use types::{
    Accumulator, Address, DeleteOutcome, Direction, Filter, FindOptions, InsertFailure,
    InsertManyOutcome, InsertMode, InsertOneOutcome, Listing, ListingId, ListingPatch,
    MinimumsQuery, Pipeline, Sort, Stage, SuburbAverage, UpdateOutcome,
};

#[cfg(feature = "mongodb")]
pub use stores::{MongoConnection, MongoStore, DEFAULT_COLLECTION, DEFAULT_DATABASE};
