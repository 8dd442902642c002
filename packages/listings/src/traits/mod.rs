//! Trait abstractions.

pub mod store;

pub use store::ListingStore;
