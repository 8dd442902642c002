//! Storage implementations for the listings library.
//!
//! Available backends:
//! - `MemoryStore` - In-memory storage (always available)
//! - `MongoStore` - MongoDB collection (requires `mongodb` feature, on by default)

pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongo;

pub use memory::MemoryStore;

#[cfg(feature = "mongodb")]
pub use mongo::{MongoConnection, MongoStore, DEFAULT_COLLECTION, DEFAULT_DATABASE};
