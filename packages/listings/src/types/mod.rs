//! Data types shared by the stores and the repository.

pub mod document;
pub mod filter;
pub mod listing;
pub mod outcome;
pub mod pipeline;
pub mod query;

pub use filter::Filter;
pub use listing::{Address, Listing, ListingId, ListingPatch};
pub use outcome::{DeleteOutcome, InsertFailure, InsertManyOutcome, InsertOneOutcome, UpdateOutcome};
pub use pipeline::{Accumulator, Pipeline, Stage, SuburbAverage};
pub use query::{Direction, FindOptions, InsertMode, MinimumsQuery, Sort};
