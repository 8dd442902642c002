//! Typed errors for the listings library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match on
//! what went wrong and keep going with independent operations.

use thiserror::Error;

use crate::types::outcome::InsertManyOutcome;

/// Errors that can occur during listing operations.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Store operation failed (network, timeout, server-side validation)
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A listing was rejected before reaching the store
    #[error("invalid listing: {reason}")]
    InvalidListing { reason: String },

    /// Operation parameters out of range
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// One or more records of a batch insert were rejected.
    ///
    /// Carries the full outcome so callers can see which records made it in
    /// and which were never attempted.
    #[error("batch insert failed: {0}")]
    InsertMany(InsertManyOutcome),

    /// Stored document did not match the listing shape
    #[error("decode error: {0}")]
    Decode(#[from] bson::de::Error),

    /// Listing could not be converted into a document
    #[error("encode error: {0}")]
    Encode(#[from] bson::ser::Error),
}

impl ListingError {
    /// Wrap any driver error as a storage error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ListingError::Storage(Box::new(err))
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        ListingError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_listing(reason: impl Into<String>) -> Self {
        ListingError::InvalidListing {
            reason: reason.into(),
        }
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for ListingError {
    fn from(err: mongodb::error::Error) -> Self {
        ListingError::storage(err)
    }
}

/// Result type alias for listing operations.
pub type Result<T> = std::result::Result<T, ListingError>;
