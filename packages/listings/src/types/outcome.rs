//! Structured results of write operations.
//!
//! Each outcome's `Display` is its one-line human-readable report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::listing::ListingId;

/// Result of inserting one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOneOutcome {
    pub inserted_id: ListingId,
}

impl fmt::Display for InsertOneOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "New listing created with the following id: {}", self.inserted_id)
    }
}

/// A record the store rejected during a batch insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertFailure {
    /// Position in the input batch.
    pub index: usize,
    pub message: String,
}

/// Result of a batch insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertManyOutcome {
    /// Number of records handed to the store.
    pub requested: usize,
    /// Generated ids keyed by input position.
    pub inserted_ids: BTreeMap<usize, ListingId>,
    pub failures: Vec<InsertFailure>,
}

impl InsertManyOutcome {
    pub fn inserted_count(&self) -> usize {
        self.inserted_ids.len()
    }

    /// Ids in input order.
    pub fn ids(&self) -> Vec<&ListingId> {
        self.inserted_ids.values().collect()
    }

    /// Input positions that were neither inserted nor rejected, i.e. never
    /// attempted because an earlier record failed in ordered mode.
    pub fn not_attempted(&self) -> Vec<usize> {
        (0..self.requested)
            .filter(|i| !self.inserted_ids.contains_key(i))
            .filter(|i| !self.failures.iter().any(|f| f.index == *i))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.inserted_count() == self.requested
    }
}

impl fmt::Display for InsertManyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.inserted_ids.values().map(ToString::to_string).collect();
        write!(
            f,
            "{} new listing(s) created with the following id(s): [{}]",
            self.inserted_count(),
            ids.join(", ")
        )?;

        if !self.failures.is_empty() {
            let skipped = self.not_attempted().len();
            write!(f, "; {} failed", self.failures.len())?;
            if skipped > 0 {
                write!(f, ", {} not attempted", skipped)?;
            }
        }
        Ok(())
    }
}

/// Result of an update (optionally upserting).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
    /// Set when an upsert inserted a new document.
    pub upserted_id: Option<ListingId>,
}

impl UpdateOutcome {
    pub fn inserted_count(&self) -> u64 {
        u64::from(self.upserted_id.is_some())
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} document(s) matched the query criteria. ", self.matched)?;
        match &self.upserted_id {
            Some(id) => write!(f, "One document was inserted with the id {}", id),
            None => write!(f, "{} document(s) was/were updated.", self.modified),
        }
    }
}

/// Result of a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub deleted: u64,
}

impl fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} document(s) was/were deleted.", self.deleted)
    }
}
