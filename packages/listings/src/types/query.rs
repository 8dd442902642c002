//! Sort, limit, and the parameter sets of the read operations.

use bson::{doc, Document};
use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn as_i32(self) -> i32 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

/// Single-key sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl Sort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    pub fn to_document(&self) -> Document {
        doc! { self.field.as_str(): self.direction.as_i32() }
    }
}

/// Options for a multi-document find.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: Option<Sort>,
    /// `None` is unbounded.
    pub limit: Option<u64>,
}

/// Parameters of the minimum-bedrooms/bathrooms search.
///
/// Defaults: no minimums and no result cap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinimumsQuery {
    #[serde(default)]
    pub min_bedrooms: u32,
    #[serde(default)]
    pub min_bathrooms: f64,
    #[serde(default)]
    pub max_results: Option<u64>,
}

impl MinimumsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_bedrooms(mut self, min: u32) -> Self {
        self.min_bedrooms = min;
        self
    }

    pub fn with_min_bathrooms(mut self, min: f64) -> Self {
        self.min_bathrooms = min;
        self
    }

    pub fn with_max_results(mut self, max: u64) -> Self {
        self.max_results = Some(max);
        self
    }
}

/// How a batch insert treats a failing record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertMode {
    /// Stop at the first failure; later records are never attempted.
    #[default]
    Ordered,
    /// Attempt every record; failures don't block the others.
    Unordered,
}

impl InsertMode {
    pub fn is_ordered(self) -> bool {
        matches!(self, InsertMode::Ordered)
    }
}
