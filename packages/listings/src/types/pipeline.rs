//! Aggregation pipelines: match, group, sort, limit.

use bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::document::{as_f64, compare, lookup};
use super::filter::Filter;
use super::query::{Direction, Sort};

/// Group accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accumulator {
    /// Mean of the numeric values of `field`; non-numeric values are skipped
    /// and a group with none yields null.
    Avg { output: String, field: String },
}

impl Accumulator {
    pub fn avg(output: impl Into<String>, field: impl Into<String>) -> Self {
        Accumulator::Avg {
            output: output.into(),
            field: field.into(),
        }
    }
}

/// One pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Group {
        /// Field path whose value becomes the group's `_id`.
        key: String,
        accumulator: Accumulator,
    },
    Sort(Sort),
    Limit(u64),
}

impl Stage {
    pub fn to_document(&self) -> Document {
        match self {
            Stage::Match(filter) => doc! { "$match": filter.to_document() },
            Stage::Group { key, accumulator } => {
                let Accumulator::Avg { output, field } = accumulator;
                doc! {
                    "$group": {
                        "_id": format!("${key}"),
                        output.as_str(): { "$avg": format!("${field}") },
                    }
                }
            }
            Stage::Sort(sort) => doc! { "$sort": sort.to_document() },
            Stage::Limit(n) => doc! { "$limit": i64::try_from(*n).unwrap_or(i64::MAX) },
        }
    }
}

/// Ordered sequence of stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn to_documents(&self) -> Vec<Document> {
        self.stages.iter().map(Stage::to_document).collect()
    }

    /// Run the stages in-process over a document set.
    pub fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        for stage in &self.stages {
            docs = match stage {
                Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
                Stage::Group { key, accumulator } => group(docs, key, accumulator),
                Stage::Sort(sort) => {
                    sort_documents(&mut docs, sort);
                    docs
                }
                Stage::Limit(n) => docs
                    .into_iter()
                    .take(usize::try_from(*n).unwrap_or(usize::MAX))
                    .collect(),
            };
        }
        docs
    }
}

/// Stable sort by one key, using the store's cross-type order.
pub fn sort_documents(docs: &mut [Document], sort: &Sort) {
    docs.sort_by(|a, b| {
        let ord = compare(lookup(a, &sort.field), lookup(b, &sort.field));
        match sort.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    });
}

fn group(docs: Vec<Document>, key: &str, accumulator: &Accumulator) -> Vec<Document> {
    let Accumulator::Avg { output, field } = accumulator;
    // (group id, sum, count), in first-seen order
    let mut groups: Vec<(Bson, f64, u64)> = Vec::new();

    for doc in &docs {
        let id = lookup(doc, key).cloned().unwrap_or(Bson::Null);
        let value = lookup(doc, field).and_then(as_f64);

        let slot = match groups
            .iter()
            .position(|(existing, _, _)| compare(Some(existing), Some(&id)) == Ordering::Equal)
        {
            Some(index) => index,
            None => {
                groups.push((id, 0.0, 0));
                groups.len() - 1
            }
        };

        if let Some(v) = value {
            groups[slot].1 += v;
            groups[slot].2 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(id, sum, count)| {
            let average = if count == 0 {
                Bson::Null
            } else {
                Bson::Double(sum / count as f64)
            };
            doc! { "_id": id, output.as_str(): average }
        })
        .collect()
}

/// One row of the cheapest-suburbs report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuburbAverage {
    #[serde(rename = "_id")]
    pub suburb: String,
    #[serde(rename = "averagePrice", default)]
    pub average_price: Option<f64>,
}
