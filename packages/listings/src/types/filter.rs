//! Typed predicates over listing fields.
//!
//! A [`Filter`] renders to the store's filter document and can also be
//! evaluated in-process against a document, which is what the memory store
//! does.

use bson::{doc, Bson, Document};
use std::cmp::Ordering;

use super::document::{compare_in_bracket, lookup, values_equal};

/// Predicate over dotted field paths.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Bson),
    Ne(String, Bson),
    Gt(String, Bson),
    Gte(String, Bson),
    Lt(String, Bson),
    Lte(String, Bson),
    Exists(String, bool),
    Not(Box<Filter>),
    And(Vec<Filter>),
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Ne(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Gt(field.into(), value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Gte(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Lt(field.into(), value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Lte(field.into(), value.into())
    }

    pub fn exists(field: impl Into<String>, exists: bool) -> Self {
        Filter::Exists(field.into(), exists)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Conjunction, flattening nested `And`s.
    pub fn and(self, other: Filter) -> Self {
        let mut items = match self {
            Filter::And(items) => items,
            single => vec![single],
        };
        match other {
            Filter::And(more) => items.extend(more),
            single => items.push(single),
        }
        Filter::And(items)
    }

    /// Render as a store filter document.
    ///
    /// Conditions on the same field are merged into one operator document
    /// when their operators don't collide; otherwise the conjunction falls
    /// back to an explicit `$and`.
    pub fn to_document(&self) -> Document {
        match self {
            Filter::Eq(field, value) => doc! { field: value.clone() },
            Filter::Ne(field, value) => doc! { field: { "$ne": value.clone() } },
            Filter::Gt(field, value) => doc! { field: { "$gt": value.clone() } },
            Filter::Gte(field, value) => doc! { field: { "$gte": value.clone() } },
            Filter::Lt(field, value) => doc! { field: { "$lt": value.clone() } },
            Filter::Lte(field, value) => doc! { field: { "$lte": value.clone() } },
            Filter::Exists(field, exists) => doc! { field: { "$exists": *exists } },
            Filter::Not(inner) => negate(inner),
            Filter::And(items) => merge_conjunction(items),
        }
    }

    /// Evaluate against a document with the store's matching rules:
    /// range operators never match missing fields or values of another
    /// type, and array fields match if any element does.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq(field, value) => field_equals(doc, field, value),
            Filter::Ne(field, value) => !field_equals(doc, field, value),
            Filter::Gt(field, value) => field_compares(doc, field, value, |o| o.is_gt()),
            Filter::Gte(field, value) => field_compares(doc, field, value, |o| o.is_ge()),
            Filter::Lt(field, value) => field_compares(doc, field, value, |o| o.is_lt()),
            Filter::Lte(field, value) => field_compares(doc, field, value, |o| o.is_le()),
            Filter::Exists(field, exists) => lookup(doc, field).is_some() == *exists,
            Filter::Not(inner) => !inner.matches(doc),
            Filter::And(items) => items.iter().all(|item| item.matches(doc)),
        }
    }

    /// Top-level equality conditions. An upsert seeds the inserted
    /// document with these.
    pub fn equality_fields(&self) -> Vec<(&str, &Bson)> {
        match self {
            Filter::Eq(field, value) => vec![(field.as_str(), value)],
            Filter::And(items) => items.iter().flat_map(|f| f.equality_fields()).collect(),
            _ => Vec::new(),
        }
    }
}

fn negate(inner: &Filter) -> Document {
    match inner {
        Filter::Eq(field, value) => Filter::Ne(field.clone(), value.clone()).to_document(),
        Filter::Ne(field, value) => Filter::Eq(field.clone(), value.clone()).to_document(),
        Filter::Exists(field, exists) => Filter::Exists(field.clone(), !exists).to_document(),
        Filter::Not(twice) => twice.to_document(),
        Filter::Gt(field, _) | Filter::Gte(field, _) | Filter::Lt(field, _) | Filter::Lte(field, _) => {
            match inner.to_document().remove(field) {
                Some(operator) => doc! { field: { "$not": operator } },
                None => doc! { "$nor": [inner.to_document()] },
            }
        }
        Filter::And(_) => doc! { "$nor": [inner.to_document()] },
    }
}

fn is_operator_document(doc: &Document) -> bool {
    !doc.is_empty() && doc.keys().all(|k| k.starts_with('$'))
}

fn merge_conjunction(items: &[Filter]) -> Document {
    let mut merged = Document::new();

    for item in items {
        for (key, value) in item.to_document() {
            let Some(existing) = merged.get_mut(&key) else {
                merged.insert(key, value);
                continue;
            };

            match (existing, value) {
                (Bson::Document(current), Bson::Document(incoming))
                    if is_operator_document(current)
                        && is_operator_document(&incoming)
                        && incoming.keys().all(|k| !current.contains_key(k)) =>
                {
                    current.extend(incoming);
                }
                _ => {
                    let clauses: Vec<Bson> = items
                        .iter()
                        .map(|f| Bson::Document(f.to_document()))
                        .collect();
                    return doc! { "$and": clauses };
                }
            }
        }
    }

    merged
}

fn field_equals(doc: &Document, field: &str, expected: &Bson) -> bool {
    match lookup(doc, field) {
        None => matches!(expected, Bson::Null),
        Some(Bson::Array(items)) => {
            items.iter().any(|item| values_equal(item, expected))
                || values_equal(&Bson::Array(items.clone()), expected)
        }
        Some(actual) => values_equal(actual, expected),
    }
}

fn field_compares(
    doc: &Document,
    field: &str,
    bound: &Bson,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    match lookup(doc, field) {
        None => false,
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| compare_in_bracket(item, bound).is_some_and(&accept)),
        Some(actual) => compare_in_bracket(actual, bound).is_some_and(accept),
    }
}
