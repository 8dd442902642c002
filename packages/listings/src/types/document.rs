//! Helpers for reading BSON documents the way the store does: dotted field
//! paths and a single total order across value types.

use bson::{Bson, Document};
use std::cmp::Ordering;

/// Resolve a dotted path (`address.suburb`) against a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = doc.get(first)?;

    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Set a dotted path, creating missing intermediate documents.
///
/// Fails when an intermediate field exists but is not a document, the same
/// way the server refuses to create a field inside a scalar.
pub fn set_path(doc: &mut Document, path: &str, value: Bson) -> Result<(), String> {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !doc.contains_key(head) {
                doc.insert(head, Document::new());
            }
            match doc.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                Some(other) => Err(format!(
                    "Cannot create field '{}' in element {{{}: {}}}",
                    rest.split('.').next().unwrap_or(rest),
                    head,
                    other
                )),
                None => Ok(()),
            }
        }
    }
}

/// Numeric view of a value, if it is a number.
pub fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        Bson::Decimal128(d) => d.to_string().parse().ok(),
        _ => None,
    }
}

// Cross-type order used by the store when sorting mixed values.
fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) | Some(Bson::Undefined) => 1,
        Some(Bson::MinKey) => 0,
        Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_)) => 2,
        Some(Bson::String(_) | Bson::Symbol(_)) => 3,
        Some(Bson::Document(_)) => 4,
        Some(Bson::Array(_)) => 5,
        Some(Bson::Binary(_)) => 6,
        Some(Bson::ObjectId(_)) => 7,
        Some(Bson::Boolean(_)) => 8,
        Some(Bson::DateTime(_)) => 9,
        Some(Bson::Timestamp(_)) => 10,
        Some(Bson::RegularExpression(_)) => 11,
        Some(Bson::MaxKey) => 13,
        Some(_) => 12,
    }
}

/// Total order over optional values; missing sorts with null, before numbers.
pub fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    match (a, b) {
        (Some(x), Some(y)) => compare_same_rank(x, y),
        _ => Ordering::Equal,
    }
}

fn compare_same_rank(a: &Bson, b: &Bson) -> Ordering {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            (x.time, x.increment).cmp(&(y.time, y.increment))
        }
        (Bson::Array(x), Bson::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare(Some(l), Some(r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Bson::Document(x), Bson::Document(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                let ord = lk.cmp(rk).then_with(|| compare(Some(lv), Some(rv)));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => Ordering::Equal,
    }
}

/// Ordering for range operators, which only match within one type bracket
/// (numbers against numbers, dates against dates).
pub fn compare_in_bracket(a: &Bson, b: &Bson) -> Option<Ordering> {
    let rank = type_rank(Some(a));
    if rank != type_rank(Some(b)) || rank == 1 {
        return None;
    }
    Some(compare_same_rank(a, b))
}

/// Equality as the store applies it in filters: numbers compare by value
/// regardless of their width.
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Replace Decimal128 values with doubles, recursively.
///
/// The public sample dataset stores prices and bathroom counts as
/// Decimal128, which serde cannot decode into `f64`.
pub fn normalize_decimals(doc: Document) -> Document {
    doc.into_iter()
        .map(|(key, value)| (key, normalize_value(value)))
        .collect()
}

fn normalize_value(value: Bson) -> Bson {
    match value {
        Bson::Decimal128(d) => d
            .to_string()
            .parse::<f64>()
            .map(Bson::Double)
            .unwrap_or(Bson::Decimal128(d)),
        Bson::Document(inner) => Bson::Document(normalize_decimals(inner)),
        Bson::Array(items) => Bson::Array(items.into_iter().map(normalize_value).collect()),
        other => other,
    }
}
