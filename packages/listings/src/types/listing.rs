//! Listing records as stored in the collection.

use bson::{oid::ObjectId, Bson, DateTime, Document};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use crate::error::{ListingError, Result};
use crate::types::document::as_f64;

/// Store-assigned identifier of a listing.
///
/// The public sample dataset keys listings by numeric strings while fresh
/// inserts get an ObjectId, so both shapes are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(Bson);

impl ListingId {
    /// Generate a fresh ObjectId-backed identifier.
    pub fn generate() -> Self {
        Self(Bson::ObjectId(ObjectId::new()))
    }

    pub fn as_bson(&self) -> &Bson {
        &self.0
    }

    pub fn into_bson(self) -> Bson {
        self.0
    }
}

impl From<Bson> for ListingId {
    fn from(value: Bson) -> Self {
        Self(value)
    }
}

impl From<ObjectId> for ListingId {
    fn from(value: ObjectId) -> Self {
        Self(Bson::ObjectId(value))
    }
}

impl From<&str> for ListingId {
    fn from(value: &str) -> Self {
        Self(Bson::String(value.to_string()))
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Bson::ObjectId(oid) => write!(f, "{}", oid.to_hex()),
            Bson::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other),
        }
    }
}

/// Counts written by other clients may arrive as longs or as doubles such
/// as `2.0`. Any whole number in `i32` range is accepted.
fn whole_number<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Bson>::deserialize(deserializer)? {
        None | Some(Bson::Null) => Ok(None),
        Some(Bson::Int32(n)) => Ok(Some(n)),
        Some(value) => as_f64(&value)
            .filter(|n| n.fract() == 0.0 && *n >= f64::from(i32::MIN) && *n <= f64::from(i32::MAX))
            .map(|n| Some(n as i32))
            .ok_or_else(|| D::Error::custom(format!("expected a whole number, found {value}"))),
    }
}

/// Nested address of a listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suburb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// A rental listing. Only `name` is required; stored documents may carry any
/// subset of the remaining fields, and unknown fields are ignored on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ListingId>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "whole_number"
    )]
    pub bedrooms: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "whole_number"
    )]
    pub beds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scraped: Option<DateTime>,
}

impl Listing {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Reject listings the store would accept but nothing could look up.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ListingError::invalid_listing("name must not be empty"));
        }
        Ok(())
    }

    pub fn to_document(&self) -> Result<Document> {
        Ok(bson::to_document(self)?)
    }

    pub fn from_document(doc: Document) -> Result<Self> {
        Ok(bson::from_document(doc)?)
    }

    /// Parse a listing from (relaxed or canonical) extended JSON, so dates
    /// can be written as `{"$date": "2019-02-15T00:00:00Z"}`.
    pub fn from_extended_json(value: serde_json::Value) -> Result<Self> {
        let bson = Bson::try_from(value)
            .map_err(|e| ListingError::invalid_listing(e.to_string()))?;
        Ok(bson::from_bson(bson)?)
    }
}

/// Partial listing applied with `$set`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "whole_number"
    )]
    pub bedrooms: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "whole_number"
    )]
    pub beds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scraped: Option<DateTime>,
}

impl ListingPatch {
    /// Fields to `$set`.
    pub fn to_set_document(&self) -> Result<Document> {
        Ok(bson::to_document(self)?)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn from_extended_json(value: serde_json::Value) -> Result<Self> {
        let bson = Bson::try_from(value)
            .map_err(|e| ListingError::invalid_argument(e.to_string()))?;
        Ok(bson::from_bson(bson)?)
    }
}
