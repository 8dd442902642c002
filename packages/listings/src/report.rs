//! Human-readable rendering of read results.
//!
//! Write outcomes render themselves through `Display`; the functions here
//! cover lookups, searches and the aggregation rows.

use bson::DateTime;
use std::fmt::Write;

use crate::types::{listing::Listing, pipeline::SuburbAverage, query::MinimumsQuery};

/// Review date in the short calendar form, e.g. `Tue Jan 01 2019`.
pub fn review_date(date: Option<DateTime>) -> String {
    match date {
        Some(d) => d.to_chrono().format("%a %b %d %Y").to_string(),
        None => "n/a".to_string(),
    }
}

fn listing_summary(listing: &Listing) -> String {
    let mut line = listing.name.clone();
    if let Some(id) = &listing.id {
        let _ = write!(line, " (_id: {id})");
    }
    if let Some(bedrooms) = listing.bedrooms {
        let _ = write!(line, ", bedrooms: {bedrooms}");
    }
    if let Some(bathrooms) = listing.bathrooms {
        let _ = write!(line, ", bathrooms: {bathrooms}");
    }
    if let Some(property_type) = &listing.property_type {
        let _ = write!(line, ", property type: {property_type}");
    }
    line
}

/// One line for a lookup by name.
pub fn found_by_name(name: &str, listing: Option<&Listing>) -> String {
    match listing {
        Some(listing) => format!(
            "Found a listing in the collection with the name '{}': {}",
            name,
            listing_summary(listing)
        ),
        None => format!("No listings found with the name '{}'", name),
    }
}

/// Summary line plus a numbered detail block per listing.
pub fn minimums(query: &MinimumsQuery, listings: &[Listing]) -> String {
    if listings.is_empty() {
        return format!(
            "No listings found with at least {} bedrooms and {} bathrooms",
            query.min_bedrooms, query.min_bathrooms
        );
    }

    let mut out = format!(
        "Found listing(s) with at least {} bedrooms and {} bathrooms:",
        query.min_bedrooms, query.min_bathrooms
    );

    for (i, listing) in listings.iter().enumerate() {
        let id = listing
            .id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let bedrooms = listing.bedrooms.map(|b| b.to_string()).unwrap_or_default();
        let bathrooms = listing.bathrooms.map(|b| b.to_string()).unwrap_or_default();

        let _ = write!(
            out,
            "\n\n{}. name: {}\n   _id: {}\n   bedrooms: {}\n   bathrooms: {}\n   most recent review date: {}",
            i + 1,
            listing.name,
            id,
            bedrooms,
            bathrooms,
            review_date(listing.last_review)
        );
    }

    out
}

/// `<suburb>: <average price>`
pub fn suburb_average(row: &SuburbAverage) -> String {
    match row.average_price {
        Some(price) => format!("{}: {}", row.suburb, price),
        None => format!("{}: null", row.suburb),
    }
}

/// One line per aggregation row, or a notice when there are none.
pub fn cheapest_suburbs(country: &str, market: &str, rows: &[SuburbAverage]) -> String {
    if rows.is_empty() {
        return format!("No suburbs found for {market}, {country}");
    }
    rows.iter().map(suburb_average).collect::<Vec<_>>().join("\n")
}

/// `Databases:` header followed by one ` - name` line each.
pub fn databases(names: &[String]) -> String {
    let mut out = String::from("Databases:");
    for name in names {
        let _ = write!(out, "\n - {name}");
    }
    out
}
