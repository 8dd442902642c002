//! Named operations over the listing collection.
//!
//! Each operation checks and defaults its parameters, makes one store call,
//! and returns a structured outcome. Nothing is cached between calls.

use bson::{Bson, DateTime};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::error::{ListingError, Result};
use crate::traits::store::ListingStore;
use crate::types::{
    filter::Filter,
    listing::{Listing, ListingPatch},
    outcome::{DeleteOutcome, InsertFailure, InsertManyOutcome, InsertOneOutcome, UpdateOutcome},
    pipeline::{Accumulator, Pipeline, Stage, SuburbAverage},
    query::{FindOptions, InsertMode, MinimumsQuery, Sort},
};

/// Room type the cheapest-suburbs report is restricted to.
pub const ENTIRE_HOME: &str = "Entire home/apt";

/// Placeholder written by [`ListingRepository::fill_missing_property_types`].
pub const UNKNOWN_PROPERTY_TYPE: &str = "Unknown";

/// Facade over one listing collection.
pub struct ListingRepository<S> {
    store: S,
}

impl<S: ListingStore> ListingRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Insert one listing.
    #[instrument(skip(self, listing), fields(name = %listing.name))]
    pub async fn create_listing(&self, listing: &Listing) -> Result<InsertOneOutcome> {
        listing.validate()?;
        let inserted_id = self.store.insert_one(listing.to_document()?).await?;

        info!(id = %inserted_id, "listing created");
        Ok(InsertOneOutcome { inserted_id })
    }

    /// Insert a batch of listings.
    ///
    /// Listings that fail local validation count as rejected records under
    /// the same `mode` rules as store rejections: in ordered mode nothing
    /// after the first rejection is attempted. Any rejection is returned as
    /// [`ListingError::InsertMany`] carrying the full outcome.
    #[instrument(skip(self, listings, mode), fields(count = listings.len(), ?mode))]
    pub async fn create_listings(
        &self,
        listings: &[Listing],
        mode: InsertMode,
    ) -> Result<InsertManyOutcome> {
        if listings.is_empty() {
            return Err(ListingError::invalid_argument("no listings to insert"));
        }

        let mut local_failures = Vec::new();
        let mut docs = Vec::with_capacity(listings.len());
        // Input position of each document sent to the store
        let mut positions = Vec::with_capacity(listings.len());

        for (index, listing) in listings.iter().enumerate() {
            match listing.validate().and_then(|_| listing.to_document()) {
                Ok(doc) => {
                    docs.push(doc);
                    positions.push(index);
                }
                Err(e) => {
                    local_failures.push(InsertFailure {
                        index,
                        message: e.to_string(),
                    });
                    if mode.is_ordered() {
                        break;
                    }
                }
            }
        }

        let sent = if docs.is_empty() {
            InsertManyOutcome::default()
        } else {
            self.store.insert_many(docs, mode).await?
        };

        // In ordered mode a store rejection happens before the local one, so
        // the local record was never reached.
        if mode.is_ordered() && !sent.failures.is_empty() {
            local_failures.clear();
        }

        let mut failures: Vec<InsertFailure> = sent
            .failures
            .into_iter()
            .map(|f| InsertFailure {
                index: positions[f.index],
                message: f.message,
            })
            .chain(local_failures)
            .collect();
        failures.sort_by_key(|f| f.index);

        let outcome = InsertManyOutcome {
            requested: listings.len(),
            inserted_ids: sent
                .inserted_ids
                .into_iter()
                .map(|(i, id)| (positions[i], id))
                .collect(),
            failures,
        };

        if outcome.failures.is_empty() {
            info!(inserted = outcome.inserted_count(), "listings created");
            Ok(outcome)
        } else {
            warn!(
                inserted = outcome.inserted_count(),
                failed = outcome.failures.len(),
                not_attempted = outcome.not_attempted().len(),
                "batch insert partially failed"
            );
            Err(ListingError::InsertMany(outcome))
        }
    }

    /// First listing with this exact name, if any.
    #[instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Listing>> {
        let found = self.store.find_one(&Filter::eq("name", name)).await?;
        debug!(found = found.is_some(), "lookup by name");
        found.map(Listing::from_document).transpose()
    }

    /// Listings with at least the given bedrooms and bathrooms, most
    /// recently reviewed first.
    #[instrument(skip(self))]
    pub async fn find_with_minimums(&self, query: &MinimumsQuery) -> Result<Vec<Listing>> {
        if !query.min_bathrooms.is_finite() || query.min_bathrooms < 0.0 {
            return Err(ListingError::invalid_argument(
                "minimum bathrooms must be a non-negative number",
            ));
        }
        if query.max_results == Some(0) {
            return Err(ListingError::invalid_argument(
                "maximum results must be at least 1",
            ));
        }

        let filter = Filter::gte("bedrooms", i64::from(query.min_bedrooms))
            .and(Filter::gte("bathrooms", query.min_bathrooms));
        let options = FindOptions {
            sort: Some(Sort::descending("last_review")),
            limit: query.max_results,
        };

        let docs = self.store.find(&filter, &options).await?;
        debug!(count = docs.len(), "listings above minimums");
        docs.into_iter().map(Listing::from_document).collect()
    }

    /// Apply `patch` to the first listing with this name.
    #[instrument(skip(self, patch))]
    pub async fn update_by_name(&self, name: &str, patch: &ListingPatch) -> Result<UpdateOutcome> {
        self.set_by_name(name, patch, false).await
    }

    /// Apply `patch` to the first listing with this name, inserting a new
    /// listing (name plus patch fields) when none exists.
    #[instrument(skip(self, patch))]
    pub async fn upsert_by_name(&self, name: &str, patch: &ListingPatch) -> Result<UpdateOutcome> {
        self.set_by_name(name, patch, true).await
    }

    async fn set_by_name(&self, name: &str, patch: &ListingPatch, upsert: bool) -> Result<UpdateOutcome> {
        if patch.is_empty() {
            return Err(ListingError::invalid_argument("update has no fields to set"));
        }
        if upsert && name.trim().is_empty() {
            return Err(ListingError::invalid_listing("name must not be empty"));
        }
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ListingError::invalid_listing("name must not be empty"));
        }

        let outcome = self
            .store
            .update_one(&Filter::eq("name", name), &patch.to_set_document()?, upsert)
            .await?;

        info!(
            matched = outcome.matched,
            modified = outcome.modified,
            upserted = outcome.upserted_id.is_some(),
            "listing updated"
        );
        Ok(outcome)
    }

    /// Set `field` to `default` on every listing that lacks it.
    #[instrument(skip(self, default))]
    pub async fn fill_missing_field(&self, field: &str, default: impl Into<Bson>) -> Result<UpdateOutcome> {
        if field.is_empty() || field.starts_with('$') || field == "_id" {
            return Err(ListingError::invalid_argument(format!(
                "cannot fill field '{field}'"
            )));
        }

        let mut set = bson::Document::new();
        set.insert(field, default.into());

        let outcome = self
            .store
            .update_many(&Filter::exists(field, false), &set)
            .await?;

        info!(matched = outcome.matched, modified = outcome.modified, "missing field filled");
        Ok(outcome)
    }

    /// Give every listing without a property type the type "Unknown".
    pub async fn fill_missing_property_types(&self) -> Result<UpdateOutcome> {
        self.fill_missing_field("property_type", UNKNOWN_PROPERTY_TYPE).await
    }

    /// Delete the first listing with this name.
    #[instrument(skip(self))]
    pub async fn delete_by_name(&self, name: &str) -> Result<DeleteOutcome> {
        let outcome = self.store.delete_one(&Filter::eq("name", name)).await?;
        info!(deleted = outcome.deleted, "listing deleted");
        Ok(outcome)
    }

    /// Delete every listing last scraped strictly before `cutoff`.
    #[instrument(skip(self))]
    pub async fn delete_scraped_before(&self, cutoff: chrono::DateTime<Utc>) -> Result<DeleteOutcome> {
        let filter = Filter::lt("last_scraped", DateTime::from_chrono(cutoff));
        let outcome = self.store.delete_many(&filter).await?;
        info!(deleted = outcome.deleted, "stale listings deleted");
        Ok(outcome)
    }

    /// The `limit` suburbs of a market with the lowest average price for
    /// one-bedroom, entire-home listings, cheapest first.
    #[instrument(skip(self))]
    pub async fn cheapest_suburbs(
        &self,
        country: &str,
        market: &str,
        limit: u64,
    ) -> Result<Vec<SuburbAverage>> {
        if limit == 0 {
            return Err(ListingError::invalid_argument("limit must be at least 1"));
        }

        let rows = self
            .store
            .aggregate(&cheapest_suburbs_pipeline(country, market, limit))
            .await?;
        debug!(rows = rows.len(), "cheapest suburbs computed");

        rows.into_iter()
            .map(|row| bson::from_document::<SuburbAverage>(row).map_err(ListingError::from))
            .collect()
    }
}

/// Pipeline behind [`ListingRepository::cheapest_suburbs`].
pub fn cheapest_suburbs_pipeline(country: &str, market: &str, limit: u64) -> Pipeline {
    let eligible = Filter::eq("bedrooms", 1)
        .and(Filter::eq("address.country", country))
        .and(Filter::eq("address.market", market))
        .and(Filter::exists("address.suburb", true))
        .and(Filter::ne("address.suburb", ""))
        .and(Filter::eq("room_type", ENTIRE_HOME));

    Pipeline::new()
        .then(Stage::Match(eligible))
        .then(Stage::Group {
            key: "address.suburb".into(),
            accumulator: Accumulator::avg("averagePrice", "price"),
        })
        .then(Stage::Sort(Sort::ascending("averagePrice")))
        .then(Stage::Limit(limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn cheapest_suburbs_pipeline_matches_store_syntax() {
        let stages = cheapest_suburbs_pipeline("Australia", "Sydney", 10).to_documents();

        assert_eq!(
            stages,
            vec![
                doc! {
                    "$match": {
                        "bedrooms": 1,
                        "address.country": "Australia",
                        "address.market": "Sydney",
                        "address.suburb": { "$exists": true, "$ne": "" },
                        "room_type": "Entire home/apt",
                    }
                },
                doc! { "$group": { "_id": "$address.suburb", "averagePrice": { "$avg": "$price" } } },
                doc! { "$sort": { "averagePrice": 1 } },
                doc! { "$limit": 10_i64 },
            ]
        );
    }
}
