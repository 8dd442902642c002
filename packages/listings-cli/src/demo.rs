//! Scripted walk through every operation, in the order a new collection
//! would see them. A failing step is logged and the script carries on.

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use listings::testing::sample_listings;
use listings::{
    report, InsertMode, ListingPatch, ListingRepository, MinimumsQuery, MongoConnection,
    MongoStore,
};

pub async fn run(connection: &MongoConnection, repo: &ListingRepository<MongoStore>) {
    step("list databases", async {
        anyhow::Ok(report::databases(&connection.database_names().await?))
    })
    .await;

    let mut listings = sample_listings();
    let loft = listings.remove(0);

    step("create listing", async {
        anyhow::Ok(repo.create_listing(&loft).await?.to_string())
    })
    .await;

    step("create listings", async {
        anyhow::Ok(repo
            .create_listings(&listings, InsertMode::Ordered)
            .await?
            .to_string())
    })
    .await;

    step("find by name", async {
        let found = repo.find_by_name("Infinite Views").await?;
        anyhow::Ok(report::found_by_name("Infinite Views", found.as_ref()))
    })
    .await;

    step("find with minimums", async {
        let query = MinimumsQuery::new()
            .with_min_bedrooms(4)
            .with_min_bathrooms(2.0)
            .with_max_results(5);
        let found = repo.find_with_minimums(&query).await?;
        anyhow::Ok(report::minimums(&query, &found))
    })
    .await;

    step("update by name", async {
        let patch = ListingPatch {
            bedrooms: Some(6),
            beds: Some(8),
            ..Default::default()
        };
        anyhow::Ok(repo.update_by_name("Infinite Views", &patch).await?.to_string())
    })
    .await;

    step("upsert by name", async {
        let patch = ListingPatch {
            name: Some("Cozy Cottage".into()),
            bedrooms: Some(1),
            bathrooms: Some(1.0),
            ..Default::default()
        };
        anyhow::Ok(repo.upsert_by_name("Cozy Cottage", &patch).await?.to_string())
    })
    .await;

    step("fill missing property types", async {
        anyhow::Ok(repo.fill_missing_property_types().await?.to_string())
    })
    .await;

    step("delete by name", async {
        anyhow::Ok(repo.delete_by_name("Cozy Cottage").await?.to_string())
    })
    .await;

    step("delete scraped before", async {
        let cutoff = Utc
            .with_ymd_and_hms(2019, 2, 15, 0, 0, 0)
            .single()
            .context("invalid cutoff date")?;
        anyhow::Ok(repo.delete_scraped_before(cutoff).await?.to_string())
    })
    .await;

    step("cheapest suburbs", async {
        let rows = repo.cheapest_suburbs("Australia", "Sydney", 10).await?;
        anyhow::Ok(report::cheapest_suburbs("Australia", "Sydney", &rows))
    })
    .await;
}

async fn step<F>(name: &str, operation: F)
where
    F: std::future::Future<Output = Result<String>>,
{
    match operation.await {
        Ok(output) => println!("{output}"),
        Err(e) => tracing::error!(step = name, error = %format!("{e:#}"), "step failed"),
    }
}
