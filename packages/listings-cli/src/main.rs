// Command-line entry point for the listings collection

mod config;
mod demo;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use listings::{
    report, InsertMode, Listing, ListingError, ListingPatch, ListingRepository, MinimumsQuery,
    MongoConnection, MongoStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "listings")]
#[command(about = "Work with the rental listings collection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the databases visible to the connection
    Databases,

    /// Insert one listing given as (extended) JSON
    Create { json: String },

    /// Insert a JSON array of listings
    CreateMany {
        json: String,

        /// Keep inserting after a rejected record
        #[arg(long)]
        unordered: bool,
    },

    /// Show the first listing with this exact name
    Find { name: String },

    /// Listings with at least the given rooms, most recently reviewed first
    FindMin {
        #[arg(long, default_value_t = 0)]
        bedrooms: u32,

        #[arg(long, default_value_t = 0.0)]
        bathrooms: f64,

        /// Maximum number of listings to show
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Set fields (JSON object) on the first listing with this name
    Update { name: String, json: String },

    /// Like `update`, inserting a listing when none has this name
    Upsert { name: String, json: String },

    /// Set a field on every listing that lacks it
    FillMissing {
        #[arg(long, default_value = "property_type")]
        field: String,

        /// Value to write; parsed as JSON when possible, otherwise a string
        #[arg(long, default_value = "Unknown")]
        value: String,
    },

    /// Delete the first listing with this name
    Delete { name: String },

    /// Delete listings last scraped before a date (YYYY-MM-DD, UTC midnight)
    DeleteBefore { date: NaiveDate },

    /// Suburbs with the lowest average price for one-bedroom entire homes
    CheapestSuburbs {
        #[arg(long, default_value = "Australia")]
        country: String,

        #[arg(long, default_value = "Sydney")]
        market: String,

        #[arg(long, default_value_t = 10)]
        limit: u64,
    },

    /// Run the full sequence of operations against the collection
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,listings=debug,mongodb=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        database = %config.database,
        collection = %config.collection,
        "Configuration loaded"
    );

    tracing::info!("Connecting to MongoDB...");
    let connection = MongoConnection::connect(&config.mongodb_uri)
        .await
        .context("Failed to connect to MongoDB")?;
    tracing::info!("MongoDB connected");

    let repo = ListingRepository::new(connection.listings(&config.database, &config.collection));
    let result = run(cli.command, &connection, &repo).await;

    connection.close().await;
    tracing::info!("Connection closed");

    result
}

async fn run(
    command: Commands,
    connection: &MongoConnection,
    repo: &ListingRepository<MongoStore>,
) -> Result<()> {
    match command {
        Commands::Databases => {
            let names = connection
                .database_names()
                .await
                .context("Failed to list databases")?;
            println!("{}", report::databases(&names));
        }
        Commands::Create { json } => {
            let listing = Listing::from_extended_json(parse_json(&json)?)?;
            println!("{}", repo.create_listing(&listing).await?);
        }
        Commands::CreateMany { json, unordered } => {
            let listings = parse_listings(&json)?;
            let mode = if unordered {
                InsertMode::Unordered
            } else {
                InsertMode::Ordered
            };
            match repo.create_listings(&listings, mode).await {
                Ok(outcome) => println!("{outcome}"),
                Err(ListingError::InsertMany(outcome)) => {
                    println!("{outcome}");
                    for failure in &outcome.failures {
                        tracing::warn!(index = failure.index, "{}", failure.message);
                    }
                    anyhow::bail!(
                        "{} listing(s) were not inserted",
                        outcome.requested - outcome.inserted_count()
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Find { name } => {
            let found = repo.find_by_name(&name).await?;
            println!("{}", report::found_by_name(&name, found.as_ref()));
        }
        Commands::FindMin {
            bedrooms,
            bathrooms,
            limit,
        } => {
            let mut query = MinimumsQuery::new()
                .with_min_bedrooms(bedrooms)
                .with_min_bathrooms(bathrooms);
            if let Some(limit) = limit {
                query = query.with_max_results(limit);
            }
            let found = repo.find_with_minimums(&query).await?;
            println!("{}", report::minimums(&query, &found));
        }
        Commands::Update { name, json } => {
            let patch = ListingPatch::from_extended_json(parse_json(&json)?)?;
            println!("{}", repo.update_by_name(&name, &patch).await?);
        }
        Commands::Upsert { name, json } => {
            let patch = ListingPatch::from_extended_json(parse_json(&json)?)?;
            println!("{}", repo.upsert_by_name(&name, &patch).await?);
        }
        Commands::FillMissing { field, value } => {
            println!("{}", repo.fill_missing_field(&field, parse_value(value)).await?);
        }
        Commands::Delete { name } => {
            println!("{}", repo.delete_by_name(&name).await?);
        }
        Commands::DeleteBefore { date } => {
            let cutoff = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
            println!("{}", repo.delete_scraped_before(cutoff).await?);
        }
        Commands::CheapestSuburbs {
            country,
            market,
            limit,
        } => {
            let rows = repo.cheapest_suburbs(&country, &market, limit).await?;
            println!("{}", report::cheapest_suburbs(&country, &market, &rows));
        }
        Commands::Demo => demo::run(connection, repo).await,
    }

    Ok(())
}

fn parse_json(json: &str) -> Result<serde_json::Value> {
    serde_json::from_str(json).context("Argument is not valid JSON")
}

fn parse_listings(json: &str) -> Result<Vec<Listing>> {
    let serde_json::Value::Array(items) = parse_json(json)? else {
        anyhow::bail!("Expected a JSON array of listings");
    };
    items
        .into_iter()
        .map(|item| Listing::from_extended_json(item).map_err(Into::into))
        .collect()
}

fn parse_value(raw: String) -> bson::Bson {
    serde_json::from_str::<serde_json::Value>(&raw)
        .ok()
        .and_then(|value| bson::Bson::try_from(value).ok())
        .unwrap_or(bson::Bson::String(raw))
}
