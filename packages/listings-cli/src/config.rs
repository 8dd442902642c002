use anyhow::{Context, Result};
use dotenvy::dotenv;
use listings::{DEFAULT_COLLECTION, DEFAULT_DATABASE};
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub database: String,
    pub collection: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        if env::var("APP_ENV").as_deref() != Ok("production") {
            let _ = dotenv();
        }

        Ok(Self {
            mongodb_uri: env::var("MONGODB_TEST_CLUSTER")
                .context("MONGODB_TEST_CLUSTER must be set")?,
            database: env::var("LISTINGS_DATABASE")
                .unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            collection: env::var("LISTINGS_COLLECTION")
                .unwrap_or_else(|_| DEFAULT_COLLECTION.to_string()),
        })
    }
}
