//! Test harness with testcontainers for MongoDB integration testing.
//!
//! One container is started on first use and shared by every test; each test
//! gets its own database so runs don't see each other's listings.

use anyhow::{Context, Result};
use bson::oid::ObjectId;
use listings::{ListingRepository, MongoConnection, MongoStore, DEFAULT_COLLECTION};
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mongo::Mongo;
use tokio::sync::OnceCell;

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    uri: String,
    // Keep the container alive for the entire test run
    _mongo: ContainerAsync<Mongo>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --ignored --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let mongo = Mongo::default()
            .start()
            .await
            .context("Failed to start MongoDB container")?;

        let host = mongo.get_host().await?;
        let port = mongo.get_host_port_ipv4(27017).await?;

        Ok(Self {
            uri: format!("mongodb://{}:{}", host, port),
            _mongo: mongo,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Per-test connection and private database.
pub struct MongoHarness {
    pub connection: MongoConnection,
    pub database: String,
}

impl AsyncTestContext for MongoHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.connection.close().await;
    }
}

impl MongoHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let connection = MongoConnection::connect(&infra.uri)
            .await
            .context("Failed to connect to test MongoDB")?;

        Ok(Self {
            connection,
            database: format!("listings_test_{}", ObjectId::new().to_hex()),
        })
    }

    pub fn store(&self) -> MongoStore {
        self.connection.listings(&self.database, DEFAULT_COLLECTION)
    }

    pub fn repository(&self) -> ListingRepository<MongoStore> {
        ListingRepository::new(self.store())
    }
}
