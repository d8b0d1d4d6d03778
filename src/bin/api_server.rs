// HTTP API server binary for price-search

use anyhow::Result;
use price_search::api::{ApiServer, AppState};
use price_search::database_ops::db::Db;
use price_search::database_ops::exchange::StaticRates;
use price_search::database_ops::products::PgStore;
use price_search::database_ops::scrape::HttpScraper;
use price_search::orchestrator::ProductRetrieval;
use price_search::telemetry;
use price_search::util::client_log::ClientLog;
use price_search::util::env as env_util;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<()> {
    // Load dotenv/env once (safe to call multiple times)
    env_util::init_env();

    let environment = env_util::env_opt("APP_ENV");
    telemetry::init_tracing(telemetry::default_filter(environment.as_deref()))?;

    tracing::info!(environment = ?environment, "Initializing price-search API server");

    // Load configuration from environment
    let server = ApiServer::from_env()?;

    // Initialize database connection
    let database_url = env_util::db_url()?;
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 10u32);
    let migrate = env_util::env_flag("AUTO_MIGRATE", false);
    let db = Db::connect(&database_url, max_connections, migrate).await?;

    tracing::info!("Database connected successfully");

    let store = Arc::new(PgStore::new(db));
    let scraper = Arc::new(HttpScraper::from_env()?);
    let state = AppState {
        retrieval: ProductRetrieval::new(store.clone(), scraper),
        baskets: store,
        currency: Arc::new(StaticRates),
        client_log: ClientLog::new(server.log_dir.clone()),
    };

    // Start HTTP server
    server.run(state).await?;

    Ok(())
}
