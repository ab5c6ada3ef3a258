//! Export server binary entry point.

use std::sync::Arc;

use clap::Parser;
use common::storage::factory::{create_object_store, create_storage};
use tracing_subscriber::EnvFilter;

use export::server::{CliArgs, ExportServer, ExportServerConfig};
use export::{
    ExportMetrics, ExportService, HttpSearchSource, ObjectFileStore, RateLimitedSearchSource,
    StorageSessionStore, load_config,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI arguments
    let args = CliArgs::parse();
    let config = load_config(&args.config).expect("Failed to load config");
    config.validate().expect("Invalid config");
    let server_config = ExportServerConfig::from(&args);

    tracing::info!(
        "Opening {} session store, exports go to {} served from {}",
        config.storage.backend_name(),
        config.file_store,
        config.export.url_prefix
    );
    if !config.storage.is_durable() {
        tracing::warn!("session store is not durable, interrupted exports cannot be restored");
    }

    let storage = create_storage(&config.storage)
        .await
        .expect("Failed to open session storage");
    let sessions = Arc::new(StorageSessionStore::new(storage));

    let object_store =
        create_object_store(&config.file_store).expect("Failed to open file store");
    let files = Arc::new(ObjectFileStore::new(object_store, config.export.url_prefix.clone()));

    let metrics = ExportMetrics::new();
    let search = HttpSearchSource::new(&config.search.url, config.search.timeout())
        .expect("Failed to create search client");
    let search = Arc::new(RateLimitedSearchSource::new(
        Arc::new(search),
        config.search.rate_limit(),
        metrics.clone(),
    ));

    let service = ExportService::new(&config.export, sessions, search, files, metrics.clone())
        .await
        .expect("Failed to start export service");

    let server = ExportServer::new(Arc::new(service), metrics, server_config);
    if let Err(e) = server.run().await {
        tracing::error!("server stopped: {}", e);
        std::process::exit(1);
    }
}
