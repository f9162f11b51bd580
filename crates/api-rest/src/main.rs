//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging against a single mount. The workspace's main `adls-run`
//! binary serves the same router.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adls_core::{DataLakeFileSystem, MountConfig};

/// Main entry point for the ADLS REST API server
///
/// # Environment Variables
/// - `ADLS_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `STORAGE_ACCOUNT_URL` or `STORAGE_ACCOUNT_NAME`: account endpoint
/// - `STORAGE_ACCOUNT_KEY`: credential handed to the store client
/// - `STORAGE_FILESYSTEM`: file system name (default: "test")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the mount configuration is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("ADLS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let config = MountConfig::from_env()?;
    tracing::info!("-- Starting ADLS REST API on {} for {:?}", addr, config);

    let app = api_rest::router(Arc::new(DataLakeFileSystem::new(config)));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
