use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adls_core::{DataLakeFileSystem, MountConfig};

/// Main entry point for the ADLS application
///
/// Resolves the mount from the environment and serves the REST API over it until Ctrl-C.
///
/// # Environment Variables
/// - `ADLS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `STORAGE_ACCOUNT_URL`: account endpoint, e.g. `https://acct.dfs.core.windows.net/`,
///   `file:///srv/lake` or `memory://`
/// - `STORAGE_ACCOUNT_NAME`: used to build the endpoint when no URL is given
/// - `STORAGE_ACCOUNT_KEY`: credential handed to the store client
/// - `STORAGE_FILESYSTEM`: file system name (default: "test")
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, binding or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("adls=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("ADLS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let config = MountConfig::from_env()?;

    tracing::info!("++ Starting ADLS REST on {}", rest_addr);
    tracing::info!("++ Mount {:?}", config);

    let fs = Arc::new(DataLakeFileSystem::new(config));
    let rest_app = api_rest::router(fs);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, rest_app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down ADLS REST");
        })
        .await?;

    Ok(())
}
