// API Server Binary Entry Point
//
// Purpose: Start the Axum API server over the county reference data
// Usage: cargo run --features api --bin api_server

use county_impact_rust::{create_router, AppState, DashboardConfig};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "county_impact_rust=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");

    // Configuration from environment variables (DATA_DIR, COUNTY_TABLE, FACTOR_TABLE, BOUNDARY_FILE, PORT)
    let config = DashboardConfig::from_env();

    tracing::info!("Configuration:");
    tracing::info!("  DATA_DIR: {}", config.data_dir.display());
    tracing::info!("  County table: {}", config.county_table_path().display());
    tracing::info!("  Factor table: {}", config.factor_table_path().display());
    tracing::info!("  Boundaries: {}", config.boundary_path().display());
    tracing::info!("  PORT: {}", config.port);

    // Load reference data once; aborts if county or boundary data is missing
    let state = AppState::new(&config)?;
    tracing::info!("Application state initialized successfully");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
