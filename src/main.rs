use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenv::dotenv;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pathmind::api::{self, AppState};
use pathmind::services::{ArtifactStore, LifecycleConfig, ModelLifecycleManager, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pathmind=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pathmind...");

    let service_config = ServiceConfig::from_env();
    service_config
        .validate()
        .context("Invalid service configuration")?;

    let lifecycle_config = LifecycleConfig::from_env();
    lifecycle_config
        .validate()
        .context("Invalid lifecycle configuration")?;

    info!(
        "  - Forest: {} trees, max depth {:?}, seed {}",
        lifecycle_config.forest.n_estimators,
        lifecycle_config.forest.max_depth,
        lifecycle_config.forest.seed
    );
    info!(
        "  - Compression: {} (retain {})",
        lifecycle_config.compression_strategy, lifecycle_config.retain_fraction
    );
    info!("  - Default graph: {:?}", service_config.default_graph);

    let store = ArtifactStore::new(&service_config.artifact_dir);
    store
        .init()
        .with_context(|| format!("Failed to prepare {:?}", service_config.artifact_dir))?;

    let port = service_config.port;
    let lifecycle = ModelLifecycleManager::new(lifecycle_config, store);
    let state = Arc::new(AppState::new(service_config, lifecycle));

    // Configure CORS (permissive for development)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    let app = api::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("pathmind API server starting on http://{}", addr);
    api::print_routes();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("pathmind shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received...");
}
