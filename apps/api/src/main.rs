mod config;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;
mod tailor;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::ApiKey;
use crate::routes::build_router;
use crate::state::AppState;
use crate::tailor::catalog::Catalog;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Resume catalogs: built-in dataset unless a file is configured
    let catalog = match &config.catalog_path {
        Some(path) => {
            let catalog = Catalog::from_json_file(path)?;
            info!("Catalog loaded from {path}");
            catalog
        }
        None => Catalog::builtin(),
    };
    info!(
        "Catalog: {} experiences, {} skills",
        catalog.experiences.len(),
        catalog.skills.len()
    );

    // The key is read per request; only warn here so the process still starts
    if ApiKey::from_env(&config.api_key_env).is_none() {
        warn!(
            "{} is not set; tailor requests will fail until it is",
            config.api_key_env
        );
    }

    info!(
        "Model fallback order: {} ({} attempts each, {}s request deadline)",
        config.models.join(" -> "),
        config.retry.max_attempts,
        config.request_timeout.as_secs()
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let state = AppState::new(config, Arc::new(catalog));

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // called from the static resume page

    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
