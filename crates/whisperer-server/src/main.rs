use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use whisperer_client::live_service;
use whisperer_core::{SearchConfig, WhisperConfig};
use whisperer_server::routes;
use whisperer_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("whisperer=info".parse()?))
        .with_target(false)
        .init();

    let api_key = std::env::var("WHISPERER_SERVER_API_KEY")
        .context("WHISPERER_SERVER_API_KEY must be set")?;
    let port = std::env::var("WHISPERER_SERVER_PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");

    let config = WhisperConfig::from_env()?;
    let service = live_service(&config, SearchConfig::default(), true)?;
    let state = Arc::new(AppState::new(service, api_key));

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
