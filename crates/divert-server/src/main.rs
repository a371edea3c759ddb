//! Diversion decision server - always-on backend for in-flight emergencies

use anyhow::Result;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use divert_server::config::Config;
use divert_server::state::AppState;
use divert_server::{api, loops};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_tracing(config.log_json)?;

    tracing::info!("Starting diversion decision server...");

    let resources = config.load_resources()?;
    let port = config.server_port;
    let state = Arc::new(AppState::new(config.clone(), resources));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start background loops
    let decision_loop = tokio::spawn(loops::decision_loop::run_decision_loop(
        state.clone(),
        shutdown_tx.subscribe(),
    ));

    // Build the app
    let app = api::routes(&config)
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(());
    if let Err(e) = decision_loop.await {
        tracing::warn!("Decision loop ended abnormally: {}", e);
    }
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("divert_server=debug".parse()?)
        .add_directive("divert_core=info".parse()?);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
