pub mod handlers;
pub mod types;

pub use handlers::AppState;

use crate::{
    Result,
    config::Config,
    pipeline::{self, ComputeDevice},
};
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::root))
        .route("/docs", get(handlers::docs))
        .route("/models/:model_name/generate", post(handlers::generate))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    let device = pipeline::device::select();

    // A failed load leaves the server up and reporting unhealthy.
    let pipeline = match pipeline::load(&config.model, &device).await {
        Ok(pipeline) => {
            info!("Model loaded successfully for task {}", pipeline.task());
            Some(pipeline)
        }
        Err(e) => {
            error!("Error loading model: {}", e);
            None
        }
    };

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!(
        "Starting server in {} environment on {}",
        config.server.environment, addr
    );

    let app = build_router(AppState::new(config, ComputeDevice::of(&device), pipeline));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
