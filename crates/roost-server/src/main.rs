mod config;

use std::net::SocketAddr;

use anyhow::Context;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use roost_api::AppStateInner;
use roost_db::Database;

use crate::config::{Config, CorsOrigins};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roost=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)
        .with_context(|| format!("opening database at {}", config.db_path.display()))?;

    let state = AppStateInner::new(db, config.jwt_secret);

    let app = roost_api::router(state)
        .layer(cors_layer(&config.cors_origins)?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Roost server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Roost server stopped");
    Ok(())
}

fn cors_layer(origins: &CorsOrigins) -> anyhow::Result<CorsLayer> {
    match origins {
        CorsOrigins::Any => Ok(CorsLayer::permissive()),
        CorsOrigins::List(list) => {
            let origins = list
                .iter()
                .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin {o}")))
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok(CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
