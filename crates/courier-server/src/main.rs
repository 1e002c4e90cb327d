mod config;

use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use courier_api::{AppState, AppStateInner};
use courier_db::Database;
use courier_gateway::dispatcher::Dispatcher;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=debug,courier_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.uses_placeholder_secret() {
        warn!("COURIER_JWT_SECRET is unset or a placeholder; tokens are forgeable");
    }

    let db = Arc::new(Database::open(&config.db_path)?);
    info!("Database ready at {}", config.db_path.display());

    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        token_ttl: chrono::Duration::days(config.token_ttl_days),
        max_thread_depth: config.max_thread_depth,
        dispatcher: dispatcher.clone(),
    });

    let app = courier_api::router(state)
        .layer(cors(&config)?)
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Courier server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    dispatcher.shutdown();
    Ok(())
}

fn cors(config: &Config) -> anyhow::Result<CorsLayer> {
    let Some(origins) = &config.allowed_origins else {
        return Ok(CorsLayer::permissive());
    };

    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any))
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
