//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::routes;
use crate::db::{
    create_pool_with_options, ensure_schema, PgSessionProvider, PoolSettings, SessionProvider,
};
use crate::use_cases::ProductUseCases;

/// Default port, same as the usual ASGI development server
pub const DEFAULT_PORT: u16 = 8000;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            cors_permissive: false,
        }
    }
}

/// Shared application state
pub struct AppState<P> {
    /// Opens one session per request
    pub provider: P,
}

impl<P: SessionProvider> AppState<P> {
    /// Open a session and bind product use-cases to it.
    ///
    /// Handlers call this only after the request has been validated, so a
    /// rejected request never checks out a connection.
    pub async fn product_use_cases(&self) -> Result<ProductUseCases<P::Repo>, ApiError> {
        let repo = self.provider.open().await?;
        Ok(ProductUseCases::new(repo))
    }
}

/// Build the application router for a session provider.
pub fn build_router<P: SessionProvider>(provider: P, config: &ServerConfig) -> Router {
    let cors = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(localhost_origins(config.bind_addr.port()))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(routes::health::router::<P>())
        .merge(routes::products::router::<P>())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(AppState { provider }))
}

fn localhost_origins(port: u16) -> Vec<HeaderValue> {
    ["localhost", "127.0.0.1"]
        .iter()
        .filter_map(|host| format!("http://{}:{}", host, port).parse().ok())
        .collect()
}

/// Connect to PostgreSQL and make sure the products table exists.
pub async fn connect_database(
    database_url: &str,
    settings: &PoolSettings,
) -> Result<PgSessionProvider, ServerError> {
    let pool = create_pool_with_options(database_url, settings).await?;
    ensure_schema(&pool).await?;
    tracing::info!("Database ready ({} max connections)", settings.max_connections());
    Ok(PgSessionProvider::new(pool))
}

/// Run the HTTP server until a shutdown signal arrives.
///
/// # Example
///
/// ```ignore
/// let provider = connect_database(&database_url, &PoolSettings::default()).await?;
/// run_server(provider, ServerConfig::default()).await?;
/// ```
pub async fn run_server<P: SessionProvider>(
    provider: P,
    config: ServerConfig,
) -> Result<(), ServerError> {
    let app = build_router(provider, &config);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database bootstrap failed: {0}")]
    Database(#[from] sqlx::Error),
}
