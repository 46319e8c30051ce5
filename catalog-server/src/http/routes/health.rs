//! Health check endpoint

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::db::SessionProvider;
use crate::http::server::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// GET /health - 503 when storage is unreachable
async fn health<P: SessionProvider>(
    State(state): State<Arc<AppState<P>>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (status, health, database) = match state.provider.ping().await {
        Ok(()) => (StatusCode::OK, "ok", "ok"),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
        }
    };

    (
        status,
        Json(HealthResponse {
            status: health,
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Health routes
pub fn router<P: SessionProvider>() -> Router<Arc<AppState<P>>> {
    Router::new().route("/health", get(health::<P>))
}
