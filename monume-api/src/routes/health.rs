/// Health check endpoint
///
/// Verifies that the server is running and the database answers.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "migrations_current": true,
///   "pool": {"active_connections": 1, "idle_connections": 4, "total_connections": 5},
///   "timestamp": "2025-01-01T12:00:00Z"
/// }
/// ```
///
/// Returns `503 Service Unavailable` with `"status": "unhealthy"` when the
/// database cannot be reached.

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use monume_shared::db::{migrations, pool};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,

    /// Whether every embedded migration has been applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations_current: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<pool::PoolStats>,

    pub timestamp: DateTime<Utc>,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let version = env!("CARGO_PKG_VERSION").to_string();

    if let Err(e) = pool::health_check(&state.db).await {
        tracing::error!(error = %e, "Health check failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy".to_string(),
                version,
                database: "disconnected".to_string(),
                migrations_current: None,
                pool: None,
                timestamp: Utc::now(),
            }),
        );
    }

    let migrations_current = match migrations::get_migration_status(&state.db).await {
        Ok(status) => Some(status.is_up_to_date()),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read migration status");
            None
        }
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version,
            database: "connected".to_string(),
            migrations_current,
            pool: Some(pool::get_pool_stats(&state.db)),
            timestamp: Utc::now(),
        }),
    )
}
