/// Health check endpoint
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
///   "storage": "postgres",
///   "database": "connected",
///   "pool": { "active_connections": 1, "idle_connections": 4 }
/// }
/// ```
///
/// `database` and `pool` are omitted with the in-memory store.

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tasktrack_shared::db::pool::{health_check as database_health_check, pool_stats, PoolStats};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    /// Application version
    pub version: String,

    /// Active storage backend
    pub storage: String,

    /// Database connectivity, PostgreSQL backend only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Connection pool occupancy, PostgreSQL backend only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (storage, database, pool) = match &state.db {
        Some(pool) => {
            let connected = database_health_check(pool).await.is_ok();
            let status = if connected { "connected" } else { "disconnected" };
            ("postgres", Some(status.to_string()), Some(pool_stats(pool)))
        }
        None => ("memory", None, None),
    };

    let healthy = database.as_deref() != Some("disconnected");

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: storage.to_string(),
        database,
        pool,
    })
}
