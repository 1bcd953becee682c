use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::server::ErMatchServer;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

/// Version information response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
}

/// Health check handler
pub async fn health_check(
    State(server): State<ErMatchServer>,
) -> Result<Json<HealthResponse>, StatusCode> {
    // A trivial round-trip to report database reachability.
    let status = match sqlx::query("SELECT 1").execute(&server.db_pool).await {
        Ok(_) => "healthy",
        Err(_) => "degraded",
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Version information handler
pub async fn version_info() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
