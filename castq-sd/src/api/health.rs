//! Health check and build identification endpoints

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::AppContext;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// Build identification embedded by build.rs
#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "castq-sd".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /build_info
pub async fn get_build_info() -> Json<BuildInfo> {
    Json(BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
    })
}

/// Health and build info routes
pub fn health_routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_check))
        .route("/build_info", get(get_build_info))
}
