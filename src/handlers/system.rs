use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET / - Service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "DevCamper API",
        "version": env!("CARGO_PKG_VERSION"),
        "api": "/api/v1",
        "endpoints": {
            "auth": "/api/v1/auth",
            "bootcamps": "/api/v1/bootcamps",
            "courses": "/api/v1/courses",
            "reviews": "/api/v1/reviews",
            "users": "/api/v1/users"
        }
    }))
}

/// GET /health - Liveness plus a store round trip
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    state.store.ping().await.map_err(|e| {
        tracing::warn!("Health check failed: {}", e);
        ApiError::service_unavailable("Database unavailable")
    })?;
    Ok(ApiResponse::success(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
