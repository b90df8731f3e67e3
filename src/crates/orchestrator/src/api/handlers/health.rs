//! Service status endpoints

use axum::Json;
use serde_json::{json, Value};

/// Handler for GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "LexiLens API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

/// Handler for GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
