use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

/// GET /health
/// Liveness check with the current server time.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
        "service": env!("CARGO_PKG_NAME"),
    }))
}
