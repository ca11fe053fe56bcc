use axum::Json;
use serde_json::{Value, json};

pub const HEALTH_MESSAGE: &str = "Twilio Media Stream Server is running!";

/// Liveness probe.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "message": HEALTH_MESSAGE }))
}
