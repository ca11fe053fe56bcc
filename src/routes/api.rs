use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, instructions, numbers, voice};
use crate::state::AppState;
use std::sync::Arc;

/// Create the REST router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route(
            "/incoming-call",
            get(voice::incoming_call).post(voice::incoming_call),
        )
        .route("/set-instruction", post(instructions::set_instruction))
        .route("/assign-twilio-number", post(numbers::assign_twilio_number))
        .layer(TraceLayer::new_for_http())
}
