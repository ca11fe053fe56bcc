//! Media stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::core::telephony::MEDIA_STREAM_PATH;
use crate::handlers::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream router
///
/// # Endpoint
///
/// `GET /media-stream` - WebSocket upgrade for a Twilio media stream
///
/// # Protocol
///
/// Twilio sends JSON text frames tagged by `event` (`connected`, `start`,
/// `media`, `mark`, `stop`). The server answers with `media` frames carrying
/// synthesized μ-law audio and, when enabled, `mark` frames.
///
/// Connection limits are applied by the caller with
/// [`connection_limit_middleware`](crate::middleware::connection_limit_middleware).
pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
