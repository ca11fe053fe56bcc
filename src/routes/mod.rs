use axum::{Router, middleware};
use std::sync::Arc;

use crate::middleware::connection_limit_middleware;
use crate::state::AppState;

pub mod api;
pub mod media;

/// REST routes plus the media stream route behind the connection limiter.
///
/// Transport-level layers (CORS, rate limiting, security headers) are added by
/// the binary.
pub fn create_router(state: Arc<AppState>) -> Router {
    let media_routes = media::create_media_router().layer(middleware::from_fn_with_state(
        state.clone(),
        connection_limit_middleware,
    ));

    api::create_api_router()
        .merge(media_routes)
        .with_state(state)
}
