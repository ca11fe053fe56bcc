//! Connection limit middleware for media stream connections
//!
//! This module provides middleware to enforce connection limits:
//! - Global maximum media stream connections
//! - Per-IP connection limits
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use callbridge_gateway::middleware::connection_limit_middleware;
//!
//! let app = Router::new()
//!     .route("/media-stream", get(media_stream_handler))
//!     .layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         connection_limit_middleware,
//!     ));
//! ```

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::state::{AppState, ConnectionLimitError};

/// Client address of an admitted media stream, inserted as a request
/// extension so the handler can return the slot when the call ends.
#[derive(Clone, Debug)]
pub struct ClientIp(pub IpAddr);

fn is_websocket_upgrade(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

/// Admit or refuse a media stream upgrade.
///
/// Refusals are `503 Service Unavailable` when the server-wide limit is
/// reached and `429 Too Many Requests` when the caller's address already holds
/// its share. Requests without an `Upgrade: websocket` header pass straight
/// through. The slot is released by the handler's
/// [`ConnectionGuard`](crate::state::ConnectionGuard) when the call ends, or
/// here when the upgrade is not completed.
pub async fn connection_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !is_websocket_upgrade(&request) {
        return next.run(request).await;
    }

    let ip = addr.ip();
    let rejection = match state.try_acquire_connection(ip) {
        Ok(()) => {
            debug!(
                ip = %ip,
                active = state.ws_connection_count(),
                "Media stream admitted"
            );
            request.extensions_mut().insert(ClientIp(ip));
            let response = next.run(request).await;
            // The handler's guard only exists once the upgrade is accepted
            if response.status() != StatusCode::SWITCHING_PROTOCOLS {
                state.release_connection(ip);
            }
            return response;
        }
        Err(ConnectionLimitError::GlobalLimitReached) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Server at capacity. Please try again later.",
        ),
        Err(ConnectionLimitError::PerIpLimitReached) => (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many connections from your IP address.",
        ),
    };

    warn!(ip = %ip, status = rejection.0.as_u16(), "Rejecting media stream connection");
    rejection.into_response()
}
