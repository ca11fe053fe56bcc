//! Call-control webhook.
//!
//! Twilio requests this URL when a provisioned number receives a call. The
//! TwiML response greets the caller and connects the call audio to the media
//! stream endpoint on this host.

use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use http::uri::Authority;
use std::sync::Arc;
use tracing::info;

use crate::core::telephony::{connect_stream_response, media_stream_url};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// `GET|POST /incoming-call`
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let host = resolve_host(state.config.public_host.as_deref(), &headers)
        .ok_or_else(|| AppError::BadRequest("Missing Host header".to_string()))?;

    let stream_url = media_stream_url(&host);
    info!(stream_url = %stream_url, "Answering incoming call");

    Ok((
        [(header::CONTENT_TYPE, "application/xml")],
        connect_stream_response(&stream_url),
    )
        .into_response())
}

/// Host for the stream URL: the configured public host, else the request
/// `Host` header without its port.
fn resolve_host(public_host: Option<&str>, headers: &HeaderMap) -> Option<String> {
    if let Some(host) = public_host.filter(|h| !h.is_empty()) {
        return Some(host.to_string());
    }

    let raw = headers.get(header::HOST)?.to_str().ok()?;
    let authority: Authority = raw.parse().ok()?;
    let host = authority.host();
    (!host.is_empty()).then(|| host.to_string())
}
