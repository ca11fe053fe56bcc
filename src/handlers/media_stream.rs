//! Media stream WebSocket handler
//!
//! Twilio connects here after the call-control webhook answers with a
//! `<Connect><Stream>` instruction. The upgraded socket becomes the telephony
//! side of one [`CallBridge`](crate::core::bridge::CallBridge).

use axum::{
    Extension,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::transport::{FrameReader, FrameWriter, TransportError};
use crate::middleware::ClientIp;
use crate::state::{AppState, ConnectionGuard};

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// `GET /media-stream`
///
/// The admission slot reserved by the connection-limit middleware is held
/// until the call ends.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    let guard = client_ip.map(|Extension(ClientIp(ip))| ConnectionGuard::new(state.clone(), ip));
    debug!("Media stream upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_socket(socket, state, guard))
}

async fn handle_media_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    _guard: Option<ConnectionGuard>,
) {
    let (sink, stream) = socket.split();
    let bridge = state.call_bridge();
    let call_id = bridge.call_id().to_string();

    match bridge
        .run(
            Box::new(TelephonySocketReader { stream }),
            Box::new(TelephonySocketWriter { sink }),
        )
        .await
    {
        Ok(report) => match report.error {
            None => info!(call_id = %call_id, "Media stream closed"),
            Some(e) => warn!(call_id = %call_id, "Media stream closed after error: {}", e),
        },
        Err(e) => error!(call_id = %call_id, "Media stream rejected: {}", e),
    }
}

/// Read half of the telephony socket.
pub struct TelephonySocketReader {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl FrameReader for TelephonySocketReader {
    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    debug!("Telephony closed the connection: {:?}", frame);
                    return None;
                }
                Ok(Message::Binary(data)) => {
                    warn!(bytes = data.len(), "Ignoring binary frame from telephony");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Err(e) => return Some(Err(TransportError::WebSocket(e.to_string()))),
            }
        }
    }
}

/// Write half of the telephony socket.
pub struct TelephonySocketWriter {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl FrameWriter for TelephonySocketWriter {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink
            .send(Message::Close(None))
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))
    }
}
