//! WebSocket mock of the OpenAI Realtime API.
//!
//! Accepts connections on an ephemeral port, records every client event and
//! answers each `input_audio_buffer.append` with a `response.audio.delta`
//! echoing the appended audio.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// What the mock has observed so far.
#[derive(Debug, Default)]
pub struct RealtimeMockState {
    pub events: Mutex<Vec<Value>>,
    pub authorization: Mutex<Vec<String>>,
    pub connections: AtomicUsize,
    pub closed: AtomicUsize,
}

impl RealtimeMockState {
    pub fn events(&self) -> Vec<Value> {
        self.events.lock().clone()
    }

    pub fn events_of(&self, kind: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|e| e["type"] == kind)
            .collect()
    }

    pub fn closed_connections(&self) -> usize {
        self.closed.load(Ordering::Acquire)
    }
}

pub struct RealtimeMock {
    pub addr: SocketAddr,
    pub state: Arc<RealtimeMockState>,
    handle: JoinHandle<()>,
}

impl RealtimeMock {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(RealtimeMockState::default());

        let accept_state = state.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(stream, accept_state.clone()));
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/v1/realtime", self.addr)
    }
}

impl Drop for RealtimeMock {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<RealtimeMockState>) {
    let header_state = state.clone();
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if let Some(value) = request
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
        {
            header_state.authorization.lock().push(value.to_string());
        }
        Ok(response)
    };

    let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
        return;
    };
    state.connections.fetch_add(1, Ordering::AcqRel);
    let (mut write, mut read) = ws_stream.split();

    while let Some(message) = read.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };
        let Ok(event) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        state.events.lock().push(event.clone());

        let reply = match event["type"].as_str() {
            Some("session.update") => {
                json!({"type": "session.updated", "session": event["session"]})
            }
            Some("input_audio_buffer.append") => json!({
                "type": "response.audio.delta",
                "response_id": "resp_1",
                "item_id": "item_1",
                "output_index": 0,
                "content_index": 0,
                "delta": event["audio"],
            }),
            _ => continue,
        };
        if write
            .send(Message::Text(reply.to_string().into()))
            .await
            .is_err()
        {
            break;
        }
    }

    state.closed.fetch_add(1, Ordering::AcqRel);
}
