//! OpenAI Realtime API WebSocket connector.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::config::OPENAI_BETA_HEADER;
use crate::core::realtime::base::{
    ProviderConnector, ProviderLink, RealtimeConfig, RealtimeError, RealtimeResult,
};
use crate::core::transport::{FrameReader, FrameWriter, TransportError};

type ProviderSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens authenticated WebSocket sessions against the OpenAI Realtime API.
#[derive(Debug, Clone)]
pub struct OpenAIRealtimeConnector {
    config: RealtimeConfig,
}

impl OpenAIRealtimeConnector {
    pub fn new(config: RealtimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    fn build_request(&self) -> RealtimeResult<tungstenite::handshake::client::Request> {
        if self.config.api_key.trim().is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let mut request = self
            .config
            .endpoint()
            .into_client_request()
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert("Authorization", bearer);
        headers.insert("OpenAI-Beta", HeaderValue::from_static(OPENAI_BETA_HEADER));

        Ok(request)
    }
}

#[async_trait]
impl ProviderConnector for OpenAIRealtimeConnector {
    async fn connect(&self) -> RealtimeResult<ProviderLink> {
        let request = self.build_request()?;

        let (socket, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| match e {
                tungstenite::Error::Http(ref response)
                    if response.status() == tungstenite::http::StatusCode::UNAUTHORIZED =>
                {
                    RealtimeError::AuthenticationFailed(e.to_string())
                }
                other => RealtimeError::ConnectionFailed(other.to_string()),
            })?;

        info!(model = %self.config.model, "Connected to OpenAI Realtime API");

        let (sink, stream) = socket.split();
        Ok(ProviderLink {
            reader: Box::new(ProviderSocketReader { stream }),
            writer: Box::new(ProviderSocketWriter { sink }),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Read half of the provider socket.
pub struct ProviderSocketReader {
    stream: SplitStream<ProviderSocket>,
}

#[async_trait]
impl FrameReader for ProviderSocketReader {
    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    debug!("Provider closed the connection: {:?}", frame);
                    return None;
                }
                Ok(Message::Binary(data)) => {
                    warn!(bytes = data.len(), "Ignoring binary frame from provider");
                }
                // Pongs are queued by tungstenite and flushed on the next write
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                    return None;
                }
                Err(e) => return Some(Err(TransportError::WebSocket(e.to_string()))),
            }
        }
    }
}

/// Write half of the provider socket.
pub struct ProviderSocketWriter {
    sink: SplitSink<ProviderSocket, Message>,
}

#[async_trait]
impl FrameWriter for ProviderSocketWriter {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink
            .close()
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))
    }
}
