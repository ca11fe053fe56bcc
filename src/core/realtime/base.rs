//! Base types for realtime speech providers.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::core::transport::{FrameReader, FrameWriter};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while opening a realtime provider session.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Connection and session settings for a realtime provider.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: String,

    /// WebSocket endpoint without the model parameter
    pub url: String,

    /// Model to use (e.g., "gpt-4o-mini-realtime-preview-2024-12-17")
    pub model: String,

    /// Voice ID for audio output
    pub voice: String,

    /// Temperature for response generation
    pub temperature: f32,
}

impl RealtimeConfig {
    /// Derive provider settings from the server configuration.
    pub fn from_server_config(config: &ServerConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone().unwrap_or_default(),
            url: config.realtime_url.clone(),
            model: config.realtime_model.clone(),
            voice: config.realtime_voice.clone(),
            temperature: config.realtime_temperature,
        }
    }

    /// Full endpoint URL including the model query parameter.
    pub fn endpoint(&self) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}model={}", self.url, separator, self.model)
    }
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("api_key", &"<redacted>")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Drop for RealtimeConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.api_key.zeroize();
    }
}

// =============================================================================
// Connector Trait
// =============================================================================

/// Both halves of an open provider connection.
pub struct ProviderLink {
    pub reader: Box<dyn FrameReader>,
    pub writer: Box<dyn FrameWriter>,
}

/// Opens one provider connection per call.
#[async_trait]
pub trait ProviderConnector: Send + Sync {
    /// Open a new connection. No retries are attempted.
    async fn connect(&self) -> RealtimeResult<ProviderLink>;

    /// Provider name for logging.
    fn provider_name(&self) -> &'static str;
}
