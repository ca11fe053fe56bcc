//! OpenAI Realtime API WebSocket message types.
//!
//! This module defines the subset of the Realtime protocol the phone bridge
//! speaks. All events are JSON-encoded text frames.
//!
//! # Protocol Overview
//!
//! Client events (sent to server):
//! - session.update - Configure the session once after connecting
//! - input_audio_buffer.append - Append one caller audio chunk
//!
//! Server events (received from server):
//! - response.audio.delta - Audio data chunk, relayed to the caller
//! - error, session.created, rate_limits.updated, response.done, ... - logged only
//!
//! Every other server event is parsed just far enough to read its `type`.

use serde::{Deserialize, Serialize};

use super::config::{Modality, OpenAIRealtimeAudioFormat};

/// Server event carrying a chunk of synthesized audio.
pub const AUDIO_DELTA_EVENT: &str = "response.audio.delta";

/// Server events worth logging in full.
pub const DIAGNOSTIC_EVENT_TYPES: &[&str] = &[
    "error",
    "response.content.done",
    "rate_limits.updated",
    "response.done",
    "input_audio_buffer.committed",
    "input_audio_buffer.speech_stopped",
    "input_audio_buffer.speech_started",
    "session.created",
];

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration sent once per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    pub turn_detection: TurnDetection,
    pub input_audio_format: OpenAIRealtimeAudioFormat,
    pub output_audio_format: OpenAIRealtimeAudioFormat,
    pub voice: String,
    pub instructions: String,
    pub modalities: Vec<Modality>,
    pub temperature: f32,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Audio prefix padding in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
}

impl TurnDetection {
    /// Server VAD with provider defaults.
    pub fn server_vad() -> Self {
        Self::ServerVad {
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
        }
    }
}

// =============================================================================
// Client Events
// =============================================================================

/// Client events sent to the OpenAI Realtime API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    /// Append base64 audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },
}

impl ClientEvent {
    /// Append an already-encoded audio payload without touching it.
    pub fn audio_append(payload: impl Into<String>) -> Self {
        Self::InputAudioBufferAppend {
            audio: payload.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// Server Events
// =============================================================================

/// Envelope of a server event.
///
/// Only `type` is required; the relay reads nothing else except on audio deltas.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    delta: Option<serde_json::Value>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub response_id: Option<String>,
}

impl ServerEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    #[inline]
    pub fn is_audio_delta(&self) -> bool {
        self.kind == AUDIO_DELTA_EVENT
    }

    #[inline]
    pub fn is_diagnostic(&self) -> bool {
        DIAGNOSTIC_EVENT_TYPES.contains(&self.kind.as_str())
    }

    /// Base64 audio carried by an audio delta event, if any.
    pub fn audio_delta(&self) -> Option<&str> {
        if !self.is_audio_delta() {
            return None;
        }
        self.delta.as_ref().and_then(|d| d.as_str())
    }
}
