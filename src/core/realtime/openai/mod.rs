//! OpenAI Realtime API module.
//!
//! Speaks the `realtime=v1` beta protocol over a WebSocket:
//!
//! - `session.update` once per call with voice, codec and instructions
//! - `input_audio_buffer.append` for every inbound caller chunk
//! - `response.audio.delta` frames back, relayed to the caller
//!
//! # Audio Format
//!
//! Phone calls use G.711 u-law at 8kHz in both directions, the native Twilio
//! media stream encoding, so audio payloads are never transcoded.

mod client;
mod config;
mod messages;

pub use client::{OpenAIRealtimeConnector, ProviderSocketReader, ProviderSocketWriter};
pub use config::{
    Modality, OPENAI_BETA_HEADER, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat,
    OpenAIRealtimeVoice,
};
pub use messages::{
    AUDIO_DELTA_EVENT, ClientEvent, DIAGNOSTIC_EVENT_TYPES, ServerEvent, SessionConfig,
    TurnDetection,
};
