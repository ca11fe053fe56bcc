//! Realtime speech provider module.
//!
//! This module opens the per-call provider connection and defines the wire
//! messages exchanged over it.
//!
//! # Architecture
//!
//! - `ProviderConnector` trait for provider abstraction, one connection per call
//! - `ProviderLink` hands back split read/write halves as transport frames
//! - `openai` implements the connector for the OpenAI Realtime API
//!
//! # Example
//!
//! ```rust,ignore
//! use callbridge_gateway::core::realtime::{OpenAIRealtimeConnector, ProviderConnector, RealtimeConfig};
//!
//! let connector = OpenAIRealtimeConnector::new(RealtimeConfig::from_server_config(&config));
//! let link = connector.connect().await?;
//! ```

mod base;
pub mod openai;

pub use base::{ProviderConnector, ProviderLink, RealtimeConfig, RealtimeError, RealtimeResult};
pub use openai::{
    ClientEvent, Modality, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat,
    OpenAIRealtimeConnector, OpenAIRealtimeVoice, ServerEvent, SessionConfig, TurnDetection,
};
