//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `instructions` - Business profile persistence
//! - `media_stream` - Telephony media stream WebSocket
//! - `numbers` - Twilio number provisioning
//! - `voice` - Call-control webhook returning TwiML

pub mod api;
pub mod instructions;
pub mod media_stream;
pub mod numbers;
pub mod voice;

pub use media_stream::media_stream_handler;
