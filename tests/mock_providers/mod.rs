//! Mock provider servers for integration tests.
//!
//! - `realtime_mock` - OpenAI Realtime style WebSocket endpoint

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod realtime_mock;
