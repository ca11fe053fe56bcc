//! Twilio Media Streams envelopes.
//!
//! Inbound events arrive as JSON text frames tagged by `event`:
//! - connected - Socket handshake acknowledged
//! - start - Stream metadata, carries `start.streamSid`
//! - media - One audio chunk, `media.timestamp` and base64 `media.payload`
//! - mark - Playback checkpoint reached
//! - stop - Stream ended
//!
//! Unknown event kinds deserialize to [`StreamEvent::Other`] and are ignored by
//! the relay. A known kind with a missing required field is a parse error.

use serde::{Deserialize, Deserializer, Serialize};

/// Mark label attached after every forwarded audio frame.
pub const RESPONSE_PART_MARK: &str = "responsePart";

// =============================================================================
// Inbound Events
// =============================================================================

/// Inbound event from the telephony media stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum StreamEvent {
    Connected {
        #[serde(default)]
        protocol: Option<String>,
    },
    Start {
        start: StreamStart,
    },
    Media {
        media: MediaChunk,
    },
    Mark {
        #[serde(default)]
        mark: Option<MarkLabel>,
    },
    Stop {
        #[serde(default, rename = "streamSid")]
        stream_sid: Option<String>,
    },
    #[serde(other)]
    Other,
}

impl StreamEvent {
    /// Parse a raw text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Metadata carried by the `start` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamStart {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    #[serde(default, rename = "callSid")]
    pub call_sid: Option<String>,
    #[serde(default, rename = "accountSid")]
    pub account_sid: Option<String>,
}

/// One inbound audio chunk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaChunk {
    /// Milliseconds since the stream started. Twilio sends this as a string.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: u64,
    /// Base64 audio, already in the provider's input encoding.
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
}

/// Name carried by mark events in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkLabel {
    pub name: String,
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid media timestamp {s:?}: {e}"))),
    }
}

// =============================================================================
// Outbound Events
// =============================================================================

/// Outbound event written to the telephony media stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundEvent {
    /// Audio to play back to the caller
    Media {
        /// `null` when the stream has not started yet
        #[serde(rename = "streamSid")]
        stream_sid: Option<String>,
        media: OutboundMedia,
    },
    /// Playback checkpoint, echoed back by Twilio once reached
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkLabel,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

impl OutboundEvent {
    pub fn media(stream_sid: Option<String>, payload: String) -> Self {
        Self::Media {
            stream_sid,
            media: OutboundMedia { payload },
        }
    }

    pub fn mark(stream_sid: String, name: impl Into<String>) -> Self {
        Self::Mark {
            stream_sid,
            mark: MarkLabel { name: name.into() },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
