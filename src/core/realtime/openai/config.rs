//! OpenAI Realtime API configuration types.
//!
//! This module contains configuration types for OpenAI's Realtime API:
//! - Voice selection
//! - Audio format configuration
//! - Response modalities

use serde::{Deserialize, Serialize};

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Beta protocol header value required by the preview models.
pub const OPENAI_BETA_HEADER: &str = "realtime=v1";

// =============================================================================
// Voices
// =============================================================================

/// Available voices for OpenAI Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAIRealtimeVoice {
    /// Alloy voice (default)
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
}

impl OpenAIRealtimeVoice {
    /// Parse a voice name. Returns `None` for unknown voices.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "alloy" => Some(Self::Alloy),
            "ash" => Some(Self::Ash),
            "ballad" => Some(Self::Ballad),
            "coral" => Some(Self::Coral),
            "echo" => Some(Self::Echo),
            "sage" => Some(Self::Sage),
            "shimmer" => Some(Self::Shimmer),
            "verse" => Some(Self::Verse),
            _ => None,
        }
    }
}

// =============================================================================
// Audio Formats
// =============================================================================

/// Audio formats used on the realtime session.
///
/// Phone calls use G.711 u-law end to end, so payloads pass through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenAIRealtimeAudioFormat {
    /// G.711 u-law (8-bit, 8kHz), the Twilio media stream encoding
    #[default]
    #[serde(rename = "g711_ulaw")]
    G711Ulaw,
}

impl OpenAIRealtimeAudioFormat {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::G711Ulaw => "g711_ulaw",
        }
    }
}

impl std::fmt::Display for OpenAIRealtimeAudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Modalities
// =============================================================================

/// Output modalities for OpenAI Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_parse() {
        assert_eq!(OpenAIRealtimeVoice::parse("SHIMMER"), Some(OpenAIRealtimeVoice::Shimmer));
        assert_eq!(OpenAIRealtimeVoice::parse(" echo "), Some(OpenAIRealtimeVoice::Echo));
        assert_eq!(OpenAIRealtimeVoice::parse("robot"), None);
    }

    #[test]
    fn test_audio_format_serialization() {
        assert_eq!(
            serde_json::to_string(&OpenAIRealtimeAudioFormat::G711Ulaw).unwrap(),
            r#""g711_ulaw""#
        );
        assert_eq!(OpenAIRealtimeAudioFormat::default().to_string(), "g711_ulaw");
    }

    #[test]
    fn test_modality_serialization() {
        let modalities = vec![Modality::Text, Modality::Audio];
        assert_eq!(
            serde_json::to_string(&modalities).unwrap(),
            r#"["text","audio"]"#
        );
    }
}
