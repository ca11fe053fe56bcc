use tracing::{info, warn};

use super::error::BridgeError;
use crate::core::instructions::{FALLBACK_INSTRUCTIONS, InstructionSource};
use crate::core::realtime::{
    ClientEvent, Modality, OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice, RealtimeConfig,
    SessionConfig, TurnDetection,
};
use crate::core::transport::ConnectionHandle;

/// Builds and sends the one `session.update` each call starts with.
#[derive(Debug, Clone)]
pub struct SessionInitializer {
    voice: String,
    audio_format: OpenAIRealtimeAudioFormat,
    temperature: f32,
}

impl SessionInitializer {
    pub fn new(config: &RealtimeConfig) -> Self {
        if OpenAIRealtimeVoice::parse(&config.voice).is_none() {
            warn!(voice = %config.voice, "Unknown realtime voice, sending as configured");
        }
        Self {
            voice: config.voice.clone(),
            audio_format: OpenAIRealtimeAudioFormat::G711Ulaw,
            temperature: config.temperature,
        }
    }

    /// Session configuration for the given instruction text.
    pub fn session_config(&self, instructions: String) -> SessionConfig {
        SessionConfig {
            turn_detection: TurnDetection::server_vad(),
            input_audio_format: self.audio_format,
            output_audio_format: self.audio_format,
            voice: self.voice.clone(),
            instructions,
            modalities: vec![Modality::Text, Modality::Audio],
            temperature: self.temperature,
        }
    }

    /// Load instructions (falling back on failure) and send the session update.
    ///
    /// A send failure is a setup error; nothing is retried.
    pub async fn initialize(
        &self,
        provider: &ConnectionHandle,
        source: &dyn InstructionSource,
    ) -> Result<SessionConfig, BridgeError> {
        let instructions = match source.load().await {
            Ok(text) => text,
            Err(e) => {
                warn!("Instructions unavailable, using fallback: {}", e);
                FALLBACK_INSTRUCTIONS.to_string()
            }
        };

        let session = self.session_config(instructions);
        let event = ClientEvent::SessionUpdate {
            session: session.clone(),
        };
        let json = event.to_json()?;
        info!(
            voice = %session.voice,
            audio_format = %session.input_audio_format,
            "Sending session update"
        );

        provider
            .send(json)
            .await
            .map_err(BridgeError::SessionInit)?;

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::core::instructions::{InstructionFile, StaticInstructions};
    use crate::core::transport::testing::recording_writer;
    use serde_json::json;
    use tempfile::TempDir;

    fn initializer() -> SessionInitializer {
        let mut server = ServerConfig::default();
        server.openai_api_key = Some("sk-test".to_string());
        SessionInitializer::new(&RealtimeConfig::from_server_config(&server))
    }

    #[tokio::test]
    async fn test_sends_exactly_one_session_update() {
        let (recorded, writer) = recording_writer();
        let provider = ConnectionHandle::new("provider", Box::new(writer));
        let source = StaticInstructions("Answer as Acme Plumbing.".to_string());

        let session = initializer().initialize(&provider, &source).await.unwrap();
        assert_eq!(session.instructions, "Answer as Acme Plumbing.");

        let frames = recorded.json_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0],
            json!({
                "type": "session.update",
                "session": {
                    "turn_detection": {"type": "server_vad"},
                    "input_audio_format": "g711_ulaw",
                    "output_audio_format": "g711_ulaw",
                    "voice": "alloy",
                    "instructions": "Answer as Acme Plumbing.",
                    "modalities": ["text", "audio"],
                    "temperature": 0.8
                }
            })
        );
    }

    #[tokio::test]
    async fn test_missing_instructions_use_fallback() {
        let dir = TempDir::new().unwrap();
        let source = InstructionFile::new(dir.path().join("missing.txt"));
        let (recorded, writer) = recording_writer();
        let provider = ConnectionHandle::new("provider", Box::new(writer));

        let session = initializer().initialize(&provider, &source).await.unwrap();

        assert_eq!(session.instructions, FALLBACK_INSTRUCTIONS);
        assert_eq!(
            recorded.json_frames()[0]["session"]["instructions"],
            "No instructions available."
        );
    }

    #[tokio::test]
    async fn test_send_failure_is_setup_error() {
        let (_recorded, mut writer) = recording_writer();
        writer.fail_sends = true;
        let provider = ConnectionHandle::new("provider", Box::new(writer));
        let source = StaticInstructions(String::new());

        let err = initializer()
            .initialize(&provider, &source)
            .await
            .unwrap_err();
        assert!(err.is_setup_failure());
        assert!(matches!(err, BridgeError::SessionInit(_)));
    }
}
