use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::{debug, error, info, warn};

use super::error::{BridgeError, Side};
use super::session::CallSession;
use crate::core::realtime::ServerEvent;
use crate::core::telephony::{OutboundEvent, RESPONSE_PART_MARK};
use crate::core::transport::{ConnectionHandle, FrameReader};

/// Why the downlink loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownlinkExit {
    /// The provider connection ended or failed
    ProviderClosed,
    /// Audio could not be written to the telephony side
    TelephonyClosed,
}

/// Re-frame one provider audio delta as a telephony media envelope.
///
/// The payload is decoded and re-encoded so a corrupt delta never reaches the
/// caller.
pub fn translate_audio_delta(
    delta: &str,
    stream_sid: Option<&str>,
) -> Result<OutboundEvent, base64::DecodeError> {
    let audio = BASE64.decode(delta)?;
    Ok(OutboundEvent::media(
        stream_sid.map(str::to_string),
        BASE64.encode(audio),
    ))
}

/// Provider → telephony relay.
///
/// Forwards synthesized audio to the caller and logs diagnostic events. Ending
/// this loop does not close the telephony connection; the coordinator decides.
pub struct DownlinkRelay {
    session: Arc<CallSession>,
    telephony: ConnectionHandle,
    provider: ConnectionHandle,
    playback_marks: bool,
}

impl DownlinkRelay {
    pub fn new(
        session: Arc<CallSession>,
        telephony: ConnectionHandle,
        provider: ConnectionHandle,
    ) -> Self {
        Self {
            session,
            telephony,
            provider,
            playback_marks: false,
        }
    }

    /// Follow each forwarded frame with a `responsePart` mark.
    pub fn with_playback_marks(mut self, enabled: bool) -> Self {
        self.playback_marks = enabled;
        self
    }

    pub async fn run(
        self,
        mut provider: Box<dyn FrameReader>,
    ) -> Result<DownlinkExit, BridgeError> {
        loop {
            let text = match provider.next_text().await {
                Some(Ok(text)) => text,
                Some(Err(e)) => {
                    info!("Provider connection error: {}", e);
                    self.provider.mark_closed();
                    return Ok(DownlinkExit::ProviderClosed);
                }
                None => {
                    info!("Provider connection closed");
                    self.provider.mark_closed();
                    return Ok(DownlinkExit::ProviderClosed);
                }
            };

            let event = ServerEvent::parse(&text).map_err(|e| {
                warn!(payload = %text, "Malformed provider event: {}", e);
                BridgeError::malformed(Side::Provider, e)
            })?;

            if event.is_diagnostic() {
                info!(event_type = %event.kind, "Received event: {}", text);
            }

            if let Some(exit) = self.handle_event(&event).await? {
                return Ok(exit);
            }
        }
    }

    async fn handle_event(&self, event: &ServerEvent) -> Result<Option<DownlinkExit>, BridgeError> {
        let Some(delta) = event.audio_delta() else {
            return Ok(None);
        };

        if let Some(item_id) = event.item_id.as_deref()
            && self.session.observe_assistant_item(item_id)
        {
            debug!(item_id, "Assistant audio item started");
        }

        let stream_sid = self.session.stream_sid();
        // Undecodable audio ends the loop like any other malformed event
        let outbound = translate_audio_delta(delta, stream_sid).map_err(|e| {
            error!("Invalid base64 in audio delta: {}", e);
            BridgeError::malformed(Side::Provider, e)
        })?;

        if let Err(e) = self.telephony.send(outbound.to_json()?).await {
            info!("Telephony connection unavailable: {}", e);
            return Ok(Some(DownlinkExit::TelephonyClosed));
        }
        self.session.count_audio_delivered();

        if self.playback_marks
            && let Some(sid) = stream_sid
        {
            let mark = OutboundEvent::mark(sid.to_string(), RESPONSE_PART_MARK).to_json()?;
            if self.telephony.send(mark).await.is_err() {
                return Ok(Some(DownlinkExit::TelephonyClosed));
            }
            self.session.push_mark(RESPONSE_PART_MARK);
        }

        Ok(None)
    }
}
