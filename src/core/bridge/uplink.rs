use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::{BridgeError, Side};
use super::session::CallSession;
use crate::core::realtime::ClientEvent;
use crate::core::telephony::StreamEvent;
use crate::core::transport::{ConnectionHandle, FrameReader};

/// Why the uplink loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkExit {
    /// The telephony side closed the stream
    TelephonyClosed,
    /// The telephony socket failed
    TelephonyError,
}

/// Telephony → provider relay.
///
/// Reads media stream events, tracks stream lifecycle in the [`CallSession`]
/// and forwards caller audio as `input_audio_buffer.append` messages.
pub struct UplinkRelay {
    session: Arc<CallSession>,
    provider: ConnectionHandle,
}

impl UplinkRelay {
    pub fn new(session: Arc<CallSession>, provider: ConnectionHandle) -> Self {
        Self { session, provider }
    }

    /// Run until the telephony connection ends, then close the provider.
    pub async fn run(
        self,
        mut telephony: Box<dyn FrameReader>,
    ) -> Result<UplinkExit, BridgeError> {
        let result = self.relay(telephony.as_mut()).await;
        self.provider.close().await;
        result
    }

    async fn relay(&self, telephony: &mut dyn FrameReader) -> Result<UplinkExit, BridgeError> {
        loop {
            let text = match telephony.next_text().await {
                Some(Ok(text)) => text,
                Some(Err(e)) => {
                    info!("Telephony connection error: {}", e);
                    return Ok(UplinkExit::TelephonyError);
                }
                None => {
                    info!("Client disconnected.");
                    return Ok(UplinkExit::TelephonyClosed);
                }
            };

            let event = StreamEvent::parse(&text).map_err(|e| {
                warn!(payload = %text, "Malformed telephony event: {}", e);
                BridgeError::malformed(Side::Telephony, e)
            })?;

            self.handle_event(event).await?;
        }
    }

    pub(crate) async fn handle_event(&self, event: StreamEvent) -> Result<(), BridgeError> {
        match event {
            StreamEvent::Start { start } => {
                if self.session.set_stream_sid(start.stream_sid.as_str()) {
                    info!(stream_sid = %start.stream_sid, "Incoming stream has started");
                } else {
                    warn!(
                        stream_sid = %start.stream_sid,
                        current = ?self.session.stream_sid(),
                        "Ignoring repeated start event"
                    );
                }
            }
            StreamEvent::Media { media } => {
                self.session.count_media_received();
                self.session.record_media_timestamp(media.timestamp);

                if !self.provider.is_open() {
                    self.session.count_media_dropped();
                    return Ok(());
                }

                let json = ClientEvent::audio_append(media.payload).to_json()?;
                match self.provider.send(json).await {
                    Ok(()) => self.session.count_audio_appended(),
                    Err(e) => {
                        debug!("Dropping media frame, provider unavailable: {}", e);
                        self.session.count_media_dropped();
                    }
                }
            }
            StreamEvent::Mark { mark } => {
                let popped = self.session.pop_mark();
                debug!(
                    mark = ?mark.map(|m| m.name),
                    popped = ?popped,
                    "Playback mark acknowledged"
                );
            }
            StreamEvent::Stop { .. } => {
                info!("Incoming stream stopped");
            }
            StreamEvent::Connected { .. } | StreamEvent::Other => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::TransportError;
    use crate::core::transport::testing::{Recorded, channel_reader, recording_writer};
    use serde_json::json;

    fn relay() -> (Arc<CallSession>, Arc<Recorded>, ConnectionHandle, UplinkRelay) {
        let session = Arc::new(CallSession::new("call-test"));
        let (recorded, writer) = recording_writer();
        let provider = ConnectionHandle::new("provider", Box::new(writer));
        let relay = UplinkRelay::new(session.clone(), provider.clone());
        (session, recorded, provider, relay)
    }

    fn media(timestamp: u64, payload: &str) -> String {
        json!({
            "event": "media",
            "media": {"timestamp": timestamp.to_string(), "payload": payload}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_media_forwarded_verbatim_once_each() {
        let (session, recorded, _provider, relay) = relay();
        let (tx, reader) = channel_reader();

        tx.send(Ok(json!({"event": "start", "start": {"streamSid": "MZ1"}}).to_string()))
            .unwrap();
        tx.send(Ok(media(0, "AAA="))).unwrap();
        tx.send(Ok(media(20, "/w8="))).unwrap();
        drop(tx);

        let exit = relay.run(Box::new(reader)).await.unwrap();
        assert_eq!(exit, UplinkExit::TelephonyClosed);

        assert_eq!(
            recorded.json_frames(),
            vec![
                json!({"type": "input_audio_buffer.append", "audio": "AAA="}),
                json!({"type": "input_audio_buffer.append", "audio": "/w8="}),
            ]
        );
        assert_eq!(session.stream_sid(), Some("MZ1"));
        assert_eq!(session.latest_media_timestamp(), 20);
        assert_eq!(session.stats().audio_appended, 2);
    }

    #[tokio::test]
    async fn test_media_before_start_is_tolerated() {
        let (session, recorded, _provider, relay) = relay();

        relay
            .handle_event(StreamEvent::parse(&media(5, "AAA=")).unwrap())
            .await
            .unwrap();

        assert_eq!(session.stream_sid(), None);
        assert_eq!(recorded.frames().len(), 1);
    }

    #[tokio::test]
    async fn test_media_dropped_when_provider_closed() {
        let (session, recorded, provider, relay) = relay();
        provider.mark_closed();

        relay
            .handle_event(StreamEvent::parse(&media(40, "AAA=")).unwrap())
            .await
            .unwrap();

        assert!(recorded.frames().is_empty());
        assert_eq!(session.latest_media_timestamp(), 40);
        assert_eq!(session.stats().media_dropped, 1);
    }

    #[tokio::test]
    async fn test_timestamp_follows_last_event() {
        let (session, _recorded, _provider, relay) = relay();
        let mut previous = 0;
        for ts in [0u64, 20, 40, 60, 80, 100] {
            relay
                .handle_event(StreamEvent::parse(&media(ts, "AAA=")).unwrap())
                .await
                .unwrap();
            assert_eq!(session.latest_media_timestamp(), ts);
            assert!(session.latest_media_timestamp() >= previous);
            previous = ts;
        }
    }

    #[tokio::test]
    async fn test_mark_pops_fifo_and_empty_is_noop() {
        let (session, _recorded, _provider, relay) = relay();
        session.push_mark("first");
        session.push_mark("second");

        let mark = StreamEvent::parse(r#"{"event":"mark","mark":{"name":"responsePart"}}"#).unwrap();
        relay.handle_event(mark.clone()).await.unwrap();
        assert_eq!(session.pending_mark_count(), 1);
        assert_eq!(session.pop_mark().as_deref(), Some("second"));

        relay.handle_event(mark).await.unwrap();
        assert_eq!(session.pending_mark_count(), 0);
    }

    #[tokio::test]
    async fn test_repeated_start_keeps_first_stream_sid() {
        let (session, _recorded, _provider, relay) = relay();
        for sid in ["MZ1", "MZ2"] {
            let event = StreamEvent::parse(
                &json!({"event": "start", "start": {"streamSid": sid}}).to_string(),
            )
            .unwrap();
            relay.handle_event(event).await.unwrap();
        }
        assert_eq!(session.stream_sid(), Some("MZ1"));
    }

    #[tokio::test]
    async fn test_unknown_and_stop_events_ignored() {
        let (_session, recorded, provider, relay) = relay();
        let (tx, reader) = channel_reader();
        tx.send(Ok(r#"{"event":"connected","protocol":"Call"}"#.to_string()))
            .unwrap();
        tx.send(Ok(r#"{"event":"dtmf","dtmf":{"digit":"5"}}"#.to_string()))
            .unwrap();
        tx.send(Ok(r#"{"event":"stop","stop":{}}"#.to_string())).unwrap();
        drop(tx);

        relay.run(Box::new(reader)).await.unwrap();
        assert!(recorded.frames().is_empty());
        assert!(!provider.is_open());
    }

    #[tokio::test]
    async fn test_disconnect_closes_provider() {
        let (_session, recorded, provider, relay) = relay();
        let (tx, reader) = channel_reader();
        drop(tx);

        let exit = relay.run(Box::new(reader)).await.unwrap();
        assert_eq!(exit, UplinkExit::TelephonyClosed);
        assert!(!provider.is_open());
        assert!(recorded.is_closed());
    }

    #[tokio::test]
    async fn test_transport_error_is_disconnect() {
        let (_session, recorded, _provider, relay) = relay();
        let (tx, reader) = channel_reader();
        tx.send(Err(TransportError::WebSocket("reset".to_string())))
            .unwrap();

        let exit = relay.run(Box::new(reader)).await.unwrap();
        assert_eq!(exit, UplinkExit::TelephonyError);
        assert!(recorded.is_closed());
    }

    #[tokio::test]
    async fn test_malformed_event_fails_loop_and_closes_provider() {
        let (_session, recorded, _provider, relay) = relay();
        let (tx, reader) = channel_reader();
        tx.send(Ok(r#"{"event":"media","media":{"timestamp":"1"}}"#.to_string()))
            .unwrap();
        tx.send(Ok(media(20, "AAA="))).unwrap();

        let err = relay.run(Box::new(reader)).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::MalformedEvent {
                side: Side::Telephony,
                ..
            }
        ));
        assert!(recorded.frames().is_empty());
        assert!(recorded.is_closed());
    }
}
