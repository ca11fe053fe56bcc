//! Call Bridge Coordinator.
//!
//! One [`CallBridge`] drives one phone call through
//! `Connecting → Relaying → Closed`. It opens the provider connection, sends
//! the session configuration, runs the uplink and downlink loops as two tasks
//! and closes both connections once the call is over.
//!
//! Shutdown follows the loop that ends first:
//! - uplink ends (caller hung up): the uplink has already closed the provider,
//!   and the downlink task is cancelled.
//! - downlink ends (provider went away): the caller is left connected and the
//!   coordinator waits for the telephony side to hang up, unless symmetric
//!   shutdown is enabled, the telephony side is already gone, or the downlink
//!   failed on a malformed event. In those cases both connections are closed
//!   immediately and the uplink task is cancelled.

use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::downlink::{DownlinkExit, DownlinkRelay};
use super::error::BridgeError;
use super::initializer::SessionInitializer;
use super::session::{CallSession, CallStats};
use super::uplink::{UplinkExit, UplinkRelay};
use crate::core::instructions::InstructionSource;
use crate::core::realtime::ProviderConnector;
use crate::core::transport::{ConnectionHandle, FrameReader, FrameWriter};

/// Lifecycle state of a call. There is no way back to an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Provider connection being opened and configured
    Connecting,
    /// Both relay loops running
    Relaying,
    /// Both connections closed
    Closed,
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallState::Connecting => write!(f, "connecting"),
            CallState::Relaying => write!(f, "relaying"),
            CallState::Closed => write!(f, "closed"),
        }
    }
}

/// Per-call behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Close the telephony connection as soon as the provider goes away
    pub symmetric_shutdown: bool,
    /// Follow each forwarded audio frame with a playback mark
    pub playback_marks: bool,
}

/// Outcome of a call that reached the `Relaying` state.
#[derive(Debug)]
pub struct CallReport {
    pub call_id: String,
    pub stream_sid: Option<String>,
    /// Every state the call went through, in order
    pub states: Vec<CallState>,
    pub stats: CallStats,
    /// `None` when the uplink task was cancelled
    pub uplink: Option<UplinkExit>,
    /// `None` when the downlink task was cancelled
    pub downlink: Option<DownlinkExit>,
    /// First fatal error raised by either loop
    pub error: Option<BridgeError>,
}

impl CallReport {
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

/// Owns both connections of one call for its whole lifetime.
pub struct CallBridge {
    call_id: String,
    connector: Arc<dyn ProviderConnector>,
    initializer: SessionInitializer,
    instructions: Arc<dyn InstructionSource>,
    options: BridgeOptions,
    states: Vec<CallState>,
}

impl CallBridge {
    pub fn new(
        connector: Arc<dyn ProviderConnector>,
        initializer: SessionInitializer,
        instructions: Arc<dyn InstructionSource>,
    ) -> Self {
        Self {
            call_id: Uuid::new_v4().to_string(),
            connector,
            initializer,
            instructions,
            options: BridgeOptions::default(),
            states: vec![CallState::Connecting],
        }
    }

    pub fn with_options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn state(&self) -> CallState {
        self.states
            .last()
            .copied()
            .unwrap_or(CallState::Connecting)
    }

    fn transition(&mut self, next: CallState) {
        debug!(call_id = %self.call_id, from = %self.state(), to = %next, "Call state change");
        self.states.push(next);
    }

    /// Bridge an accepted telephony connection to a new provider session.
    ///
    /// Returns `Err` only when the call fails before relaying starts; the
    /// telephony connection is closed in that case. Errors raised while
    /// relaying are carried in the returned [`CallReport`].
    pub async fn run(
        mut self,
        telephony_reader: Box<dyn FrameReader>,
        telephony_writer: Box<dyn FrameWriter>,
    ) -> Result<CallReport, BridgeError> {
        let telephony = ConnectionHandle::new("telephony", telephony_writer);
        info!(call_id = %self.call_id, "Client connected");

        let (provider, provider_reader) = match self.open_provider().await {
            Ok(opened) => opened,
            Err(e) => {
                error!(call_id = %self.call_id, "Call setup failed: {}", e);
                telephony.close().await;
                self.transition(CallState::Closed);
                return Err(e);
            }
        };

        self.transition(CallState::Relaying);

        let session = Arc::new(CallSession::new(self.call_id.clone()));
        let span = info_span!("call", call_id = %self.call_id);

        let mut uplink = tokio::spawn(
            UplinkRelay::new(session.clone(), provider.clone())
                .run(telephony_reader)
                .instrument(span.clone()),
        );
        let mut downlink = tokio::spawn(
            DownlinkRelay::new(session.clone(), telephony.clone(), provider.clone())
                .with_playback_marks(self.options.playback_marks)
                .run(provider_reader)
                .instrument(span),
        );

        let mut error = None;
        let (uplink_exit, downlink_exit) = tokio::select! {
            joined = &mut uplink => {
                let uplink_exit = settle("uplink", joined, &mut error);
                downlink.abort();
                let downlink_exit = settle("downlink", downlink.await, &mut error);
                (uplink_exit, downlink_exit)
            }
            joined = &mut downlink => {
                let downlink_exit = settle("downlink", joined, &mut error);
                if self.should_end_call(downlink_exit, error.is_some()) {
                    telephony.close().await;
                    provider.close().await;
                    uplink.abort();
                } else {
                    info!(call_id = %self.call_id, "Provider closed, waiting for caller to hang up");
                }
                let uplink_exit = settle("uplink", uplink.await, &mut error);
                (uplink_exit, downlink_exit)
            }
        };

        telephony.close().await;
        provider.close().await;
        self.transition(CallState::Closed);

        let stats = session.stats();
        info!(
            call_id = %self.call_id,
            media_received = stats.media_received,
            audio_appended = stats.audio_appended,
            media_dropped = stats.media_dropped,
            audio_delivered = stats.audio_delivered,
            "Call ended"
        );

        Ok(CallReport {
            call_id: self.call_id,
            stream_sid: session.stream_sid().map(str::to_string),
            states: self.states,
            stats,
            uplink: uplink_exit,
            downlink: downlink_exit,
            error,
        })
    }

    /// Open the provider connection and send the session configuration.
    async fn open_provider(
        &self,
    ) -> Result<(ConnectionHandle, Box<dyn FrameReader>), BridgeError> {
        let link = self.connector.connect().await?;
        info!(
            call_id = %self.call_id,
            provider = self.connector.provider_name(),
            "Connected to realtime provider"
        );

        let provider = ConnectionHandle::new("provider", link.writer);
        if let Err(e) = self
            .initializer
            .initialize(&provider, self.instructions.as_ref())
            .await
        {
            provider.close().await;
            return Err(e);
        }
        Ok((provider, link.reader))
    }

    fn should_end_call(&self, downlink: Option<DownlinkExit>, failed: bool) -> bool {
        self.options.symmetric_shutdown
            || failed
            || matches!(downlink, Some(DownlinkExit::TelephonyClosed))
    }
}

/// Collect a relay task's result, keeping the first error.
fn settle<T>(
    relay: &'static str,
    joined: Result<Result<T, BridgeError>, JoinError>,
    error: &mut Option<BridgeError>,
) -> Option<T> {
    match joined {
        Ok(Ok(exit)) => Some(exit),
        Ok(Err(e)) => {
            warn!(relay, "Relay loop failed: {}", e);
            error.get_or_insert(e);
            None
        }
        Err(e) if e.is_cancelled() => None,
        Err(e) => {
            error!(relay, "Relay task panicked: {}", e);
            None
        }
    }
}
