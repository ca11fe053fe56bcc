//! Frame-level transport seam shared by both sides of a call.
//!
//! The relay loops never touch a concrete WebSocket type. The telephony socket
//! (axum) and the provider socket (tokio-tungstenite) are each split into a
//! [`FrameReader`] and a [`FrameWriter`]; write halves are wrapped in a
//! [`ConnectionHandle`] that carries the connection's open/closed flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Errors raised while moving frames over a connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection is already closed on our side.
    #[error("Connection closed")]
    Closed,

    /// Underlying WebSocket failure.
    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

/// Read half of a connection, yielding text frames.
#[async_trait]
pub trait FrameReader: Send {
    /// Wait for the next text frame.
    ///
    /// Returns `None` once the peer has closed the connection. Control frames
    /// are consumed internally and never surface here.
    async fn next_text(&mut self) -> Option<Result<String, TransportError>>;
}

/// Write half of a connection.
#[async_trait]
pub trait FrameWriter: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Shared, cloneable write handle with an open/closed flag.
///
/// Every clone refers to the same connection. Once the flag is cleared, sends
/// fail fast with [`TransportError::Closed`] and further closes are no-ops.
#[derive(Clone)]
pub struct ConnectionHandle {
    label: &'static str,
    writer: Arc<Mutex<Box<dyn FrameWriter>>>,
    open: Arc<AtomicBool>,
}

impl ConnectionHandle {
    pub fn new(label: &'static str, writer: Box<dyn FrameWriter>) -> Self {
        Self {
            label,
            writer: Arc::new(Mutex::new(writer)),
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Record that the peer went away without sending anything ourselves.
    ///
    /// Returns `true` if this call flipped the flag.
    pub fn mark_closed(&self) -> bool {
        self.open.swap(false, Ordering::AcqRel)
    }

    /// Send one text frame. A failed send marks the connection closed.
    pub async fn send(&self, text: String) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }

        let mut writer = self.writer.lock().await;
        match writer.send_text(text).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.open.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Close the connection. Closing an already-closed connection is a no-op.
    pub async fn close(&self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.close().await {
            debug!(connection = self.label, "Close after peer shutdown: {}", e);
        }
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("label", &self.label)
            .field("open", &self.is_open())
            .finish()
    }
}

/// In-memory transports for exercising the relay loops without sockets.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex as SyncMutex;
    use tokio::sync::mpsc;

    /// Reader fed from an mpsc channel. Dropping the sender closes the "connection".
    pub struct ChannelReader {
        rx: mpsc::UnboundedReceiver<Result<String, TransportError>>,
    }

    pub fn channel_reader() -> (
        mpsc::UnboundedSender<Result<String, TransportError>>,
        ChannelReader,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, ChannelReader { rx })
    }

    #[async_trait]
    impl FrameReader for ChannelReader {
        async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
            self.rx.recv().await
        }
    }

    /// Everything a [`RecordingWriter`] has observed.
    #[derive(Default)]
    pub struct Recorded {
        pub frames: SyncMutex<Vec<String>>,
        pub closed: AtomicBool,
        pub close_calls: std::sync::atomic::AtomicUsize,
    }

    impl Recorded {
        pub fn frames(&self) -> Vec<String> {
            self.frames.lock().clone()
        }

        pub fn json_frames(&self) -> Vec<serde_json::Value> {
            self.frames()
                .iter()
                .map(|f| serde_json::from_str(f).expect("recorded frame is JSON"))
                .collect()
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::Acquire)
        }
    }

    /// Writer that records frames; optionally fails every send.
    pub struct RecordingWriter {
        pub recorded: Arc<Recorded>,
        pub fail_sends: bool,
        /// Dropped on close so a paired [`ChannelReader`] observes end-of-stream.
        pub on_close: Option<mpsc::UnboundedSender<Result<String, TransportError>>>,
    }

    pub fn recording_writer() -> (Arc<Recorded>, RecordingWriter) {
        let recorded = Arc::new(Recorded::default());
        (
            recorded.clone(),
            RecordingWriter {
                recorded,
                fail_sends: false,
                on_close: None,
            },
        )
    }

    #[async_trait]
    impl FrameWriter for RecordingWriter {
        async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
            if self.fail_sends {
                return Err(TransportError::WebSocket("send failed".to_string()));
            }
            self.recorded.frames.lock().push(text);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.recorded
                .close_calls
                .fetch_add(1, Ordering::AcqRel);
            self.recorded.closed.store(true, Ordering::Release);
            self.on_close.take();
            Ok(())
        }
    }
}
