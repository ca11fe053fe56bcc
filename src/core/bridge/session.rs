//! Per-call correlation state shared by the two relay loops.
//!
//! Each field has a single writer: the uplink owns the stream id, media
//! timestamp and mark queue; the downlink owns the last assistant item. The
//! downlink also pushes playback marks when those are enabled, which is why the
//! queue sits behind a mutex rather than relying on single ownership.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

/// Correlation state for one phone call.
#[derive(Debug)]
pub struct CallSession {
    call_id: String,
    stream_sid: OnceLock<String>,
    latest_media_timestamp: AtomicU64,
    pending_marks: Mutex<VecDeque<String>>,
    last_assistant_item: ArcSwapOption<String>,
    stats: RelayCounters,
}

#[derive(Debug, Default)]
struct RelayCounters {
    media_received: AtomicU64,
    audio_appended: AtomicU64,
    media_dropped: AtomicU64,
    audio_delivered: AtomicU64,
}

/// Point-in-time view of a call's relay counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStats {
    /// Telephony media frames read
    pub media_received: u64,
    /// Append messages written to the provider
    pub audio_appended: u64,
    /// Media frames dropped because the provider was closed
    pub media_dropped: u64,
    /// Audio frames written to the telephony side
    pub audio_delivered: u64,
}

impl CallSession {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            stream_sid: OnceLock::new(),
            latest_media_timestamp: AtomicU64::new(0),
            pending_marks: Mutex::new(VecDeque::new()),
            last_assistant_item: ArcSwapOption::empty(),
            stats: RelayCounters::default(),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Stream identifier, absent until the `start` event arrives.
    pub fn stream_sid(&self) -> Option<&str> {
        self.stream_sid.get().map(String::as_str)
    }

    /// Store the stream identifier. Only the first call has any effect.
    ///
    /// Returns `false` if a stream id was already set.
    pub fn set_stream_sid(&self, sid: impl Into<String>) -> bool {
        self.stream_sid.set(sid.into()).is_ok()
    }

    pub fn latest_media_timestamp(&self) -> u64 {
        self.latest_media_timestamp.load(Ordering::Acquire)
    }

    /// Advance the media timestamp. A smaller value never moves it backwards.
    pub fn record_media_timestamp(&self, timestamp: u64) -> u64 {
        let previous = self
            .latest_media_timestamp
            .fetch_max(timestamp, Ordering::AcqRel);
        previous.max(timestamp)
    }

    pub fn push_mark(&self, name: impl Into<String>) {
        self.pending_marks.lock().push_back(name.into());
    }

    /// Remove the oldest outstanding mark. Empty queue is a no-op.
    pub fn pop_mark(&self) -> Option<String> {
        self.pending_marks.lock().pop_front()
    }

    pub fn pending_mark_count(&self) -> usize {
        self.pending_marks.lock().len()
    }

    pub fn last_assistant_item(&self) -> Option<Arc<String>> {
        self.last_assistant_item.load_full()
    }

    /// Record the assistant item currently producing audio.
    ///
    /// Returns `true` when this starts a new item.
    pub fn observe_assistant_item(&self, item_id: &str) -> bool {
        let current = self.last_assistant_item.load();
        if current.as_deref().map(String::as_str) == Some(item_id) {
            return false;
        }
        self.last_assistant_item
            .store(Some(Arc::new(item_id.to_string())));
        true
    }

    pub(crate) fn count_media_received(&self) {
        self.stats.media_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_audio_appended(&self) {
        self.stats.audio_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_media_dropped(&self) {
        self.stats.media_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_audio_delivered(&self) {
        self.stats.audio_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CallStats {
        CallStats {
            media_received: self.stats.media_received.load(Ordering::Relaxed),
            audio_appended: self.stats.audio_appended.load(Ordering::Relaxed),
            media_dropped: self.stats.media_dropped.load(Ordering::Relaxed),
            audio_delivered: self.stats.audio_delivered.load(Ordering::Relaxed),
        }
    }
}
