//! Telephony side of the bridge: Twilio media stream envelopes and TwiML.

mod messages;
mod twiml;

pub use messages::{
    MarkLabel, MediaChunk, OutboundEvent, OutboundMedia, RESPONSE_PART_MARK, StreamEvent,
    StreamStart,
};
pub use twiml::{MEDIA_STREAM_PATH, connect_stream_response, media_stream_url};
