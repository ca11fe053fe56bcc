//! TwiML call-control responses.

use std::fmt::Write;

/// Path of the media stream WebSocket route.
pub const MEDIA_STREAM_PATH: &str = "/media-stream";

const CONNECTING_PROMPT: &str = "Please wait while we connect your call";
const READY_PROMPT: &str = "OK you can start talking!";

/// Build the `wss://` URL Twilio should open its media stream to.
pub fn media_stream_url(host: &str) -> String {
    format!("wss://{host}{MEDIA_STREAM_PATH}")
}

/// TwiML answering an incoming call: two prompts, then a bidirectional stream.
pub fn connect_stream_response(stream_url: &str) -> String {
    let mut twiml = String::with_capacity(256);
    twiml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    twiml.push_str("<Response>");
    let _ = write!(twiml, "<Say>{}</Say>", escape_xml(CONNECTING_PROMPT));
    twiml.push_str(r#"<Pause length="1"/>"#);
    let _ = write!(twiml, "<Say>{}</Say>", escape_xml(READY_PROMPT));
    let _ = write!(
        twiml,
        r#"<Connect><Stream url="{}"/></Connect>"#,
        escape_xml(stream_url)
    );
    twiml.push_str("</Response>");
    twiml
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
