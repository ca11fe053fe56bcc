//! Bidirectional relay between a telephony media stream and a realtime
//! provider session.
//!
//! - [`SessionInitializer`] configures the provider session once per call
//! - [`UplinkRelay`] forwards caller audio to the provider
//! - [`DownlinkRelay`] forwards synthesized audio to the caller
//! - [`CallBridge`] owns both connections and runs the two loops

mod coordinator;
mod downlink;
mod error;
mod initializer;
mod session;
mod uplink;

pub use coordinator::{BridgeOptions, CallBridge, CallReport, CallState};
pub use downlink::{DownlinkExit, DownlinkRelay, translate_audio_delta};
pub use error::{BridgeError, Side};
pub use initializer::SessionInitializer;
pub use session::{CallSession, CallStats};
pub use uplink::{UplinkExit, UplinkRelay};
