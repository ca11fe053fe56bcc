use thiserror::Error;

use crate::core::realtime::RealtimeError;
use crate::core::transport::TransportError;

/// Which connection an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Telephony,
    Provider,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Telephony => write!(f, "telephony"),
            Side::Provider => write!(f, "provider"),
        }
    }
}

/// Errors that end a call or one of its relay loops.
///
/// Peer disconnects are not errors; the loops report them as exit reasons.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The provider connection could not be opened
    #[error("Failed to open provider connection: {0}")]
    ProviderConnect(#[from] RealtimeError),

    /// The session configuration could not be delivered
    #[error("Failed to send session configuration: {0}")]
    SessionInit(#[source] TransportError),

    /// An event was missing a required field or was not valid JSON
    #[error("Malformed {side} event: {reason}")]
    MalformedEvent { side: Side, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    pub(crate) fn malformed(side: Side, err: impl std::fmt::Display) -> Self {
        Self::MalformedEvent {
            side,
            reason: err.to_string(),
        }
    }

    /// Whether the call failed before relaying started.
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, Self::ProviderConnect(_) | Self::SessionInit(_))
    }
}
