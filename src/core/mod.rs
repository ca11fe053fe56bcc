pub mod bridge;
pub mod instructions;
pub mod provisioning;
pub mod realtime;
pub mod telephony;
pub mod transport;

// Re-export commonly used types for convenience
pub use bridge::{
    BridgeError, BridgeOptions, CallBridge, CallReport, CallSession, CallState, CallStats,
    SessionInitializer,
};

pub use instructions::{
    BusinessProfile, FALLBACK_INSTRUCTIONS, InstructionError, InstructionFile, InstructionSource,
};

pub use provisioning::{
    Assignment, NumberProvisioner, NumberRegistry, ProvisioningError, TwilioNumberProvisioner,
};

pub use realtime::{
    OpenAIRealtimeConnector, ProviderConnector, ProviderLink, RealtimeConfig, RealtimeError,
    RealtimeResult,
};

pub use transport::{ConnectionHandle, FrameReader, FrameWriter, TransportError};
