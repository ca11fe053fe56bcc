//! Shared application state.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::bridge::{BridgeOptions, CallBridge, SessionInitializer};
use crate::core::instructions::InstructionFile;
use crate::core::provisioning::{
    NumberProvisioner, NumberRegistry, TwilioNumberProvisioner, TwilioProvisioningConfig,
};
use crate::core::realtime::{OpenAIRealtimeConnector, ProviderConnector, RealtimeConfig};

/// Why a media-stream connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLimitError {
    GlobalLimitReached,
    PerIpLimitReached,
}

pub struct AppState {
    pub config: ServerConfig,
    pub instructions: Arc<InstructionFile>,
    pub numbers: NumberRegistry,
    provisioner: Option<Arc<dyn NumberProvisioner>>,
    connector: Arc<dyn ProviderConnector>,
    initializer: SessionInitializer,
    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, u32>,
}

impl AppState {
    /// Build state with the OpenAI connector and, when configured, the Twilio
    /// provisioner.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let connector: Arc<dyn ProviderConnector> = Arc::new(OpenAIRealtimeConnector::new(
            RealtimeConfig::from_server_config(&config),
        ));

        let provisioner = TwilioProvisioningConfig::from_server_config(&config).and_then(
            |twilio| match TwilioNumberProvisioner::new(twilio) {
                Ok(p) => Some(Arc::new(p) as Arc<dyn NumberProvisioner>),
                Err(e) => {
                    warn!("Number provisioning unavailable: {}", e);
                    None
                }
            },
        );

        Self::with_components(config, connector, provisioner)
    }

    /// Build state around injected collaborators.
    pub fn with_components(
        config: ServerConfig,
        connector: Arc<dyn ProviderConnector>,
        provisioner: Option<Arc<dyn NumberProvisioner>>,
    ) -> Arc<Self> {
        let initializer = SessionInitializer::new(&RealtimeConfig::from_server_config(&config));
        let instructions = Arc::new(InstructionFile::new(config.instructions_path.clone()));
        info!(
            instructions = %config.instructions_path.display(),
            provider = connector.provider_name(),
            provisioning = provisioner.is_some(),
            "Application state ready"
        );

        Arc::new(Self {
            config,
            instructions,
            numbers: NumberRegistry::new(),
            provisioner,
            connector,
            initializer,
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        })
    }

    pub fn provisioner(&self) -> Option<&Arc<dyn NumberProvisioner>> {
        self.provisioner.as_ref()
    }

    /// A fresh coordinator for one incoming call.
    pub fn call_bridge(&self) -> CallBridge {
        CallBridge::new(
            self.connector.clone(),
            self.initializer.clone(),
            self.instructions.clone(),
        )
        .with_options(BridgeOptions {
            symmetric_shutdown: self.config.symmetric_shutdown,
            playback_marks: self.config.playback_marks,
        })
    }

    /// Reserve a media-stream slot for `ip`.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        let result = {
            let mut per_ip = self.ip_connections.entry(ip).or_insert(0);
            if *per_ip >= self.config.max_connections_per_ip {
                Err(ConnectionLimitError::PerIpLimitReached)
            } else if self.reserve_global_slot() {
                *per_ip += 1;
                Ok(())
            } else {
                Err(ConnectionLimitError::GlobalLimitReached)
            }
        };

        if result.is_err() {
            self.ip_connections.remove_if(&ip, |_, count| *count == 0);
        }
        result
    }

    fn reserve_global_slot(&self) -> bool {
        match self.config.max_websocket_connections {
            Some(max) => self
                .ws_connections
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    (current < max).then_some(current + 1)
                })
                .is_ok(),
            None => {
                self.ws_connections.fetch_add(1, Ordering::AcqRel);
                true
            }
        }
    }

    /// Return a slot taken by [`try_acquire_connection`](Self::try_acquire_connection).
    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        self.ip_connections
            .remove_if_mut(&ip, |_, count| {
                *count = count.saturating_sub(1);
                *count == 0
            });
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::Acquire)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> u32 {
        self.ip_connections.get(ip).map(|c| *c).unwrap_or(0)
    }
}

/// Releases a media-stream slot when dropped.
pub struct ConnectionGuard {
    state: Arc<AppState>,
    ip: IpAddr,
}

impl ConnectionGuard {
    pub fn new(state: Arc<AppState>, ip: IpAddr) -> Self {
        Self { state, ip }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.release_connection(self.ip);
    }
}
