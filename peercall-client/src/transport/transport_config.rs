use peercall_core::IceServerConfig;
use peercall_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use serde::{Deserialize, Serialize};

/// Configuration for WebRTC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Gather candidates on loopback interfaces too.
    pub include_loopback: bool,
}

impl TransportConfig {
    /// No ICE servers, loopback included. Enough for peers on one machine.
    pub fn local_only() -> Self {
        Self {
            ice_servers: Vec::new(),
            include_loopback: true,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                IceServerConfig::stun(DEFAULT_STUN_ADDR),
                IceServerConfig::stun(DEFAULT_STUN_ADDR_2),
            ],
            include_loopback: false,
        }
    }
}
