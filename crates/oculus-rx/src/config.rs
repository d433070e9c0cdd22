//! Listener configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use oculus_protocol::STATUS_PORT;
use serde::{Deserialize, Serialize};

/// Whether a status datagram must carry the protocol magic to count as valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagicCheck {
    /// A bad magic is counted as invalid (the datagram is still reported)
    #[default]
    Require,
    /// Any correctly sized datagram is valid
    Ignore,
}

/// Status listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Local address to bind
    pub bind_addr: IpAddr,
    /// UDP port of the status broadcast
    pub port: u16,
    pub magic_check: MagicCheck,
    /// Receive buffer size; larger datagrams are truncated and counted invalid
    pub max_datagram: usize,
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: STATUS_PORT,
            magic_check: MagicCheck::default(),
            max_datagram: 2048,
        }
    }
}
