//! Error types for the receive side

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while listening for or replaying sonar traffic
#[derive(Debug, Error)]
pub enum RxError {
    /// Could not bind the status socket
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// No valid status message arrived in time
    #[error("no sonar status received within {0:?}")]
    DiscoveryTimeout(Duration),

    /// The listener task stopped before answering
    #[error("status listener stopped")]
    ListenerStopped,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
