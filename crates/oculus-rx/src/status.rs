//! Status broadcast listener
//!
//! A sonar announces itself with a fixed-size UDP datagram about once a
//! second. [`StatusListener`] owns the socket and a [`StatusTally`] and runs a
//! single receive task:
//!
//! - datagrams of the wrong size are counted invalid and dropped
//! - correctly sized datagrams are parsed and handed to every registered
//!   callback together with their validity, see [`MagicCheck`]
//! - counters are published as copied [`StatusCounters`] snapshots through a
//!   `watch` channel
//!
//! ```rust,no_run
//! use oculus_rx::{ListenerConfig, StatusListener};
//!
//! # async fn run() -> Result<(), oculus_rx::RxError> {
//! let mut listener = StatusListener::bind(ListenerConfig::default()).await?;
//! listener.on_status(|record, valid| {
//!     println!("{} valid={}", record.status.ip_addr, valid);
//! });
//! let handle = listener.spawn();
//! // ...
//! let totals = handle.shutdown().await?;
//! println!("{} valid, {} invalid", totals.valid, totals.invalid);
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use oculus_protocol::{SonarStatus, STATUS_MSG_SIZE};
use serde::Serialize;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::{ListenerConfig, MagicCheck};
use crate::error::RxError;

/// Copied-out listener counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusCounters {
    pub valid: u64,
    pub invalid: u64,
}

/// One received status message and the tally at the time it arrived
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusRecord {
    pub status: SonarStatus,
    /// Address the datagram came from
    pub source: SocketAddr,
    pub valid_count: u64,
    pub invalid_count: u64,
}

impl StatusRecord {
    pub fn device_id(&self) -> u32 {
        self.status.device_id
    }

    /// Firmware version of the main processor
    pub fn firmware_version(&self) -> u32 {
        self.status.versions.arm0_version
    }
}

/// Counting and validity decisions of one listener
#[derive(Debug, Clone, Default)]
pub struct StatusTally {
    magic_check: MagicCheck,
    counters: StatusCounters,
}

impl StatusTally {
    pub fn new(magic_check: MagicCheck) -> Self {
        Self {
            magic_check,
            counters: StatusCounters::default(),
        }
    }

    pub fn counters(&self) -> StatusCounters {
        self.counters
    }

    /// Account for one datagram
    ///
    /// Returns the record and its validity, or `None` when the datagram was
    /// dropped.
    pub fn ingest(&mut self, datagram: &[u8], source: SocketAddr) -> Option<(StatusRecord, bool)> {
        if datagram.len() != STATUS_MSG_SIZE {
            self.counters.invalid += 1;
            debug!(
                "Dropping {}-byte datagram from {} (expected {})",
                datagram.len(),
                source,
                STATUS_MSG_SIZE
            );
            return None;
        }

        let status = match SonarStatus::parse(datagram) {
            Ok(status) => status,
            Err(e) => {
                self.counters.invalid += 1;
                warn!("Unparseable status from {}: {}", source, e);
                return None;
            }
        };

        let valid = match self.magic_check {
            MagicCheck::Ignore => true,
            MagicCheck::Require => status.magic_valid(),
        };
        if valid {
            self.counters.valid += 1;
        } else {
            self.counters.invalid += 1;
            debug!(
                "Status from {} has bad magic {:#06x}",
                source, status.header.oculus_id
            );
        }

        let record = StatusRecord {
            status,
            source,
            valid_count: self.counters.valid,
            invalid_count: self.counters.invalid,
        };
        Some((record, valid))
    }
}

const RECV_BACKOFF_MIN: Duration = Duration::from_millis(10);
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Delay before retrying after consecutive receive errors
///
/// Doubles from 10 ms up to 1 s and resets on the next successful receive.
#[derive(Debug, Clone, Default)]
pub struct RecvBackoff {
    errors: u32,
}

impl RecvBackoff {
    /// Record a failed receive and return how long to wait
    pub fn on_error(&mut self) -> Duration {
        let delay = RECV_BACKOFF_MIN
            .saturating_mul(1 << self.errors.min(16))
            .min(RECV_BACKOFF_MAX);
        self.errors = self.errors.saturating_add(1);
        delay
    }

    pub fn on_success(&mut self) {
        self.errors = 0;
    }

    /// Consecutive failures so far
    pub fn errors(&self) -> u32 {
        self.errors
    }
}

/// Callback invoked for every delivered status message
pub type StatusCallback = Box<dyn FnMut(&StatusRecord, bool) + Send + 'static>;

/// Commands accepted by a running listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerCommand {
    Shutdown,
}

/// A bound status socket, not yet receiving
pub struct StatusListener {
    socket: UdpSocket,
    config: ListenerConfig,
    callbacks: Vec<StatusCallback>,
}

impl StatusListener {
    /// Bind the status port
    pub async fn bind(config: ListenerConfig) -> Result<Self, RxError> {
        let addr = config.socket_addr();
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| RxError::Bind { addr, source })?;
        info!("Status listener bound to {}", socket.local_addr()?);
        Ok(Self {
            socket,
            config,
            callbacks: Vec::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RxError> {
        Ok(self.socket.local_addr()?)
    }

    /// Register a callback for received status messages
    pub fn on_status<F>(&mut self, callback: F)
    where
        F: FnMut(&StatusRecord, bool) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Start the receive task
    pub fn spawn(self) -> StatusListenerHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let (counters_tx, counters_rx) = watch::channel(StatusCounters::default());
        let task = tokio::spawn(run_status_listener(self, cmd_rx, counters_tx));
        StatusListenerHandle {
            cmd_tx,
            counters: counters_rx,
            task,
        }
    }
}

/// Control of a running [`StatusListener`]
pub struct StatusListenerHandle {
    cmd_tx: mpsc::Sender<ListenerCommand>,
    counters: watch::Receiver<StatusCounters>,
    task: JoinHandle<Result<StatusCounters, RxError>>,
}

impl StatusListenerHandle {
    /// Latest counter snapshot
    pub fn counters(&self) -> StatusCounters {
        *self.counters.borrow()
    }

    /// Receiver that is notified on every counter change
    pub fn subscribe(&self) -> watch::Receiver<StatusCounters> {
        self.counters.clone()
    }

    /// Stop the receive task and return the final counters
    pub async fn shutdown(self) -> Result<StatusCounters, RxError> {
        // The task may already have stopped on its own
        let _ = self.cmd_tx.send(ListenerCommand::Shutdown).await;
        self.join().await
    }

    /// Wait for the receive task to end
    pub async fn join(self) -> Result<StatusCounters, RxError> {
        self.task.await.map_err(|e| {
            warn!("Status listener task failed: {}", e);
            RxError::ListenerStopped
        })?
    }
}

async fn run_status_listener(
    mut listener: StatusListener,
    mut cmd_rx: mpsc::Receiver<ListenerCommand>,
    counters_tx: watch::Sender<StatusCounters>,
) -> Result<StatusCounters, RxError> {
    let mut tally = StatusTally::new(listener.config.magic_check);
    let mut backoff = RecvBackoff::default();
    // One byte more than a status message so oversized datagrams are detectable
    let mut buf = vec![0u8; listener.config.max_datagram.max(STATUS_MSG_SIZE + 1)];

    info!(
        "Starting status listener (magic check: {:?})",
        listener.config.magic_check
    );

    loop {
        tokio::select! {
            result = listener.socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, source)) => {
                        backoff.on_success();
                        trace!("Status datagram from {}: {} bytes", source, len);
                        if let Some((record, valid)) = tally.ingest(&buf[..len], source) {
                            for callback in listener.callbacks.iter_mut() {
                                callback(&record, valid);
                            }
                        }
                        let _ = counters_tx.send(tally.counters());
                    }
                    Err(e) => {
                        // Keep listening; UDP errors are usually transient
                        let delay = backoff.on_error();
                        warn!(
                            "Status socket receive error ({} in a row), retrying in {:?}: {}",
                            backoff.errors(), delay, e
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ListenerCommand::Shutdown) => {
                        info!("Shutdown requested for status listener");
                        break;
                    }
                    None => {
                        debug!("Command channel closed for status listener");
                        break;
                    }
                }
            }
        }
    }

    let counters = tally.counters();
    info!(
        "Status listener ended: {} valid, {} invalid",
        counters.valid, counters.invalid
    );
    Ok(counters)
}

/// Wait for the first valid status message
pub async fn discover(config: ListenerConfig, timeout: Duration) -> Result<StatusRecord, RxError> {
    let mut listener = StatusListener::bind(config).await?;
    let (found_tx, mut found_rx) = mpsc::channel(1);
    listener.on_status(move |record, valid| {
        if valid {
            let _ = found_tx.try_send(record.clone());
        }
    });
    let handle = listener.spawn();

    let found = tokio::time::timeout(timeout, found_rx.recv()).await;
    handle.shutdown().await?;

    match found {
        Ok(Some(record)) => {
            info!(
                "Found sonar {} at {} (part {})",
                record.device_id(),
                record.status.ip_addr,
                record.status.part_number
            );
            Ok(record)
        }
        Ok(None) => Err(RxError::ListenerStopped),
        Err(_) => Err(RxError::DiscoveryTimeout(timeout)),
    }
}
