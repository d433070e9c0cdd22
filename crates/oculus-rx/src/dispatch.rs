//! Routing decoded pings to per-revision handlers
//!
//! The decoder only returns a result; [`PingDispatcher`] is the acceptance
//! boundary that turns it into calls. Rejected frames are logged, counted by
//! kind and reported to an optional handler, and the dispatcher carries on
//! with the next frame.

use oculus_protocol::{decode, FrameError, PingFrame, RawFrame, RejectKind, Revision};
use serde::Serialize;
use tracing::{trace, warn};

/// Handler for accepted pings
pub type PingHandler = Box<dyn FnMut(&PingFrame<'_>) + Send + 'static>;

/// Handler for rejected frames, given the reason and the raw bytes
pub type RejectHandler = Box<dyn FnMut(&FrameError, &[u8]) + Send + 'static>;

/// Rejections broken down by reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RejectCounts {
    pub too_short: u64,
    pub bad_header: u64,
    pub unknown_encoding: u64,
    pub size_mismatch: u64,
    pub bad_offset: u64,
    pub unsupported_message: u64,
}

impl RejectCounts {
    pub fn record(&mut self, kind: RejectKind) {
        let slot = match kind {
            RejectKind::TooShort => &mut self.too_short,
            RejectKind::BadHeader => &mut self.bad_header,
            RejectKind::UnknownEncoding => &mut self.unknown_encoding,
            RejectKind::SizeMismatch => &mut self.size_mismatch,
            RejectKind::BadOffset => &mut self.bad_offset,
            RejectKind::UnsupportedMessage => &mut self.unsupported_message,
        };
        *slot += 1;
    }

    pub fn get(&self, kind: RejectKind) -> u64 {
        match kind {
            RejectKind::TooShort => self.too_short,
            RejectKind::BadHeader => self.bad_header,
            RejectKind::UnknownEncoding => self.unknown_encoding,
            RejectKind::SizeMismatch => self.size_mismatch,
            RejectKind::BadOffset => self.bad_offset,
            RejectKind::UnsupportedMessage => self.unsupported_message,
        }
    }

    pub fn total(&self) -> u64 {
        self.too_short
            + self.bad_header
            + self.unknown_encoding
            + self.size_mismatch
            + self.bad_offset
            + self.unsupported_message
    }
}

/// Snapshot of dispatcher activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DispatchStats {
    pub legacy: u64,
    pub current: u64,
    pub rejected: RejectCounts,
}

impl DispatchStats {
    pub fn accepted(&self) -> u64 {
        self.legacy + self.current
    }
}

/// Push-model consumer of raw frames
#[derive(Default)]
pub struct PingDispatcher {
    on_legacy: Option<PingHandler>,
    on_current: Option<PingHandler>,
    on_rejected: Option<RejectHandler>,
    stats: DispatchStats,
}

impl PingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle pings in the legacy layout
    pub fn on_legacy<F>(&mut self, handler: F)
    where
        F: FnMut(&PingFrame<'_>) + Send + 'static,
    {
        self.on_legacy = Some(Box::new(handler));
    }

    /// Handle pings in the current layout
    pub fn on_current<F>(&mut self, handler: F)
    where
        F: FnMut(&PingFrame<'_>) + Send + 'static,
    {
        self.on_current = Some(Box::new(handler));
    }

    pub fn on_rejected<F>(&mut self, handler: F)
    where
        F: FnMut(&FrameError, &[u8]) + Send + 'static,
    {
        self.on_rejected = Some(Box::new(handler));
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Decode one frame and route it
    ///
    /// The rejection is returned as well as reported, so callers can decide
    /// for themselves whether to stop.
    pub fn supply_frame(&mut self, bytes: &[u8]) -> Result<Revision, FrameError> {
        match decode(bytes) {
            Ok(ping) => {
                trace!("Dispatching {}", ping);
                let revision = ping.revision();
                let handler = match revision {
                    Revision::Legacy => {
                        self.stats.legacy += 1;
                        self.on_legacy.as_mut()
                    }
                    Revision::Current => {
                        self.stats.current += 1;
                        self.on_current.as_mut()
                    }
                };
                if let Some(handler) = handler {
                    handler(&ping);
                }
                Ok(revision)
            }
            Err(e) => {
                self.stats.rejected.record(e.kind());
                warn!("Rejected {}-byte frame: {}", bytes.len(), e);
                if let Some(handler) = self.on_rejected.as_mut() {
                    handler(&e, bytes);
                }
                Err(e)
            }
        }
    }

    pub fn supply(&mut self, frame: &RawFrame) -> Result<Revision, FrameError> {
        self.supply_frame(frame.as_bytes())
    }
}
