//! Receive side of the Oculus sonar protocol
//!
//! This crate connects the pure decoder in `oculus_protocol` to the outside
//! world:
//!
//! - **Status**: [`StatusListener`] receives the UDP status broadcast and
//!   [`discover`] waits for the first sonar to announce itself
//! - **Dispatch**: [`PingDispatcher`] decodes frames and routes them to
//!   per-revision handlers, counting rejections
//! - **Playback**: [`FramePlayer`] and [`FrameRecorder`] read and write
//!   recordings of the data channel

pub mod config;
pub mod dispatch;
pub mod error;
pub mod playback;
pub mod status;

pub use config::{ListenerConfig, MagicCheck};
pub use dispatch::{DispatchStats, PingDispatcher, RejectCounts};
pub use error::RxError;
pub use playback::{FramePlayer, FrameRecorder};
pub use status::{
    discover, StatusCounters, StatusListener, StatusListenerHandle, StatusRecord, StatusTally,
};
