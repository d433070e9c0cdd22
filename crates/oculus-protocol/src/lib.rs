//! Oculus Sonar Protocol Library
//!
//! This crate decodes and validates the binary messages sent by Oculus
//! multibeam imaging sonars:
//!
//! - **Simple ping result**: one sonar ping, in the legacy and the current
//!   (version 2) layout, with per-beam bearings, optional per-range gains and
//!   the range x beam intensity image at 8, 16 or 32 bits per sample
//! - **Status message**: the fixed-size UDP broadcast that identifies a sonar
//!
//! # Architecture
//!
//! Decoding is layered:
//! - [`MessageHeader`] reads the common 16-byte header and checks the magic
//! - a per-revision [`HeaderLayout`] locates every frame-specific field
//! - [`validate`] checks sizes and offsets and derives the [`SamplingGeometry`]
//! - [`BearingView`], [`GainView`] and [`ImageView`] read the data regions in
//!   place, without copying
//!
//! Malformed frames are rejected with a [`FrameError`] before any view exists,
//! so a [`PingFrame`] is always valid.
//!
//! # Example
//!
//! ```rust
//! use oculus_protocol::{decode, encode::PingBuilder, Revision};
//!
//! let bytes = PingBuilder::new(Revision::Legacy, 4, 2)
//!     .image((1..=8).collect())
//!     .build();
//!
//! let ping = decode(&bytes).unwrap();
//! assert_eq!(ping.beam_count(), 4);
//! assert_eq!(ping.image().at(1, 0), Ok(5));
//! ```

pub mod encode;
pub mod error;
pub mod flags;
pub mod framing;
pub mod geometry;
pub mod header;
pub mod layout;
pub mod ping;
pub mod status;
pub mod validate;
pub mod views;

mod wire;

pub use error::{FrameError, IndexError, RejectKind};
pub use flags::{DataSize, MasterMode, PingFlags, PingRate};
pub use framing::{AssemblerConfig, FrameAssembler, RawFrame};
pub use geometry::{RowLayout, SamplingGeometry};
pub use header::{MessageHeader, MessageType, HEADER_SIZE, OCULUS_CHECK_ID};
pub use layout::{HeaderLayout, Revision};
pub use ping::{decode, PingFrame, PingInfo};
pub use status::{SonarStatus, VersionInfo, STATUS_MSG_SIZE, STATUS_PORT};
pub use validate::validate;
pub use views::{BearingView, GainView, ImageRow, ImageView};
