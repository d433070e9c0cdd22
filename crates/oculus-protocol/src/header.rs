//! Common message header
//!
//! Every message sent by the sonar starts with the same 16-byte header.
//!
//! # Frame Format
//! ```text
//! [oculus_id:2] [src:2] [dst:2] [msg_id:2] [msg_version:2] [payload_size:4] [spare:2]
//! ```
//!
//! - `oculus_id`: fixed magic, `0x4F53` ("SO" on the wire)
//! - `payload_size`: bytes following the header; the total frame size is
//!   `HEADER_SIZE + payload_size`

use crate::error::FrameError;
use crate::wire::{read_u16, read_u32};

/// Fixed magic identifier at the start of every message
pub const OCULUS_CHECK_ID: u16 = 0x4F53;
/// Size of the common message header in bytes
pub const HEADER_SIZE: usize = 16;

const OFF_ID: usize = 0;
const OFF_SRC: usize = 2;
const OFF_DST: usize = 4;
const OFF_MSG_ID: usize = 6;
const OFF_VERSION: usize = 8;
const OFF_PAYLOAD: usize = 10;

/// Message type carried in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageType {
    /// Fire configuration sent to the sonar
    SimpleFire,
    /// Full ping result
    PingResult,
    /// Simple ping result (the frame this crate decodes)
    SimplePingResult,
    /// User configuration
    UserConfig,
    /// Keep-alive
    Dummy,
    /// Anything else, preserved as-is
    Unknown(u16),
}

impl MessageType {
    /// Wire value of this message type
    pub fn id(&self) -> u16 {
        match self {
            Self::SimpleFire => 0x15,
            Self::PingResult => 0x22,
            Self::SimplePingResult => 0x23,
            Self::UserConfig => 0x55,
            Self::Dummy => 0xFF,
            Self::Unknown(id) => *id,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::SimpleFire => "SimpleFire",
            Self::PingResult => "PingResult",
            Self::SimplePingResult => "SimplePingResult",
            Self::UserConfig => "UserConfig",
            Self::Dummy => "Dummy",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl From<u16> for MessageType {
    fn from(value: u16) -> Self {
        match value {
            0x15 => Self::SimpleFire,
            0x22 => Self::PingResult,
            0x23 => Self::SimplePingResult,
            0x55 => Self::UserConfig,
            0xFF => Self::Dummy,
            other => Self::Unknown(other),
        }
    }
}

/// Parsed common message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageHeader {
    /// Magic identifier
    pub oculus_id: u16,
    /// Sending device
    pub src_device_id: u16,
    /// Receiving device
    pub dst_device_id: u16,
    /// Message type
    pub msg_type: MessageType,
    /// Message version
    pub msg_version: u16,
    /// Payload bytes after the header
    pub payload_size: u32,
}

impl MessageHeader {
    /// Parse the common header from the start of `buf`
    ///
    /// The magic is checked before anything else in the header is trusted.
    pub fn parse(buf: &[u8]) -> Result<Self, FrameError> {
        let header = Self::parse_unchecked(buf)?;
        if !header.is_valid() {
            return Err(FrameError::BadHeader {
                found: header.oculus_id,
            });
        }
        Ok(header)
    }

    /// Parse the header fields without checking the magic
    pub fn parse_unchecked(buf: &[u8]) -> Result<Self, FrameError> {
        let too_short = || FrameError::TooShort {
            needed: HEADER_SIZE,
            actual: buf.len(),
        };
        if buf.len() < HEADER_SIZE {
            return Err(too_short());
        }

        Ok(Self {
            oculus_id: read_u16(buf, OFF_ID).ok_or_else(too_short)?,
            src_device_id: read_u16(buf, OFF_SRC).ok_or_else(too_short)?,
            dst_device_id: read_u16(buf, OFF_DST).ok_or_else(too_short)?,
            msg_type: read_u16(buf, OFF_MSG_ID).ok_or_else(too_short)?.into(),
            msg_version: read_u16(buf, OFF_VERSION).ok_or_else(too_short)?,
            payload_size: read_u32(buf, OFF_PAYLOAD).ok_or_else(too_short)?,
        })
    }

    /// Whether the magic identifier matches
    pub fn is_valid(&self) -> bool {
        self.oculus_id == OCULUS_CHECK_ID
    }

    /// Total frame size claimed by the sender (header included)
    pub fn declared_size(&self) -> u64 {
        HEADER_SIZE as u64 + u64::from(self.payload_size)
    }

    /// Log the header fields at debug level
    pub fn dump(&self) {
        tracing::debug!("   Oculus Id: 0x{:04X}", self.oculus_id);
        tracing::debug!("      Src Id: 0x{:04X}", self.src_device_id);
        tracing::debug!("      Dst Id: 0x{:04X}", self.dst_device_id);
        tracing::debug!(
            "      Msg Id: 0x{:04X} ({})",
            self.msg_type.id(),
            self.msg_type.name()
        );
        tracing::debug!(" Msg version: {}", self.msg_version);
        tracing::debug!("Payload size: {}", self.payload_size);
    }
}
