//! Error types for ping frame decoding

use thiserror::Error;

/// Reasons a buffer is rejected before any data view is built
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer is shorter than a structurally required size
    #[error("frame too short: need {needed} bytes, have {actual}")]
    TooShort { needed: usize, actual: usize },

    /// Magic identifier mismatch
    #[error("bad header: magic 0x{found:04X}")]
    BadHeader { found: u16 },

    /// Unrecognised sample width code
    #[error("unknown data size encoding: {0}")]
    UnknownEncoding(u8),

    /// Declared image size disagrees with the computed geometry
    #[error("image size mismatch: declared {declared}, expected {expected}")]
    SizeMismatch { declared: u64, expected: u64 },

    /// Image data does not start after the fixed header
    #[error("image offset {offset} is not past the {header_size}-byte header")]
    BadOffset { offset: u32, header_size: usize },

    /// Valid header, but not a simple ping result
    #[error("unsupported message type: 0x{0:04X}")]
    UnsupportedMessage(u16),
}

/// Coarse rejection category, used for counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectKind {
    TooShort,
    BadHeader,
    UnknownEncoding,
    SizeMismatch,
    BadOffset,
    UnsupportedMessage,
}

impl FrameError {
    /// Category of this rejection
    pub fn kind(&self) -> RejectKind {
        match self {
            Self::TooShort { .. } => RejectKind::TooShort,
            Self::BadHeader { .. } => RejectKind::BadHeader,
            Self::UnknownEncoding(_) => RejectKind::UnknownEncoding,
            Self::SizeMismatch { .. } => RejectKind::SizeMismatch,
            Self::BadOffset { .. } => RejectKind::BadOffset,
            Self::UnsupportedMessage(_) => RejectKind::UnsupportedMessage,
        }
    }
}

/// Errors raised by view accessors at read time
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Requested (range, beam) is outside the image
    #[error("index ({range}, {beam}) out of range for {ranges}x{beams} image")]
    OutOfRange {
        range: usize,
        beam: usize,
        ranges: usize,
        beams: usize,
    },

    /// Index past the end of a bearing or gain table
    #[error("index {index} out of range for {len} entries")]
    OutOfBounds { index: usize, len: usize },

    /// Computed byte offset fell outside the frame buffer
    #[error("sample at byte {offset} lies outside the {len}-byte frame")]
    Corrupt { offset: usize, len: usize },
}
