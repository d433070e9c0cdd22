//! Splitting a byte stream into complete frames
//!
//! The data channel and recorded files carry messages back to back. Each
//! message starts with the common header, whose payload size tells how many
//! bytes belong to it. [`FrameAssembler`] buffers partial input and hands out
//! whole messages as immutable [`RawFrame`]s.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::error::FrameError;
use crate::header::{MessageHeader, OCULUS_CHECK_ID};
use crate::ping::{decode, PingFrame};

/// Default upper bound on a single message
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// One complete message received from the sonar
///
/// Immutable and cheap to clone; the bytes can be shared with other threads
/// while a [`PingFrame`] borrows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame(Arc<[u8]>);

impl RawFrame {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode as a simple ping result
    pub fn decode(&self) -> Result<PingFrame<'_>, FrameError> {
        decode(&self.0)
    }
}

impl From<Vec<u8>> for RawFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Framing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssemblerConfig {
    /// Messages declaring a larger size are discarded
    pub max_frame_len: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Streaming message splitter
pub struct FrameAssembler {
    buffer: Vec<u8>,
    config: AssemblerConfig,
    discarded: u64,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::with_config(AssemblerConfig::default())
    }

    pub fn with_config(config: AssemblerConfig) -> Self {
        Self {
            buffer: Vec::with_capacity(64 * 1024),
            config,
            discarded: 0,
        }
    }

    /// Append raw bytes from the stream
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Bytes skipped while searching for a message start
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Bytes waiting for the rest of their message
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Find the next magic identifier
    fn find_magic(&self) -> Option<usize> {
        let magic = OCULUS_CHECK_ID.to_le_bytes();
        self.buffer.windows(2).position(|w| w == magic)
    }

    fn skip(&mut self, count: usize) {
        self.buffer.drain(..count);
        self.discarded += count as u64;
    }

    /// Extract the next complete message, if one is buffered
    pub fn next_frame(&mut self) -> Option<RawFrame> {
        loop {
            let Some(start) = self.find_magic() else {
                // Keep a trailing byte that may be the first half of the magic
                let keep = usize::from(self.buffer.last() == Some(&OCULUS_CHECK_ID.to_le_bytes()[0]));
                let skip = self.buffer.len() - keep;
                if skip > 0 {
                    trace!("Discarding {} bytes with no message start", skip);
                    self.skip(skip);
                }
                return None;
            };
            if start > 0 {
                warn!("Resynchronising: skipped {} bytes before message start", start);
                self.skip(start);
            }

            let header = MessageHeader::parse(&self.buffer).ok()?;
            let declared = header.declared_size();
            if declared > self.config.max_frame_len as u64 {
                warn!(
                    "Message declares {} bytes (limit {}), skipping",
                    declared, self.config.max_frame_len
                );
                // Drop this magic and look for the next one
                self.skip(2);
                continue;
            }

            let len = declared as usize;
            if self.buffer.len() < len {
                return None;
            }

            let frame: Vec<u8> = self.buffer.drain(..len).collect();
            trace!("Assembled {}-byte {} message", len, header.msg_type.name());
            return Some(RawFrame::from(frame));
        }
    }

    /// Clear the internal buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::PingBuilder;
    use crate::layout::Revision;

    #[test]
    fn test_split_back_to_back_frames() {
        let a = PingBuilder::new(Revision::Legacy, 4, 2).ping_id(1).build();
        let b = PingBuilder::new(Revision::Current, 8, 3).ping_id(2).build();
        let mut stream = a.clone();
        stream.extend_from_slice(&b);

        let mut assembler = FrameAssembler::new();
        assembler.push_bytes(&stream);
        assert_eq!(assembler.next_frame().unwrap().as_bytes(), &a[..]);
        let second = assembler.next_frame().unwrap();
        assert_eq!(second.decode().unwrap().ping_id(), 2);
        assert!(assembler.next_frame().is_none());
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_partial_frame_waits() {
        let frame = PingBuilder::new(Revision::Legacy, 4, 2).build();
        let mut assembler = FrameAssembler::new();

        assembler.push_bytes(&frame[..10]);
        assert!(assembler.next_frame().is_none());
        assembler.push_bytes(&frame[10..100]);
        assert!(assembler.next_frame().is_none());
        assembler.push_bytes(&frame[100..]);
        assert_eq!(assembler.next_frame().unwrap().len(), frame.len());
    }

    #[test]
    fn test_resync_after_garbage() {
        let frame = PingBuilder::new(Revision::Legacy, 4, 2).build();
        let mut assembler = FrameAssembler::new();
        assembler.push_bytes(&[0xAA, 0xBB, 0xCC]);
        assembler.push_bytes(&frame);

        let out = assembler.next_frame().unwrap();
        assert!(out.decode().is_ok());
        assert_eq!(assembler.discarded(), 3);
    }

    #[test]
    fn test_oversized_frame_skipped() {
        let big = PingBuilder::new(Revision::Legacy, 64, 64).build();
        let small = PingBuilder::new(Revision::Legacy, 2, 2).ping_id(9).build();
        let mut assembler = FrameAssembler::with_config(AssemblerConfig { max_frame_len: 1024 });
        assembler.push_bytes(&big);
        assembler.push_bytes(&small);

        // The oversized frame's body is scanned through until the next magic
        let mut found = None;
        while let Some(frame) = assembler.next_frame() {
            if let Ok(ping) = frame.decode() {
                found = Some(ping.ping_id());
            }
        }
        assert_eq!(found, Some(9));
    }
}
