//! Recorded frame files
//!
//! A recording is the raw data channel written to disk: complete messages,
//! back to back, with nothing in between. [`FramePlayer`] reads one back as a
//! pull-model frame source and [`FrameRecorder`] writes one.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use oculus_protocol::{AssemblerConfig, FrameAssembler, RawFrame};
use tracing::{debug, info, warn};

use crate::error::RxError;

const READ_CHUNK: usize = 64 * 1024;

/// Reads complete frames from a byte source
pub struct FramePlayer<R> {
    reader: R,
    assembler: FrameAssembler,
    chunk: Vec<u8>,
    eof: bool,
    frames: u64,
}

impl FramePlayer<BufReader<File>> {
    /// Open a recording on disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RxError> {
        Self::open_with_config(path, AssemblerConfig::default())
    }

    /// Open a recording on disk with a custom framing limit
    pub fn open_with_config(path: impl AsRef<Path>, config: AssemblerConfig) -> Result<Self, RxError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!("Playing back {}", path.display());
        Ok(Self::with_config(BufReader::new(file), config))
    }
}

impl<R: Read> FramePlayer<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, AssemblerConfig::default())
    }

    pub fn with_config(reader: R, config: AssemblerConfig) -> Self {
        Self {
            reader,
            assembler: FrameAssembler::with_config(config),
            chunk: vec![0u8; READ_CHUNK],
            eof: false,
            frames: 0,
        }
    }

    /// Frames returned so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Bytes skipped because they did not belong to any message
    pub fn discarded(&self) -> u64 {
        self.assembler.discarded()
    }

    /// Next complete frame, or `None` at end of input
    ///
    /// A truncated message at the end of the input is dropped.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>, RxError> {
        loop {
            if let Some(frame) = self.assembler.next_frame() {
                self.frames += 1;
                return Ok(Some(frame));
            }
            if self.eof {
                if self.assembler.pending() > 0 {
                    warn!(
                        "Dropping {} trailing bytes of an incomplete frame",
                        self.assembler.pending()
                    );
                    self.assembler.clear();
                }
                return Ok(None);
            }
            match self.reader.read(&mut self.chunk) {
                Ok(0) => {
                    debug!("End of recording after {} frames", self.frames);
                    self.eof = true;
                }
                Ok(n) => self.assembler.push_bytes(&self.chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<R: Read> Iterator for FramePlayer<R> {
    type Item = Result<RawFrame, RxError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

/// Appends raw frames to a writer
pub struct FrameRecorder<W: Write> {
    writer: W,
    frames: u64,
    bytes: u64,
}

impl FrameRecorder<BufWriter<File>> {
    /// Create (or truncate) a recording on disk
    pub fn create(path: impl AsRef<Path>) -> Result<Self, RxError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        info!("Recording to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> FrameRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames: 0,
            bytes: 0,
        }
    }

    pub fn record(&mut self, frame: &[u8]) -> Result<(), RxError> {
        self.writer.write_all(frame)?;
        self.frames += 1;
        self.bytes += frame.len() as u64;
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn flush(&mut self) -> Result<(), RxError> {
        Ok(self.writer.flush()?)
    }

    /// Flush and return the writer
    pub fn into_inner(mut self) -> Result<W, RxError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
