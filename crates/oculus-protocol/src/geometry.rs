//! Sampling geometry of the image data
//!
//! Derived once from a validated frame and shared by all data views.

use crate::flags::DataSize;

/// Bytes of gain value at the start of each gain-prefixed row
pub const GAIN_BYTES: usize = 4;

/// Whether image rows carry a leading gain value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RowLayout {
    /// Rows are `beam_count` samples, back to back
    Plain,
    /// Each row starts with a 32-bit gain value
    GainPrefixed,
}

impl RowLayout {
    pub fn from_send_gain(send_gain: bool) -> Self {
        if send_gain {
            Self::GainPrefixed
        } else {
            Self::Plain
        }
    }

    /// Header bytes at the start of each row (0 or 4)
    pub fn header_bytes(&self) -> usize {
        match self {
            Self::Plain => 0,
            Self::GainPrefixed => GAIN_BYTES,
        }
    }
}

/// Layout of the range x beam intensity grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplingGeometry {
    pub data_size: DataSize,
    pub beam_count: usize,
    pub range_count: usize,
    pub row_layout: RowLayout,
}

impl SamplingGeometry {
    pub fn new(data_size: DataSize, beam_count: usize, range_count: usize, row_layout: RowLayout) -> Self {
        Self {
            data_size,
            beam_count,
            range_count,
            row_layout,
        }
    }

    /// Bytes per sample (1, 2 or 4)
    pub fn sample_width(&self) -> usize {
        self.data_size.bytes()
    }

    pub fn gain_present(&self) -> bool {
        self.row_layout == RowLayout::GainPrefixed
    }

    pub fn row_header_bytes(&self) -> usize {
        self.row_layout.header_bytes()
    }

    /// Byte distance between consecutive rows
    pub fn row_stride(&self) -> usize {
        self.sample_width() * self.beam_count + self.row_header_bytes()
    }

    /// Total bytes of image data, gains included
    pub fn image_bytes(&self) -> usize {
        self.row_stride() * self.range_count
    }

    /// Expected image size for the given field values, `None` on overflow
    pub fn expected_image_bytes(
        data_size: DataSize,
        beam_count: u64,
        range_count: u64,
        row_layout: RowLayout,
    ) -> Option<u64> {
        let samples = (data_size.bytes() as u64)
            .checked_mul(range_count)?
            .checked_mul(beam_count)?;
        let gains = (row_layout.header_bytes() as u64).checked_mul(range_count)?;
        samples.checked_add(gains)
    }
}
