//! Zero-copy views over the data regions of a ping frame
//!
//! Views hold the original buffer plus index arithmetic; nothing is copied.
//! They are only constructed by [`decode`](crate::decode) from a validated
//! [`SamplingGeometry`], so every in-range index maps to bytes inside the
//! buffer. Offsets are still computed with checked arithmetic and every read
//! goes through [`read_sample`], which refuses to step outside the buffer: an
//! out-of-buffer or overflowing offset means the validator and the geometry
//! disagree, and trips a debug assertion before being reported as
//! [`IndexError::Corrupt`].

use crate::error::IndexError;
use crate::geometry::{SamplingGeometry, GAIN_BYTES};

/// `base + index * stride + skip`, `None` on overflow
fn element_offset(base: usize, index: usize, stride: usize, skip: usize) -> Option<usize> {
    index
        .checked_mul(stride)?
        .checked_add(base)?
        .checked_add(skip)
}

/// Read one little-endian sample of `width` bytes, widened to `u32`
///
/// An overflowed offset (`None`) is reported at `usize::MAX`.
fn read_sample(buf: &[u8], offset: Option<usize>, width: usize) -> Result<u32, IndexError> {
    let bytes = offset
        .and_then(|start| Some((start, start.checked_add(width)?)))
        .and_then(|(start, end)| buf.get(start..end));
    let Some(bytes) = bytes else {
        debug_assert!(
            false,
            "sample at {offset:?}+{width} outside {}-byte frame",
            buf.len()
        );
        return Err(IndexError::Corrupt {
            offset: offset.unwrap_or(usize::MAX),
            len: buf.len(),
        });
    };

    Ok(match bytes {
        &[b0] => u32::from(b0),
        &[b0, b1] => u32::from(u16::from_le_bytes([b0, b1])),
        &[b0, b1, b2, b3] => u32::from_le_bytes([b0, b1, b2, b3]),
        _ => unreachable!("sample widths are 1, 2 or 4 bytes"),
    })
}

/// Beam bearings, one signed value per beam in hundredths of a degree
#[derive(Debug, Clone, Copy)]
pub struct BearingView<'a> {
    buf: &'a [u8],
    offset: usize,
    count: usize,
}

impl<'a> BearingView<'a> {
    /// Bearings start at `offset` (the end of the fixed ping header)
    pub(crate) fn new(buf: &'a [u8], offset: usize, count: usize) -> Self {
        Self { buf, offset, count }
    }

    /// Number of beams
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Bearing of beam `index` in hundredths of a degree
    pub fn try_get(&self, index: usize) -> Result<i16, IndexError> {
        if index >= self.count {
            return Err(IndexError::OutOfBounds {
                index,
                len: self.count,
            });
        }
        // Reinterpret the 16 raw bits as signed
        let offset = element_offset(self.offset, index, 2, 0);
        read_sample(self.buf, offset, 2).map(|raw| raw as u16 as i16)
    }

    /// Like [`try_get`](Self::try_get), discarding the error
    pub fn get(&self, index: usize) -> Option<i16> {
        self.try_get(index).ok()
    }

    /// Bearing of a beam in degrees
    pub fn degrees(&self, index: usize) -> Option<f64> {
        self.get(index).map(|b| f64::from(b) / 100.0)
    }

    /// Bearings in beam order
    pub fn iter(&self) -> impl Iterator<Item = i16> + 'a {
        let view = *self;
        (0..view.count).filter_map(move |i| view.get(i))
    }
}

/// Per-range gain values, read from the first 4 bytes of each image row
#[derive(Debug, Clone, Copy)]
pub struct GainView<'a> {
    buf: &'a [u8],
    offset: usize,
    stride: usize,
    count: usize,
}

impl<'a> GainView<'a> {
    /// Gains for a gain-prefixed image starting at `image_offset`
    ///
    /// Returns `None` when the geometry carries no gain values.
    pub(crate) fn new(buf: &'a [u8], geometry: &SamplingGeometry, image_offset: usize) -> Option<Self> {
        geometry.gain_present().then(|| Self {
            buf,
            offset: image_offset,
            stride: geometry.row_stride(),
            count: geometry.range_count,
        })
    }

    /// Number of range bins
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Gain of range bin `index`
    pub fn try_get(&self, index: usize) -> Result<u32, IndexError> {
        if index >= self.count {
            return Err(IndexError::OutOfBounds {
                index,
                len: self.count,
            });
        }
        let offset = element_offset(self.offset, index, self.stride, 0);
        read_sample(self.buf, offset, GAIN_BYTES)
    }

    /// Like [`try_get`](Self::try_get), discarding the error
    pub fn get(&self, index: usize) -> Option<u32> {
        self.try_get(index).ok()
    }

    /// Gains in range order
    pub fn iter(&self) -> impl Iterator<Item = u32> + 'a {
        let view = *self;
        (0..view.count).filter_map(move |i| view.get(i))
    }
}

/// Range x beam intensity grid
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    buf: &'a [u8],
    offset: usize,
    geometry: SamplingGeometry,
}

impl<'a> ImageView<'a> {
    /// Image rows start at `image_offset`
    pub(crate) fn new(buf: &'a [u8], geometry: SamplingGeometry, image_offset: usize) -> Self {
        Self {
            buf,
            offset: image_offset,
            geometry,
        }
    }

    /// Number of range bins (rows)
    pub fn ranges(&self) -> usize {
        self.geometry.range_count
    }

    /// Number of beams (columns)
    pub fn beams(&self) -> usize {
        self.geometry.beam_count
    }

    /// Bytes per sample
    pub fn sample_width(&self) -> usize {
        self.geometry.sample_width()
    }

    /// Geometry the view was built from
    pub fn geometry(&self) -> &SamplingGeometry {
        &self.geometry
    }

    /// Sample at (range, beam), widened to `u32`
    pub fn at(&self, range: usize, beam: usize) -> Result<u32, IndexError> {
        let row = self.row(range).ok_or(IndexError::OutOfRange {
            range,
            beam,
            ranges: self.ranges(),
            beams: self.beams(),
        })?;
        row.try_get(beam).map_err(|e| match e {
            IndexError::OutOfBounds { .. } => IndexError::OutOfRange {
                range,
                beam,
                ranges: self.ranges(),
                beams: self.beams(),
            },
            other => other,
        })
    }

    /// One row of samples, with the gain prefix (if any) skipped
    pub fn row(&self, range: usize) -> Option<ImageRow<'a>> {
        if range >= self.ranges() {
            return None;
        }
        Some(ImageRow {
            buf: self.buf,
            offset: element_offset(
                self.offset,
                range,
                self.geometry.row_stride(),
                self.geometry.row_header_bytes(),
            ),
            beams: self.beams(),
            width: self.sample_width(),
        })
    }

    /// Rows in range order
    pub fn rows(&self) -> impl Iterator<Item = ImageRow<'a>> + 'a {
        let view = *self;
        (0..view.ranges()).filter_map(move |r| view.row(r))
    }
}

/// Samples of one range bin
#[derive(Debug, Clone, Copy)]
pub struct ImageRow<'a> {
    buf: &'a [u8],
    /// Start of the first sample, `None` if it overflowed
    offset: Option<usize>,
    beams: usize,
    width: usize,
}

impl<'a> ImageRow<'a> {
    /// Number of beams
    pub fn len(&self) -> usize {
        self.beams
    }

    pub fn is_empty(&self) -> bool {
        self.beams == 0
    }

    /// Sample of `beam`, widened to `u32`
    pub fn try_get(&self, beam: usize) -> Result<u32, IndexError> {
        if beam >= self.beams {
            return Err(IndexError::OutOfBounds {
                index: beam,
                len: self.beams,
            });
        }
        let offset = self
            .offset
            .and_then(|start| element_offset(start, beam, self.width, 0));
        read_sample(self.buf, offset, self.width)
    }

    /// Like [`try_get`](Self::try_get), discarding the error
    pub fn get(&self, beam: usize) -> Option<u32> {
        self.try_get(beam).ok()
    }

    /// Samples in beam order
    pub fn iter(&self) -> impl Iterator<Item = u32> + 'a {
        let row = *self;
        (0..row.beams).filter_map(move |b| row.get(b))
    }

    /// Raw sample bytes of this row
    ///
    /// Empty if the row does not lie inside the frame.
    pub fn as_bytes(&self) -> &'a [u8] {
        let range = self
            .offset
            .and_then(|start| Some(start..element_offset(start, self.beams, self.width, 0)?));
        let bytes = range.clone().and_then(|r| self.buf.get(r));
        debug_assert!(bytes.is_some(), "row {:?} outside frame", range);
        bytes.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::DataSize;
    use crate::geometry::RowLayout;

    #[test]
    fn test_bearings_are_signed() {
        let mut buf = vec![0u8; 10];
        buf[4..6].copy_from_slice(&(-4500i16).to_le_bytes());
        buf[6..8].copy_from_slice(&4500i16.to_le_bytes());
        let view = BearingView::new(&buf, 4, 2);
        assert_eq!(view.get(0), Some(-4500));
        assert_eq!(view.degrees(1), Some(45.0));
        assert_eq!(view.get(2), None);
        assert_eq!(
            view.try_get(2),
            Err(IndexError::OutOfBounds { index: 2, len: 2 })
        );
        assert_eq!(view.iter().collect::<Vec<_>>(), vec![-4500, 4500]);
    }

    #[test]
    fn test_plain_image_rows() {
        let buf: Vec<u8> = (0u8..10).collect();
        let geom = SamplingGeometry::new(DataSize::Bits8, 4, 2, RowLayout::Plain);
        let image = ImageView::new(&buf, geom, 2);
        assert_eq!(image.at(0, 0), Ok(2));
        assert_eq!(image.at(1, 3), Ok(9));
        assert_eq!(image.row(1).unwrap().as_bytes(), &[6, 7, 8, 9]);
        assert!(GainView::new(&buf, &geom, 2).is_none());
    }

    #[test]
    fn test_gain_prefixed_rows() {
        // Two rows of [gain:4][2 x u16]
        let mut buf = Vec::new();
        for (gain, samples) in [(7u32, [1u16, 2]), (9u32, [300u16, 400])] {
            buf.extend_from_slice(&gain.to_le_bytes());
            for s in samples {
                buf.extend_from_slice(&s.to_le_bytes());
            }
        }
        let geom = SamplingGeometry::new(DataSize::Bits16, 2, 2, RowLayout::GainPrefixed);
        let gains = GainView::new(&buf, &geom, 0).unwrap();
        assert_eq!(gains.iter().collect::<Vec<_>>(), vec![7, 9]);

        let image = ImageView::new(&buf, geom, 0);
        assert_eq!(image.at(0, 1), Ok(2));
        assert_eq!(image.at(1, 0), Ok(300));
        assert_eq!(
            image.rows().map(|r| r.iter().collect::<Vec<_>>()).collect::<Vec<_>>(),
            vec![vec![1, 2], vec![300, 400]]
        );
    }

    #[test]
    fn test_out_of_range_index() {
        let buf = [0u8; 8];
        let geom = SamplingGeometry::new(DataSize::Bits8, 4, 2, RowLayout::Plain);
        let image = ImageView::new(&buf, geom, 0);
        let expected = |range, beam| IndexError::OutOfRange {
            range,
            beam,
            ranges: 2,
            beams: 4,
        };
        assert_eq!(image.at(2, 0), Err(expected(2, 0)));
        assert_eq!(image.at(0, 4), Err(expected(0, 4)));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside")]
    fn test_geometry_larger_than_buffer_panics_in_debug() {
        let buf = [0u8; 4];
        let geom = SamplingGeometry::new(DataSize::Bits8, 4, 2, RowLayout::Plain);
        let _ = ImageView::new(&buf, geom, 0).at(1, 0);
    }

    fn overflowing_views(buf: &[u8]) -> (ImageView<'_>, GainView<'_>, BearingView<'_>) {
        let geom = SamplingGeometry::new(DataSize::Bits8, 4, 2, RowLayout::GainPrefixed);
        let offset = usize::MAX - 1;
        (
            ImageView::new(buf, geom, offset),
            GainView::new(buf, &geom, offset).unwrap(),
            BearingView::new(buf, offset, 4),
        )
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside")]
    fn test_overflowing_offset_panics_in_debug() {
        let buf: Vec<u8> = (0u8..32).collect();
        let (image, _, _) = overflowing_views(&buf);
        let _ = image.at(0, 0);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_overflowing_offset_is_corrupt_in_release() {
        let buf: Vec<u8> = (0u8..32).collect();
        let (image, gains, bearings) = overflowing_views(&buf);
        let corrupt = IndexError::Corrupt {
            offset: usize::MAX,
            len: 32,
        };
        assert_eq!(image.at(0, 0), Err(corrupt.clone()));
        assert_eq!(gains.try_get(1), Err(corrupt.clone()));
        assert_eq!(bearings.try_get(2), Err(corrupt));
        assert!(image.row(0).unwrap().as_bytes().is_empty());
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_geometry_larger_than_buffer_is_recoverable_in_release() {
        let buf = [0u8; 4];
        let geom = SamplingGeometry::new(DataSize::Bits8, 4, 2, RowLayout::Plain);
        assert_eq!(
            ImageView::new(&buf, geom, 0).at(1, 0),
            Err(IndexError::Corrupt { offset: 4, len: 4 })
        );
    }
}
