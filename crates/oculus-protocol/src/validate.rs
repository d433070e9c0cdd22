//! Frame validation
//!
//! Runs the structural checks (lengths, magic) before any arithmetic on the
//! size fields, so a malformed frame is rejected before its counts are
//! multiplied. All size arithmetic is checked.

use tracing::warn;

use crate::error::FrameError;
use crate::flags::{DataSize, PingFlags};
use crate::geometry::{RowLayout, SamplingGeometry};
use crate::header::MessageHeader;
use crate::layout::HeaderLayout;
use crate::wire::{read_u16, read_u32, read_u8};

/// Check a ping frame and derive its sampling geometry
///
/// On success the buffer is guaranteed to contain the bearing table and the
/// whole image region, so views built from the returned geometry never read
/// past its end.
pub fn validate(
    buf: &[u8],
    header: &MessageHeader,
    flags: PingFlags,
    layout: &HeaderLayout,
) -> Result<SamplingGeometry, FrameError> {
    let len = buf.len();

    if len < layout.fixed_size {
        return Err(FrameError::TooShort {
            needed: layout.fixed_size,
            actual: len,
        });
    }

    let declared = header.declared_size();
    if (len as u64) < declared {
        return Err(FrameError::TooShort {
            needed: usize::try_from(declared).unwrap_or(usize::MAX),
            actual: len,
        });
    }

    if !header.is_valid() {
        return Err(FrameError::BadHeader {
            found: header.oculus_id,
        });
    }

    let short = FrameError::TooShort {
        needed: layout.fixed_size,
        actual: len,
    };
    let data_size = DataSize::try_from(read_u8(buf, layout.data_size).ok_or(short.clone())?)?;
    let n_ranges = read_u16(buf, layout.n_ranges).ok_or(short.clone())?;
    let n_beams = read_u16(buf, layout.n_beams).ok_or(short.clone())?;
    let image_offset = read_u32(buf, layout.image_offset).ok_or(short.clone())?;
    let image_size = read_u32(buf, layout.image_size).ok_or(short)?;

    let row_layout = RowLayout::from_send_gain(flags.send_gain());
    let expected = SamplingGeometry::expected_image_bytes(
        data_size,
        u64::from(n_beams),
        u64::from(n_ranges),
        row_layout,
    )
    .ok_or(FrameError::SizeMismatch {
        declared: u64::from(image_size),
        expected: u64::MAX,
    })?;

    if u64::from(image_size) != expected {
        warn!(
            "Image size in header {} does not match expected data size of {}",
            image_size, expected
        );
        return Err(FrameError::SizeMismatch {
            declared: u64::from(image_size),
            expected,
        });
    }

    if image_offset as usize <= layout.fixed_size {
        return Err(FrameError::BadOffset {
            offset: image_offset,
            header_size: layout.fixed_size,
        });
    }

    let bearings_end = layout.fixed_size as u64 + 2 * u64::from(n_beams);
    let image_end = u64::from(image_offset) + u64::from(image_size);
    for end in [bearings_end, image_end] {
        if end > len as u64 {
            return Err(FrameError::SizeMismatch {
                declared: len as u64,
                expected: end,
            });
        }
    }

    Ok(SamplingGeometry::new(
        data_size,
        usize::from(n_beams),
        usize::from(n_ranges),
        row_layout,
    ))
}
