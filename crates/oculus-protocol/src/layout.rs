//! Per-revision layout of the simple ping result header
//!
//! Both revisions share the common header and the first five bytes of the
//! fire message. They differ in the size of the fire message, a few extra
//! fields (heading/pitch/roll) and the width of the start time, which moves
//! every following field. A [`HeaderLayout`] records where each field sits so
//! that one validation path serves both.
//!
//! # Legacy (version != 2), 122 bytes
//! ```text
//! 0    common header (16)
//! 16   master_mode ping_rate network_speed gamma flags
//! 21   range gain speed_of_sound salinity         (f64 x4)
//! 53   ping_id status                             (u32 x2)
//! 61   frequency temperature pressure sos_used    (f64 x4)
//! 93   ping_start_time (u32)  data_size (u8)  range_resolution (f64)
//! 106  n_ranges n_beams (u16 x2)
//! 110  image_offset image_size message_size       (u32 x3)
//! ```
//!
//! # Current (version 2), 202 bytes
//! ```text
//! 53   ext_flags (u32), 8 reserved u32
//! 89   ping_id status
//! 97   frequency temperature pressure heading pitch roll sos_used ping_start_time (f64 x8)
//! 161  data_size (u8)  range_resolution (f64)
//! 170  n_ranges n_beams (u16 x2), 4 spare u32
//! 190  image_offset image_size message_size
//! ```

/// Wire format revision of a simple ping result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Revision {
    /// Original simple ping result
    Legacy,
    /// Simple ping result version 2
    Current,
}

impl Revision {
    /// Select the revision from the header's message version
    pub fn from_version(msg_version: u16) -> Self {
        if msg_version == 2 {
            Self::Current
        } else {
            Self::Legacy
        }
    }

    /// Message version written for this revision
    pub fn version(&self) -> u16 {
        match self {
            Self::Legacy => 1,
            Self::Current => 2,
        }
    }

    /// Field layout of this revision
    pub fn layout(&self) -> &'static HeaderLayout {
        match self {
            Self::Legacy => &LEGACY,
            Self::Current => &CURRENT,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Legacy => "SimplePingResult v1",
            Self::Current => "SimplePingResult v2",
        }
    }
}

/// Encoding of the ping start time field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    U32(usize),
    F64(usize),
}

/// Byte offsets of every frame-specific field for one revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    pub revision: Revision,
    /// Bytes up to the end of the fixed ping header; bearings follow
    pub fixed_size: usize,
    pub master_mode: usize,
    pub ping_rate: usize,
    pub network_speed: usize,
    pub gamma_correction: usize,
    pub flags: usize,
    pub range: usize,
    pub gain_percent: usize,
    pub speed_of_sound: usize,
    pub salinity: usize,
    pub ext_flags: Option<usize>,
    pub ping_id: usize,
    pub status: usize,
    pub frequency: usize,
    pub temperature: usize,
    pub pressure: usize,
    pub heading: Option<usize>,
    pub pitch: Option<usize>,
    pub roll: Option<usize>,
    pub speed_of_sound_used: usize,
    pub ping_start_time: TimeField,
    pub data_size: usize,
    pub range_resolution: usize,
    pub n_ranges: usize,
    pub n_beams: usize,
    pub image_offset: usize,
    pub image_size: usize,
    pub message_size: usize,
}

/// Legacy simple ping result
pub const LEGACY: HeaderLayout = HeaderLayout {
    revision: Revision::Legacy,
    fixed_size: 122,
    master_mode: 16,
    ping_rate: 17,
    network_speed: 18,
    gamma_correction: 19,
    flags: 20,
    range: 21,
    gain_percent: 29,
    speed_of_sound: 37,
    salinity: 45,
    ext_flags: None,
    ping_id: 53,
    status: 57,
    frequency: 61,
    temperature: 69,
    pressure: 77,
    heading: None,
    pitch: None,
    roll: None,
    speed_of_sound_used: 85,
    ping_start_time: TimeField::U32(93),
    data_size: 97,
    range_resolution: 98,
    n_ranges: 106,
    n_beams: 108,
    image_offset: 110,
    image_size: 114,
    message_size: 118,
};

/// Simple ping result version 2
pub const CURRENT: HeaderLayout = HeaderLayout {
    revision: Revision::Current,
    fixed_size: 202,
    master_mode: 16,
    ping_rate: 17,
    network_speed: 18,
    gamma_correction: 19,
    flags: 20,
    range: 21,
    gain_percent: 29,
    speed_of_sound: 37,
    salinity: 45,
    ext_flags: Some(53),
    ping_id: 89,
    status: 93,
    frequency: 97,
    temperature: 105,
    pressure: 113,
    heading: Some(121),
    pitch: Some(129),
    roll: Some(137),
    speed_of_sound_used: 145,
    ping_start_time: TimeField::F64(153),
    data_size: 161,
    range_resolution: 162,
    n_ranges: 170,
    n_beams: 172,
    image_offset: 190,
    image_size: 194,
    message_size: 198,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_from_version() {
        assert_eq!(Revision::from_version(2), Revision::Current);
        assert_eq!(Revision::from_version(1), Revision::Legacy);
        assert_eq!(Revision::from_version(0), Revision::Legacy);
        assert_eq!(Revision::from_version(Revision::Current.version()), Revision::Current);
        assert_eq!(Revision::from_version(Revision::Legacy.version()), Revision::Legacy);
    }

    #[test]
    fn test_last_field_ends_at_fixed_size() {
        for layout in [&LEGACY, &CURRENT] {
            assert_eq!(layout.message_size + 4, layout.fixed_size);
            assert_eq!(layout.n_beams, layout.n_ranges + 2);
            assert_eq!(layout.range_resolution, layout.data_size + 1);
        }
    }
}
