//! Fire-message flags and small enumerations carried in a ping

use crate::error::FrameError;
use crate::layout::HeaderLayout;
use crate::wire::read_u8;

/// Range field is in metres rather than percent
pub const FLAG_RANGE_IN_METERS: u8 = 0x01;
/// 16-bit image data requested
pub const FLAG_DATA_16BIT: u8 = 0x02;
/// Gain value prefixed to every image row
pub const FLAG_SEND_GAIN: u8 = 0x04;
/// Simple return message requested
pub const FLAG_SIMPLE_RETURN: u8 = 0x08;
/// Gain assistance enabled
pub const FLAG_GAIN_ASSIST: u8 = 0x10;
/// 512-beam mode
pub const FLAG_BEAMS_512: u8 = 0x40;

/// Decoded fire-message flag byte
///
/// Bits with no known meaning are kept in [`PingFlags::bits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PingFlags(u8);

impl PingFlags {
    /// Wrap a raw flag byte
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Read the flag byte at the layout's flag offset
    pub fn parse(buf: &[u8], layout: &HeaderLayout) -> Result<Self, FrameError> {
        read_u8(buf, layout.flags)
            .map(Self)
            .ok_or(FrameError::TooShort {
                needed: layout.flags + 1,
                actual: buf.len(),
            })
    }

    /// Raw flag byte, including uninterpreted bits
    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn range_in_meters(&self) -> bool {
        self.0 & FLAG_RANGE_IN_METERS != 0
    }

    pub fn data_16bit(&self) -> bool {
        self.0 & FLAG_DATA_16BIT != 0
    }

    /// Gain-present: each image row starts with a 32-bit gain value
    pub fn send_gain(&self) -> bool {
        self.0 & FLAG_SEND_GAIN != 0
    }

    pub fn simple_return(&self) -> bool {
        self.0 & FLAG_SIMPLE_RETURN != 0
    }

    pub fn gain_assist(&self) -> bool {
        self.0 & FLAG_GAIN_ASSIST != 0
    }

    pub fn beams_512(&self) -> bool {
        self.0 & FLAG_BEAMS_512 != 0
    }
}

/// Sample encoding of the image data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataSize {
    Bits8,
    Bits16,
    Bits32,
}

impl DataSize {
    /// Wire code for this encoding
    pub fn code(&self) -> u8 {
        match self {
            Self::Bits8 => 0,
            Self::Bits16 => 1,
            Self::Bits32 => 3,
        }
    }

    /// Bytes per sample
    pub fn bytes(&self) -> usize {
        match self {
            Self::Bits8 => 1,
            Self::Bits16 => 2,
            Self::Bits32 => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bits8 => "8 bit",
            Self::Bits16 => "16 bit",
            Self::Bits32 => "32 bit",
        }
    }
}

impl TryFrom<u8> for DataSize {
    type Error = FrameError;

    /// The device also defines code 2 (24 bit); it is not decoded.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Bits8),
            1 => Ok(Self::Bits16),
            3 => Ok(Self::Bits32),
            other => Err(FrameError::UnknownEncoding(other)),
        }
    }
}

/// Requested ping rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PingRate {
    Normal,
    High,
    Highest,
    Low,
    Lowest,
    Standby,
    Unknown(u8),
}

impl PingRate {
    /// Nominal rate in Hz, `None` if the code is unknown
    pub fn hz(&self) -> Option<u32> {
        match self {
            Self::Normal => Some(10),
            Self::High => Some(15),
            Self::Highest => Some(40),
            Self::Low => Some(5),
            Self::Lowest => Some(2),
            Self::Standby => Some(0),
            Self::Unknown(_) => None,
        }
    }
}

impl From<u8> for PingRate {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Normal,
            0x01 => Self::High,
            0x02 => Self::Highest,
            0x03 => Self::Low,
            0x04 => Self::Lowest,
            0x05 => Self::Standby,
            other => Self::Unknown(other),
        }
    }
}

/// Operating frequency mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MasterMode {
    LowFrequency,
    HighFrequency,
    Unknown(u8),
}

impl MasterMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LowFrequency => "Low frequency",
            Self::HighFrequency => "High frequency",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl From<u8> for MasterMode {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::LowFrequency,
            2 => Self::HighFrequency,
            other => Self::Unknown(other),
        }
    }
}
