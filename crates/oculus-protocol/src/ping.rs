//! Decoded simple ping result
//!
//! [`decode`] is the only way to obtain a [`PingFrame`]: it parses the common
//! header, picks the revision layout, validates the frame and only then builds
//! the bearing, gain and image views. A buffer that fails any check yields a
//! [`FrameError`] and no views.

use std::fmt;

use tracing::debug;

use crate::error::FrameError;
use crate::flags::{MasterMode, PingFlags, PingRate};
use crate::geometry::SamplingGeometry;
use crate::header::{MessageHeader, MessageType};
use crate::layout::{HeaderLayout, Revision, TimeField};
use crate::validate::validate;
use crate::views::{BearingView, GainView, ImageView};
use crate::wire::{read_f64, read_u32, read_u8};

/// Scalar fields of the fixed ping header
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PingInfo {
    pub master_mode: MasterMode,
    pub ping_rate: PingRate,
    pub network_speed: u8,
    pub gamma_correction: u8,
    /// Requested range (metres or percent, see [`PingFlags::range_in_meters`])
    pub range: f64,
    pub gain_percent: f64,
    pub speed_of_sound: f64,
    pub salinity: f64,
    pub ext_flags: Option<u32>,
    pub ping_id: u32,
    pub status: u32,
    pub frequency: f64,
    pub temperature: f64,
    pub pressure: f64,
    pub heading: Option<f64>,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub speed_of_sound_used: f64,
    pub ping_start_time: f64,
    /// Metres per range bin
    pub range_resolution: f64,
    pub image_offset: u32,
    pub image_size: u32,
    pub message_size: u32,
}

impl PingInfo {
    /// Read the scalar fields described by `layout`
    pub fn parse(buf: &[u8], layout: &HeaderLayout) -> Result<Self, FrameError> {
        let short = || FrameError::TooShort {
            needed: layout.fixed_size,
            actual: buf.len(),
        };
        let u8_at = |off| read_u8(buf, off).ok_or_else(short);
        let u32_at = |off| read_u32(buf, off).ok_or_else(short);
        let f64_at = |off| read_f64(buf, off).ok_or_else(short);
        let opt_f64 = |off: Option<usize>| off.map(f64_at).transpose();

        Ok(Self {
            master_mode: u8_at(layout.master_mode)?.into(),
            ping_rate: u8_at(layout.ping_rate)?.into(),
            network_speed: u8_at(layout.network_speed)?,
            gamma_correction: u8_at(layout.gamma_correction)?,
            range: f64_at(layout.range)?,
            gain_percent: f64_at(layout.gain_percent)?,
            speed_of_sound: f64_at(layout.speed_of_sound)?,
            salinity: f64_at(layout.salinity)?,
            ext_flags: layout.ext_flags.map(u32_at).transpose()?,
            ping_id: u32_at(layout.ping_id)?,
            status: u32_at(layout.status)?,
            frequency: f64_at(layout.frequency)?,
            temperature: f64_at(layout.temperature)?,
            pressure: f64_at(layout.pressure)?,
            heading: opt_f64(layout.heading)?,
            pitch: opt_f64(layout.pitch)?,
            roll: opt_f64(layout.roll)?,
            speed_of_sound_used: f64_at(layout.speed_of_sound_used)?,
            ping_start_time: match layout.ping_start_time {
                TimeField::U32(off) => f64::from(u32_at(off)?),
                TimeField::F64(off) => f64_at(off)?,
            },
            range_resolution: f64_at(layout.range_resolution)?,
            image_offset: u32_at(layout.image_offset)?,
            image_size: u32_at(layout.image_size)?,
            message_size: u32_at(layout.message_size)?,
        })
    }
}

/// A validated simple ping result borrowing its buffer
#[derive(Debug, Clone, Copy)]
pub struct PingFrame<'a> {
    buf: &'a [u8],
    header: MessageHeader,
    layout: &'static HeaderLayout,
    flags: PingFlags,
    info: PingInfo,
    geometry: SamplingGeometry,
    bearings: BearingView<'a>,
    gains: Option<GainView<'a>>,
    image: ImageView<'a>,
}

/// Decode and validate one simple ping result
pub fn decode(buf: &[u8]) -> Result<PingFrame<'_>, FrameError> {
    let header = MessageHeader::parse(buf)?;
    if header.msg_type != MessageType::SimplePingResult {
        return Err(FrameError::UnsupportedMessage(header.msg_type.id()));
    }

    let layout = Revision::from_version(header.msg_version).layout();
    let flags = PingFlags::parse(buf, layout).map_err(|_| FrameError::TooShort {
        needed: layout.fixed_size,
        actual: buf.len(),
    })?;

    let geometry = validate(buf, &header, flags, layout)?;
    let info = PingInfo::parse(buf, layout)?;
    let image_offset = info.image_offset as usize;

    Ok(PingFrame {
        buf,
        header,
        layout,
        flags,
        info,
        geometry,
        bearings: BearingView::new(buf, layout.fixed_size, geometry.beam_count),
        gains: GainView::new(buf, &geometry, image_offset),
        image: ImageView::new(buf, geometry, image_offset),
    })
}

impl<'a> PingFrame<'a> {
    /// Wire revision the frame was decoded with
    pub fn revision(&self) -> Revision {
        self.layout.revision
    }

    /// Common message header
    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// Fire-message flags
    pub fn flags(&self) -> PingFlags {
        self.flags
    }

    /// All scalar header fields
    pub fn info(&self) -> &PingInfo {
        &self.info
    }

    /// Layout of the image data
    pub fn geometry(&self) -> &SamplingGeometry {
        &self.geometry
    }

    /// Number of beams (image columns)
    pub fn beam_count(&self) -> usize {
        self.geometry.beam_count
    }

    /// Number of range bins (image rows)
    pub fn range_count(&self) -> usize {
        self.geometry.range_count
    }

    /// Bearing of each beam
    pub fn bearings(&self) -> BearingView<'a> {
        self.bearings
    }

    /// Per-range gains, present only when the frame was sent with gain
    pub fn gains(&self) -> Option<GainView<'a>> {
        self.gains
    }

    /// Range x beam intensity grid
    pub fn image(&self) -> ImageView<'a> {
        self.image
    }

    /// Always true: invalid frames are rejected by [`decode`]
    pub fn is_valid(&self) -> bool {
        true
    }

    /// The underlying frame bytes
    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Sequence number of the ping
    pub fn ping_id(&self) -> u32 {
        self.info.ping_id
    }

    /// Device status word
    pub fn status(&self) -> u32 {
        self.info.status
    }

    /// Operating frequency in Hz
    pub fn frequency(&self) -> f64 {
        self.info.frequency
    }

    /// Water temperature in degrees Celsius
    pub fn temperature(&self) -> f64 {
        self.info.temperature
    }

    /// Pressure sensor reading in bar
    pub fn pressure(&self) -> f64 {
        self.info.pressure
    }

    /// Speed of sound used for ranging, in m/s
    pub fn speed_of_sound_used(&self) -> f64 {
        self.info.speed_of_sound_used
    }

    /// Metres per range bin
    pub fn range_resolution(&self) -> f64 {
        self.info.range_resolution
    }

    /// Start time of the ping in seconds since sonar power-up
    pub fn ping_start_time(&self) -> f64 {
        self.info.ping_start_time
    }

    /// Frequency mode the ping was fired in
    pub fn master_mode(&self) -> MasterMode {
        self.info.master_mode
    }

    /// Requested ping rate
    pub fn ping_rate(&self) -> PingRate {
        self.info.ping_rate
    }

    /// Requested range (metres or percent, see [`PingFlags::range_in_meters`])
    pub fn range(&self) -> f64 {
        self.info.range
    }

    /// Requested gain in percent
    pub fn gain_percent(&self) -> f64 {
        self.info.gain_percent
    }

    /// Heading in degrees (current revision only)
    pub fn heading(&self) -> Option<f64> {
        self.info.heading
    }

    /// Pitch in degrees (current revision only)
    pub fn pitch(&self) -> Option<f64> {
        self.info.pitch
    }

    /// Roll in degrees (current revision only)
    pub fn roll(&self) -> Option<f64> {
        self.info.roll
    }

    /// Extended fire flags (current revision only)
    pub fn ext_flags(&self) -> Option<u32> {
        self.info.ext_flags
    }

    /// One-line description, as used in logs
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// Log every header field at debug level
    pub fn dump(&self) {
        debug!("--------------");
        self.header.dump();
        debug!("    Revision: {}", self.revision().name());
        debug!("        Mode: {}", self.info.master_mode.name());
        match self.info.ping_rate.hz() {
            Some(hz) => debug!("   Ping rate: {}", hz),
            None => debug!("   Ping rate: (unknown) {:?}", self.info.ping_rate),
        }
        debug!("     Ping ID: {}", self.info.ping_id);
        debug!("      Status: {}", self.info.status);
        debug!("   Ping start time: {}", self.info.ping_start_time);
        debug!("   Frequency: {}", self.info.frequency);
        debug!(" Temperature: {}", self.info.temperature);
        debug!("    Pressure: {}", self.info.pressure);
        if let (Some(heading), Some(pitch), Some(roll)) =
            (self.info.heading, self.info.pitch, self.info.roll)
        {
            debug!("     Heading: {}", heading);
            debug!("       Pitch: {}", pitch);
            debug!("        Roll: {}", roll);
        }
        debug!("Spd of Sound: {}", self.info.speed_of_sound_used);
        debug!("   Range res: {} m", self.info.range_resolution);
        debug!("   Num range: {}", self.range_count());
        debug!("   Num beams: {}", self.beam_count());
        debug!("  Image size: {}", self.info.image_size);
        debug!("Image offset: {}", self.info.image_offset);
        debug!("   Data size: {}", self.geometry.data_size.name());
        debug!(
            "   Send gain: {}",
            if self.flags.send_gain() { "Yes" } else { "No" }
        );
        debug!("Message size: {}", self.info.message_size);
        debug!("--------------");
    }
}

impl fmt::Display for PingFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{}: {} ranges x {} beams, {}{}, {:.3} m/bin",
            self.revision().name(),
            self.info.ping_id,
            self.range_count(),
            self.beam_count(),
            self.geometry.data_size.name(),
            if self.flags.send_gain() { " + gain" } else { "" },
            self.info.range_resolution,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::PingBuilder;
    use crate::flags::{DataSize, FLAG_SEND_GAIN};
    use crate::layout::{CURRENT, LEGACY};

    #[test]
    fn test_empty_buffer() {
        assert_eq!(
            decode(&[]).unwrap_err(),
            FrameError::TooShort {
                needed: 16,
                actual: 0
            }
        );
    }

    #[test]
    fn test_minimal_legacy_scenario() {
        let image: Vec<u32> = (1..=8).collect();
        let buf = PingBuilder::new(Revision::Legacy, 4, 2)
            .image(image.clone())
            .build();
        let ping = decode(&buf).unwrap();

        assert_eq!(ping.revision(), Revision::Legacy);
        assert!(ping.is_valid());
        assert!(ping.gains().is_none());
        let rows: Vec<Vec<u32>> = ping.image().rows().map(|r| r.iter().collect()).collect();
        assert_eq!(rows, vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
        assert_eq!(ping.image().row(1).unwrap().as_bytes(), &[5, 6, 7, 8]);
    }

    #[test]
    fn test_declared_image_one_byte_short() {
        let buf = PingBuilder::new(Revision::Legacy, 4, 2).image_size(7).build();
        assert!(matches!(
            decode(&buf),
            Err(FrameError::SizeMismatch {
                declared: 7,
                expected: 8
            })
        ));
    }

    #[test]
    fn test_gain_scenario() {
        let buf = PingBuilder::new(Revision::Current, 5, 3)
            .data_size(DataSize::Bits16)
            .flags(FLAG_SEND_GAIN)
            .gains(vec![100, 200, 300])
            .image((0..15).map(|v| v * 1000).collect())
            .build();
        let ping = decode(&buf).unwrap();

        assert_eq!(ping.info().image_size, 42);
        let gains = ping.gains().unwrap();
        assert_eq!(gains.iter().collect::<Vec<_>>(), vec![100, 200, 300]);
        assert_eq!(ping.image().at(2, 4), Ok(14_000));
        assert_eq!(ping.image().at(0, 0), Ok(0));
    }

    #[test]
    fn test_current_only_fields() {
        let buf = PingBuilder::new(Revision::Current, 2, 2)
            .ping_id(77)
            .attitude(90.0, 1.5, -2.5)
            .build();
        let ping = decode(&buf).unwrap();
        assert_eq!(ping.revision(), Revision::Current);
        assert_eq!(ping.ping_id(), 77);
        assert_eq!(ping.info().heading, Some(90.0));
        assert_eq!(ping.info().roll, Some(-2.5));
        assert_eq!(ping.bearings().len(), 2);

        let legacy = PingBuilder::new(Revision::Legacy, 2, 2).build();
        assert_eq!(decode(&legacy).unwrap().info().heading, None);
    }

    #[test]
    fn test_scalar_accessors() {
        let buf = PingBuilder::new(Revision::Current, 3, 2)
            .ping_id(12)
            .range_resolution(0.005)
            .attitude(180.0, -1.0, 2.0)
            .build();
        let ping = decode(&buf).unwrap();
        assert_eq!(ping.ping_id(), 12);
        assert_eq!(ping.status(), 0);
        assert_eq!(ping.frequency(), 2.1e6);
        assert_eq!(ping.temperature(), 12.5);
        assert_eq!(ping.pressure(), 1.0);
        assert_eq!(ping.speed_of_sound_used(), 1490.5);
        assert_eq!(ping.range_resolution(), 0.005);
        assert_eq!(ping.ping_start_time(), 1234.5);
        assert_eq!(ping.master_mode(), MasterMode::HighFrequency);
        assert_eq!(ping.ping_rate(), PingRate::Normal);
        assert_eq!(ping.range(), 10.0);
        assert_eq!(ping.gain_percent(), 50.0);
        assert_eq!(ping.heading(), Some(180.0));
        assert_eq!(ping.pitch(), Some(-1.0));
        assert_eq!(ping.roll(), Some(2.0));
        assert_eq!(ping.ext_flags(), Some(0));
        assert_eq!(ping.summary(), "SimplePingResult v2 #12: 2 ranges x 3 beams, 8 bit, 0.005 m/bin");

        let legacy = PingBuilder::new(Revision::Legacy, 3, 2).build();
        let legacy = decode(&legacy).unwrap();
        assert_eq!(legacy.ping_start_time(), 1234.0);
        assert_eq!(legacy.ext_flags(), None);
        assert_eq!(legacy.roll(), None);
    }

    #[test]
    fn test_header_size_rejections() {
        let legacy = PingBuilder::new(Revision::Legacy, 2, 2).build();
        assert!(matches!(
            decode(&legacy[..LEGACY.fixed_size - 10]),
            Err(FrameError::TooShort { needed, .. }) if needed == LEGACY.fixed_size
        ));

        let current = PingBuilder::new(Revision::Current, 2, 2).build();
        assert!(matches!(
            decode(&current[..CURRENT.fixed_size - 1]),
            Err(FrameError::TooShort { needed, .. }) if needed == CURRENT.fixed_size
        ));
        // Too short even for the flag byte
        assert!(matches!(
            decode(&current[..18]),
            Err(FrameError::TooShort { needed, .. }) if needed == CURRENT.fixed_size
        ));
    }

    #[test]
    fn test_other_message_types_rejected() {
        let buf = PingBuilder::new(Revision::Legacy, 2, 2)
            .message_type(MessageType::Dummy)
            .build();
        assert_eq!(decode(&buf).unwrap_err(), FrameError::UnsupportedMessage(0xFF));
    }

    #[test]
    fn test_display_summary() {
        let buf = PingBuilder::new(Revision::Legacy, 4, 2).ping_id(3).build();
        let text = decode(&buf).unwrap().to_string();
        assert!(text.starts_with("SimplePingResult v1 #3: 2 ranges x 4 beams"));
    }
}
