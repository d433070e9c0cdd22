//! Synthetic frame encoders
//!
//! Produce well-formed simple ping results and status datagrams with known
//! contents. Every header field can be overridden, which makes it easy to
//! build frames that the validator must reject.

use std::net::Ipv4Addr;

use crate::flags::{DataSize, FLAG_SEND_GAIN};
use crate::geometry::GAIN_BYTES;
use crate::header::{MessageType, HEADER_SIZE, OCULUS_CHECK_ID};
use crate::layout::{Revision, TimeField};
use crate::status::{self, STATUS_MSG_SIZE};
use crate::wire::{write_f64, write_i16, write_u16, write_u32};

/// Builder for simple ping result frames
#[derive(Debug, Clone)]
pub struct PingBuilder {
    revision: Revision,
    n_beams: u16,
    n_ranges: u16,
    data_size: DataSize,
    data_size_code: Option<u8>,
    flags: u8,
    oculus_id: u16,
    msg_type: MessageType,
    ping_id: u32,
    range_resolution: f64,
    attitude: (f64, f64, f64),
    bearings: Vec<i16>,
    gains: Vec<u32>,
    image: Vec<u32>,
    image_size: Option<u32>,
    image_offset: Option<u32>,
}

impl PingBuilder {
    /// A frame with `n_beams` x `n_ranges` 8-bit samples and no gain
    pub fn new(revision: Revision, n_beams: u16, n_ranges: u16) -> Self {
        Self {
            revision,
            n_beams,
            n_ranges,
            data_size: DataSize::Bits8,
            data_size_code: None,
            flags: 0,
            oculus_id: OCULUS_CHECK_ID,
            msg_type: MessageType::SimplePingResult,
            ping_id: 0,
            range_resolution: 0.01,
            attitude: (0.0, 0.0, 0.0),
            bearings: Vec::new(),
            gains: Vec::new(),
            image: Vec::new(),
            image_size: None,
            image_offset: None,
        }
    }

    pub fn data_size(mut self, data_size: DataSize) -> Self {
        self.data_size = data_size;
        self
    }

    /// Write a raw data size code instead of a known encoding
    pub fn data_size_code(mut self, code: u8) -> Self {
        self.data_size_code = Some(code);
        self
    }

    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn oculus_id(mut self, id: u16) -> Self {
        self.oculus_id = id;
        self
    }

    pub fn message_type(mut self, msg_type: MessageType) -> Self {
        self.msg_type = msg_type;
        self
    }

    pub fn ping_id(mut self, ping_id: u32) -> Self {
        self.ping_id = ping_id;
        self
    }

    pub fn range_resolution(mut self, metres: f64) -> Self {
        self.range_resolution = metres;
        self
    }

    /// Heading, pitch and roll (written by the current revision only)
    pub fn attitude(mut self, heading: f64, pitch: f64, roll: f64) -> Self {
        self.attitude = (heading, pitch, roll);
        self
    }

    /// Bearings per beam; missing entries get a default fan
    pub fn bearings(mut self, bearings: Vec<i16>) -> Self {
        self.bearings = bearings;
        self
    }

    /// Gains per range bin (only written when the gain flag is set)
    pub fn gains(mut self, gains: Vec<u32>) -> Self {
        self.gains = gains;
        self
    }

    /// Samples in row-major (range, beam) order, truncated to the sample width
    pub fn image(mut self, samples: Vec<u32>) -> Self {
        self.image = samples;
        self
    }

    /// Declare an image size other than the real one
    pub fn image_size(mut self, size: u32) -> Self {
        self.image_size = Some(size);
        self
    }

    /// Place the image at a specific offset
    pub fn image_offset(mut self, offset: u32) -> Self {
        self.image_offset = Some(offset);
        self
    }

    fn sample_width(&self) -> usize {
        let code = self.data_size_code.unwrap_or(self.data_size.code());
        DataSize::try_from(code).map(|d| d.bytes()).unwrap_or(1)
    }

    /// Encode the frame
    pub fn build(&self) -> Vec<u8> {
        let layout = self.revision.layout();
        let beams = usize::from(self.n_beams);
        let ranges = usize::from(self.n_ranges);
        let width = self.sample_width();
        let gain = self.flags & FLAG_SEND_GAIN != 0;
        let row_header = if gain { GAIN_BYTES } else { 0 };
        let stride = width * beams + row_header;
        let image_bytes = stride * ranges;

        let bearings_end = layout.fixed_size + 2 * beams;
        // Image data must start strictly after the fixed header, even with no beams
        let image_offset = self
            .image_offset
            .map_or(bearings_end.max(layout.fixed_size + 1), |o| o as usize);
        let len = bearings_end.max(image_offset + image_bytes);
        let mut buf = vec![0u8; len];

        write_u16(&mut buf, 0, self.oculus_id);
        write_u16(&mut buf, 6, self.msg_type.id());
        write_u16(&mut buf, 8, self.revision.version());
        write_u32(&mut buf, 10, (len - HEADER_SIZE) as u32);

        buf[layout.master_mode] = 2;
        buf[layout.ping_rate] = 0;
        buf[layout.network_speed] = 0xFF;
        buf[layout.gamma_correction] = 0x7F;
        buf[layout.flags] = self.flags;
        write_f64(&mut buf, layout.range, 10.0);
        write_f64(&mut buf, layout.gain_percent, 50.0);
        write_f64(&mut buf, layout.speed_of_sound, 1500.0);
        write_f64(&mut buf, layout.salinity, 0.0);

        write_u32(&mut buf, layout.ping_id, self.ping_id);
        write_f64(&mut buf, layout.frequency, 2.1e6);
        write_f64(&mut buf, layout.temperature, 12.5);
        write_f64(&mut buf, layout.pressure, 1.0);
        let (heading, pitch, roll) = self.attitude;
        for (field, value) in [(layout.heading, heading), (layout.pitch, pitch), (layout.roll, roll)] {
            if let Some(off) = field {
                write_f64(&mut buf, off, value);
            }
        }
        write_f64(&mut buf, layout.speed_of_sound_used, 1490.5);
        match layout.ping_start_time {
            TimeField::U32(off) => write_u32(&mut buf, off, 1234),
            TimeField::F64(off) => write_f64(&mut buf, off, 1234.5),
        }
        buf[layout.data_size] = self.data_size_code.unwrap_or(self.data_size.code());
        write_f64(&mut buf, layout.range_resolution, self.range_resolution);
        write_u16(&mut buf, layout.n_ranges, self.n_ranges);
        write_u16(&mut buf, layout.n_beams, self.n_beams);
        write_u32(&mut buf, layout.image_offset, image_offset as u32);
        write_u32(
            &mut buf,
            layout.image_size,
            self.image_size.unwrap_or(image_bytes as u32),
        );
        write_u32(&mut buf, layout.message_size, len as u32);

        for beam in 0..beams {
            let bearing = self
                .bearings
                .get(beam)
                .copied()
                .unwrap_or((beam as i32 * 100 - beams as i32 * 50) as i16);
            write_i16(&mut buf, layout.fixed_size + 2 * beam, bearing);
        }

        for range in 0..ranges {
            let row = image_offset + range * stride;
            if gain {
                let value = self.gains.get(range).copied().unwrap_or(range as u32);
                write_u32(&mut buf, row, value);
            }
            for beam in 0..beams {
                let index = range * beams + beam;
                let sample = self.image.get(index).copied().unwrap_or(index as u32);
                let at = row + row_header + beam * width;
                match width {
                    1 => buf[at] = sample as u8,
                    2 => write_u16(&mut buf, at, sample as u16),
                    _ => write_u32(&mut buf, at, sample),
                }
            }
        }

        buf
    }
}

/// Builder for status datagrams
#[derive(Debug, Clone)]
pub struct StatusBuilder {
    oculus_id: u16,
    device_id: u32,
    part_number: u16,
    ip_addr: Ipv4Addr,
    ip_mask: Ipv4Addr,
    connected_ip: Ipv4Addr,
    mac: [u8; 6],
    firmware_version: u32,
}

impl StatusBuilder {
    pub fn new(device_id: u32, ip_addr: Ipv4Addr) -> Self {
        Self {
            oculus_id: OCULUS_CHECK_ID,
            device_id,
            part_number: 0,
            ip_addr,
            ip_mask: Ipv4Addr::new(255, 255, 255, 0),
            connected_ip: Ipv4Addr::UNSPECIFIED,
            mac: [0x00, 0x1B, 0x4F, 0x00, 0x00, 0x01],
            firmware_version: 0x0201_0000,
        }
    }

    pub fn oculus_id(mut self, id: u16) -> Self {
        self.oculus_id = id;
        self
    }

    pub fn part_number(mut self, part_number: u16) -> Self {
        self.part_number = part_number;
        self
    }

    pub fn connected_ip(mut self, ip: Ipv4Addr) -> Self {
        self.connected_ip = ip;
        self
    }

    pub fn firmware_version(mut self, version: u32) -> Self {
        self.firmware_version = version;
        self
    }

    /// Encode the datagram
    pub fn build(&self) -> Vec<u8> {
        let mut buf = vec![0u8; STATUS_MSG_SIZE];
        write_u16(&mut buf, 0, self.oculus_id);
        write_u16(&mut buf, 6, MessageType::Dummy.id());
        write_u32(&mut buf, 10, (STATUS_MSG_SIZE - HEADER_SIZE) as u32);

        write_u32(&mut buf, status::OFF_DEVICE_ID, self.device_id);
        write_u16(&mut buf, status::OFF_PART_NUMBER, self.part_number);
        write_u32(&mut buf, status::OFF_VERSIONS, self.firmware_version);
        buf[status::OFF_IP_ADDR..status::OFF_IP_ADDR + 4].copy_from_slice(&self.ip_addr.octets());
        buf[status::OFF_IP_MASK..status::OFF_IP_MASK + 4].copy_from_slice(&self.ip_mask.octets());
        buf[status::OFF_CONNECTED_IP..status::OFF_CONNECTED_IP + 4]
            .copy_from_slice(&self.connected_ip.octets());
        buf[status::OFF_MAC..status::OFF_MAC + 6].copy_from_slice(&self.mac);
        for i in 0..status::TEMPERATURE_COUNT {
            write_f64(&mut buf, status::OFF_TEMPERATURES + 8 * i, 20.0 + i as f64);
        }
        write_f64(&mut buf, status::OFF_PRESSURE, 1.0);
        buf
    }
}
