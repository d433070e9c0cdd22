//! Sonar status datagram
//!
//! The sonar broadcasts a fixed-size status message on UDP port 52102 about
//! once a second. It identifies the device and the address its data port
//! listens on, which is how clients find a sonar without configuration.
//!
//! IP addresses are carried as four bytes in network order.

use std::net::Ipv4Addr;

use crate::error::FrameError;
use crate::header::{MessageHeader, HEADER_SIZE};
use crate::wire::{read_f64, read_u16, read_u32};

/// Well-known UDP port of the status broadcast
pub const STATUS_PORT: u16 = 52102;
/// Size of a status datagram in bytes
pub const STATUS_MSG_SIZE: usize = 142;

pub(crate) const OFF_DEVICE_ID: usize = HEADER_SIZE;
pub(crate) const OFF_DEVICE_TYPE: usize = 20;
pub(crate) const OFF_PART_NUMBER: usize = 22;
pub(crate) const OFF_STATUS: usize = 24;
pub(crate) const OFF_VERSIONS: usize = 28;
pub(crate) const OFF_IP_ADDR: usize = 52;
pub(crate) const OFF_IP_MASK: usize = 56;
pub(crate) const OFF_CONNECTED_IP: usize = 60;
pub(crate) const OFF_MAC: usize = 64;
pub(crate) const OFF_TEMPERATURES: usize = 70;
pub(crate) const OFF_PRESSURE: usize = 134;
pub(crate) const TEMPERATURE_COUNT: usize = 8;

/// Firmware versions and build dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionInfo {
    pub arm0_version: u32,
    pub arm0_date: u32,
    pub arm1_version: u32,
    pub arm1_date: u32,
    pub bitfile_version: u32,
    pub bitfile_date: u32,
}

/// Parsed status datagram
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SonarStatus {
    pub header: MessageHeader,
    pub device_id: u32,
    pub device_type: u16,
    pub part_number: u16,
    pub status: u32,
    pub versions: VersionInfo,
    /// Address of the sonar's data port
    pub ip_addr: Ipv4Addr,
    pub ip_mask: Ipv4Addr,
    /// Client currently connected to the sonar, if any
    pub connected_ip: Ipv4Addr,
    pub mac: [u8; 6],
    pub temperatures: [f64; TEMPERATURE_COUNT],
    pub pressure: f64,
}

fn ipv4_at(buf: &[u8], offset: usize) -> Option<Ipv4Addr> {
    let octets: [u8; 4] = buf.get(offset..offset + 4)?.try_into().ok()?;
    Some(Ipv4Addr::from(octets))
}

impl SonarStatus {
    /// Parse a status datagram
    ///
    /// Only the size is checked; whether the magic must match is up to the
    /// caller (see [`SonarStatus::magic_valid`]).
    pub fn parse(buf: &[u8]) -> Result<Self, FrameError> {
        let short = || FrameError::TooShort {
            needed: STATUS_MSG_SIZE,
            actual: buf.len(),
        };
        if buf.len() < STATUS_MSG_SIZE {
            return Err(short());
        }

        let header = MessageHeader::parse_unchecked(buf)?;
        let u32_at = |off| read_u32(buf, off).ok_or_else(short);

        let mut temperatures = [0.0; TEMPERATURE_COUNT];
        for (i, t) in temperatures.iter_mut().enumerate() {
            *t = read_f64(buf, OFF_TEMPERATURES + 8 * i).ok_or_else(short)?;
        }

        Ok(Self {
            header,
            device_id: u32_at(OFF_DEVICE_ID)?,
            device_type: read_u16(buf, OFF_DEVICE_TYPE).ok_or_else(short)?,
            part_number: read_u16(buf, OFF_PART_NUMBER).ok_or_else(short)?,
            status: u32_at(OFF_STATUS)?,
            versions: VersionInfo {
                arm0_version: u32_at(OFF_VERSIONS)?,
                arm0_date: u32_at(OFF_VERSIONS + 4)?,
                arm1_version: u32_at(OFF_VERSIONS + 8)?,
                arm1_date: u32_at(OFF_VERSIONS + 12)?,
                bitfile_version: u32_at(OFF_VERSIONS + 16)?,
                bitfile_date: u32_at(OFF_VERSIONS + 20)?,
            },
            ip_addr: ipv4_at(buf, OFF_IP_ADDR).ok_or_else(short)?,
            ip_mask: ipv4_at(buf, OFF_IP_MASK).ok_or_else(short)?,
            connected_ip: ipv4_at(buf, OFF_CONNECTED_IP).ok_or_else(short)?,
            mac: buf
                .get(OFF_MAC..OFF_MAC + 6)
                .and_then(|m| m.try_into().ok())
                .ok_or_else(short)?,
            temperatures,
            pressure: read_f64(buf, OFF_PRESSURE).ok_or_else(short)?,
        })
    }

    /// Whether the header carries the protocol magic
    pub fn magic_valid(&self) -> bool {
        self.header.is_valid()
    }

    /// MAC address as `aa:bb:cc:dd:ee:ff`
    pub fn mac_string(&self) -> String {
        self.mac
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":")
    }
}
