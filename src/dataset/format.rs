//! Dataset record layout and byte-order handling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Size of one dataset record in bytes: `start`, `end`, `kind`, each a `u32`.
pub const RECORD_SIZE: usize = 12;

/// Dataset location used when a unit does not name one.
pub const DEFAULT_DATASET_PATH: &str = "/etc/nginx/redblock_ranges.bin";

/// Byte order of the `u32` fields in a dataset file.
///
/// Datasets are written by the generator in the host's native order, so
/// `Native` is the default. The explicit orders exist for datasets moved
/// between machines of different endianness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Native,
    Little,
    Big,
}

impl ByteOrder {
    /// Decode a `u32` from four bytes in this order.
    #[inline]
    pub fn read_u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Native => u32::from_ne_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        }
    }

    /// Encode a `u32` into four bytes in this order.
    #[inline]
    pub fn write_u32(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Native => value.to_ne_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ByteOrder::Native => "native",
            ByteOrder::Little => "little",
            ByteOrder::Big => "big",
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ByteOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" | "ne" => Ok(ByteOrder::Native),
            "little" | "le" => Ok(ByteOrder::Little),
            "big" | "be" => Ok(ByteOrder::Big),
            other => Err(format!("unknown byte order: {}", other)),
        }
    }
}

/// A closed interval `[start, end]` of IPv4 addresses tagged with a
/// classification.
///
/// `kind` is opaque to the engine and is handed back to the caller on a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpRange {
    /// First address in the range (host order)
    pub start: u32,
    /// Last address in the range, inclusive (host order)
    pub end: u32,
    /// Classification tag
    pub kind: u32,
}

impl IpRange {
    pub const fn new(start: u32, end: u32, kind: u32) -> Self {
        Self { start, end, kind }
    }

    /// Build a range from two dotted addresses.
    pub fn from_addrs(start: Ipv4Addr, end: Ipv4Addr, kind: u32) -> Self {
        Self::new(u32::from(start), u32::from(end), kind)
    }

    /// `start <= end`.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.start <= self.end
    }

    #[inline]
    pub fn contains(&self, addr: u32) -> bool {
        self.start <= addr && addr <= self.end
    }

    /// Decode one record.
    pub fn decode(record: &[u8; RECORD_SIZE], order: ByteOrder) -> Self {
        let field = |at: usize| {
            order.read_u32([record[at], record[at + 1], record[at + 2], record[at + 3]])
        };
        Self {
            start: field(0),
            end: field(4),
            kind: field(8),
        }
    }

    /// Encode one record.
    pub fn encode(&self, order: ByteOrder) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[0..4].copy_from_slice(&order.write_u32(self.start));
        out[4..8].copy_from_slice(&order.write_u32(self.end));
        out[8..12].copy_from_slice(&order.write_u32(self.kind));
        out
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} kind={}",
            Ipv4Addr::from(self.start),
            Ipv4Addr::from(self.end),
            self.kind
        )
    }
}
