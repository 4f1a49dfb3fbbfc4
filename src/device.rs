//! Device kinds and device addresses.
//!
//! This module defines the [`DeviceKind`] enum, the controller memory regions
//! this client can address, and [`DeviceAddress`], a validated
//! `{kind, head number, point count}` triple.
//!
//! # Device Kinds
//!
//! | Kind | Description | Family | Wire code | Numbering |
//! |------|-------------|--------|:---------:|-----------|
//! | [`DeviceKind::D`] | Data register | word | `0xA8` | decimal |
//! | [`DeviceKind::R`] | File register | word | `0xAF` | decimal |
//! | [`DeviceKind::ZR`] | File register (serial numbering) | word | `0xB0` | decimal |
//! | [`DeviceKind::M`] | Internal relay | bit | `0x90` | decimal |
//! | [`DeviceKind::X`] | Input relay | bit | `0x9C` | hexadecimal |
//! | [`DeviceKind::Y`] | Output relay | bit | `0x9D` | hexadecimal |
//!
//! # Example
//!
//! ```
//! use slmp::{DeviceAddress, DeviceKind};
//!
//! assert!(DeviceKind::M.is_bit());
//! assert!(!DeviceKind::D.is_bit());
//!
//! let addr = DeviceAddress::new(DeviceKind::D, 100, 10).unwrap();
//! assert_eq!(addr.to_string(), "D100");
//!
//! // Zero points never reach the wire
//! assert!(DeviceAddress::new(DeviceKind::D, 100, 0).is_err());
//! ```

use crate::error::{Result, SlmpError};

/// Largest head device number representable in the 3-byte field.
pub const MAX_HEAD_NUMBER: u32 = 0x00FF_FFFF;

/// Maximum number of word points per batch read/write frame.
pub const MAX_WORD_POINTS: u16 = 960;

/// Maximum number of bit points per batch read/write frame.
pub const MAX_BIT_POINTS: u16 = 7168;

/// Element width of a device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceWidth {
    /// 16-bit word per point.
    Word,
    /// One bit per point, packed two points per byte on the wire.
    Bit,
}

impl DeviceWidth {
    /// Maximum points per frame for this width.
    pub fn max_points(self) -> u16 {
        match self {
            DeviceWidth::Word => MAX_WORD_POINTS,
            DeviceWidth::Bit => MAX_BIT_POINTS,
        }
    }

    /// Number of payload bytes `count` points occupy on the wire.
    pub fn payload_len(self, count: u16) -> usize {
        match self {
            DeviceWidth::Word => usize::from(count) * 2,
            DeviceWidth::Bit => usize::from(count).div_ceil(2),
        }
    }
}

/// Controller device kinds.
///
/// This is a closed set: each kind has a fixed wire code and element width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Data register.
    D,
    /// File register.
    R,
    /// File register, serial numbering.
    ZR,
    /// Internal relay.
    M,
    /// Input relay.
    X,
    /// Output relay.
    Y,
}

impl DeviceKind {
    /// All supported kinds.
    pub const ALL: [DeviceKind; 6] = [
        DeviceKind::D,
        DeviceKind::R,
        DeviceKind::ZR,
        DeviceKind::M,
        DeviceKind::X,
        DeviceKind::Y,
    ];

    /// Returns the device code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            DeviceKind::D => 0xA8,
            DeviceKind::R => 0xAF,
            DeviceKind::ZR => 0xB0,
            DeviceKind::M => 0x90,
            DeviceKind::X => 0x9C,
            DeviceKind::Y => 0x9D,
        }
    }

    /// Looks up a kind by its wire code.
    ///
    /// # Example
    ///
    /// ```
    /// use slmp::DeviceKind;
    ///
    /// assert_eq!(DeviceKind::from_code(0xA8), Some(DeviceKind::D));
    /// assert_eq!(DeviceKind::from_code(0x00), None);
    /// ```
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Returns the element width of this kind.
    pub fn width(self) -> DeviceWidth {
        match self {
            DeviceKind::D | DeviceKind::R | DeviceKind::ZR => DeviceWidth::Word,
            DeviceKind::M | DeviceKind::X | DeviceKind::Y => DeviceWidth::Bit,
        }
    }

    /// Returns whether this is a bit device.
    pub fn is_bit(self) -> bool {
        self.width() == DeviceWidth::Bit
    }

    /// Returns whether device numbers of this kind are written in hexadecimal.
    pub fn is_hex_numbered(self) -> bool {
        matches!(self, DeviceKind::X | DeviceKind::Y)
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::D => write!(f, "D"),
            DeviceKind::R => write!(f, "R"),
            DeviceKind::ZR => write!(f, "ZR"),
            DeviceKind::M => write!(f, "M"),
            DeviceKind::X => write!(f, "X"),
            DeviceKind::Y => write!(f, "Y"),
        }
    }
}

/// A validated batch address: device kind, head number and point count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress {
    kind: DeviceKind,
    head: u32,
    count: u16,
}

impl DeviceAddress {
    /// Creates a new device address.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::InvalidAddress` if:
    /// - `count` is 0 or exceeds the per-frame maximum for the kind's width
    /// - `head` or the last addressed point exceeds [`MAX_HEAD_NUMBER`]
    pub fn new(kind: DeviceKind, head: u32, count: u16) -> Result<Self> {
        if count == 0 {
            return Err(SlmpError::invalid_address("count must be greater than 0"));
        }
        let max = kind.width().max_points();
        if count > max {
            return Err(SlmpError::invalid_address(format!(
                "{} points exceeds the maximum of {} for {}",
                count, max, kind
            )));
        }
        if head > MAX_HEAD_NUMBER {
            return Err(SlmpError::invalid_address(format!(
                "head number {} exceeds 0x{:06X}",
                head, MAX_HEAD_NUMBER
            )));
        }
        if head + u32::from(count) - 1 > MAX_HEAD_NUMBER {
            return Err(SlmpError::invalid_address(format!(
                "range {}{}..+{} runs past 0x{:06X}",
                kind, head, count, MAX_HEAD_NUMBER
            )));
        }

        Ok(Self { kind, head, count })
    }

    /// Creates an address for a word operation.
    ///
    /// # Errors
    ///
    /// As [`DeviceAddress::new`], and also if `kind` is a bit device.
    pub fn words(kind: DeviceKind, head: u32, count: u16) -> Result<Self> {
        if kind.is_bit() {
            return Err(SlmpError::invalid_address(format!(
                "{} is a bit device; use bit access",
                kind
            )));
        }
        Self::new(kind, head, count)
    }

    /// Creates an address for a bit operation.
    ///
    /// # Errors
    ///
    /// As [`DeviceAddress::new`], and also if `kind` is a word device.
    pub fn bits(kind: DeviceKind, head: u32, count: u16) -> Result<Self> {
        if !kind.is_bit() {
            return Err(SlmpError::invalid_address(format!(
                "{} is a word device; use word access",
                kind
            )));
        }
        Self::new(kind, head, count)
    }

    /// Device kind.
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Head device number.
    pub fn head(&self) -> u32 {
        self.head
    }

    /// Number of points.
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Number of payload bytes these points occupy on the wire.
    pub fn payload_len(&self) -> usize {
        self.kind.width().payload_len(self.count)
    }

    /// Serializes to head number (3 bytes LE), device code, count (2 bytes LE).
    pub(crate) fn to_bytes(self) -> [u8; 6] {
        let head = self.head.to_le_bytes();
        let count = self.count.to_le_bytes();
        [
            head[0],
            head[1],
            head[2],
            self.kind.code(),
            count[0],
            count[1],
        ]
    }

    /// Parses the 6-byte address block of a command frame accessed in `width` units.
    pub(crate) fn from_bytes(data: &[u8], width: DeviceWidth) -> Result<Self> {
        if data.len() < 6 {
            return Err(SlmpError::protocol("device address block too short"));
        }
        let head = u32::from_le_bytes([data[0], data[1], data[2], 0]);
        let kind = DeviceKind::from_code(data[3]).ok_or_else(|| {
            SlmpError::protocol(format!("unknown device code 0x{:02X}", data[3]))
        })?;
        let count = u16::from_le_bytes([data[4], data[5]]);
        match width {
            DeviceWidth::Word => Self::words(kind, head, count),
            DeviceWidth::Bit => Self::bits(kind, head, count),
        }
    }
}

impl std::fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.kind.is_hex_numbered() {
            write!(f, "{}{:X}", self.kind, self.head)
        } else {
            write!(f, "{}{}", self.kind, self.head)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_codes() {
        assert_eq!(DeviceKind::D.code(), 0xA8);
        assert_eq!(DeviceKind::R.code(), 0xAF);
        assert_eq!(DeviceKind::ZR.code(), 0xB0);
        assert_eq!(DeviceKind::M.code(), 0x90);
        assert_eq!(DeviceKind::X.code(), 0x9C);
        assert_eq!(DeviceKind::Y.code(), 0x9D);
    }

    #[test]
    fn test_from_code_roundtrip() {
        for kind in DeviceKind::ALL {
            assert_eq!(DeviceKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(DeviceKind::from_code(0xFF), None);
    }

    #[test]
    fn test_widths() {
        assert_eq!(DeviceKind::D.width(), DeviceWidth::Word);
        assert_eq!(DeviceKind::ZR.width(), DeviceWidth::Word);
        assert_eq!(DeviceKind::M.width(), DeviceWidth::Bit);
        assert!(DeviceKind::X.is_bit());
        assert!(!DeviceKind::R.is_bit());
    }

    #[test]
    fn test_payload_len() {
        assert_eq!(DeviceWidth::Word.payload_len(10), 20);
        assert_eq!(DeviceWidth::Bit.payload_len(10), 5);
        assert_eq!(DeviceWidth::Bit.payload_len(11), 6);
        assert_eq!(DeviceWidth::Bit.payload_len(1), 1);
    }

    #[test]
    fn test_zero_count_rejected() {
        let err = DeviceAddress::new(DeviceKind::D, 0, 0).unwrap_err();
        assert!(matches!(err, SlmpError::InvalidAddress { .. }));
    }

    #[test]
    fn test_count_limits() {
        assert!(DeviceAddress::new(DeviceKind::D, 0, MAX_WORD_POINTS).is_ok());
        assert!(DeviceAddress::new(DeviceKind::D, 0, MAX_WORD_POINTS + 1).is_err());
        assert!(DeviceAddress::new(DeviceKind::M, 0, MAX_BIT_POINTS).is_ok());
        assert!(DeviceAddress::new(DeviceKind::M, 0, MAX_BIT_POINTS + 1).is_err());
    }

    #[test]
    fn test_head_range() {
        assert!(DeviceAddress::new(DeviceKind::D, MAX_HEAD_NUMBER, 1).is_ok());
        assert!(DeviceAddress::new(DeviceKind::D, MAX_HEAD_NUMBER + 1, 1).is_err());
        assert!(DeviceAddress::new(DeviceKind::D, MAX_HEAD_NUMBER, 2).is_err());
    }

    #[test]
    fn test_family_checks() {
        assert!(DeviceAddress::words(DeviceKind::M, 0, 1).is_err());
        assert!(DeviceAddress::bits(DeviceKind::D, 0, 1).is_err());
        assert!(DeviceAddress::words(DeviceKind::R, 0, 1).is_ok());
        assert!(DeviceAddress::bits(DeviceKind::Y, 0, 1).is_ok());
    }

    #[test]
    fn test_to_bytes() {
        let addr = DeviceAddress::new(DeviceKind::D, 0x012345, 10).unwrap();
        assert_eq!(addr.to_bytes(), [0x45, 0x23, 0x01, 0xA8, 0x0A, 0x00]);
        assert_eq!(
            DeviceAddress::from_bytes(&addr.to_bytes(), DeviceWidth::Word).unwrap(),
            addr
        );
        assert!(DeviceAddress::from_bytes(&addr.to_bytes(), DeviceWidth::Bit).is_err());
    }

    #[test]
    fn test_from_bytes_unknown_code() {
        let err = DeviceAddress::from_bytes(&[0, 0, 0, 0x01, 1, 0], DeviceWidth::Word).unwrap_err();
        assert!(matches!(err, SlmpError::Protocol { .. }));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            DeviceAddress::new(DeviceKind::D, 100, 1).unwrap().to_string(),
            "D100"
        );
        assert_eq!(
            DeviceAddress::new(DeviceKind::X, 0x1F, 1).unwrap().to_string(),
            "X1F"
        );
        assert_eq!(DeviceKind::ZR.to_string(), "ZR");
    }
}
