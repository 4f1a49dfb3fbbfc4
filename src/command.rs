//! SLMP command frames and serialization.
//!
//! This module contains the batch read/write commands that can be sent to a
//! controller. Each command validates its address on construction and handles
//! its own serialization.
//!
//! # Command Types
//!
//! - [`ReadWordCommand`] - Batch read in word units (`0x0401` / `0x0000`)
//! - [`WriteWordCommand`] - Batch write in word units (`0x1401` / `0x0000`)
//! - [`ReadBitCommand`] - Batch read in bit units (`0x0401` / `0x0001`)
//! - [`WriteBitCommand`] - Batch write in bit units (`0x1401` / `0x0001`)
//!
//! [`CommandFrame`] goes the other way and parses a request frame, which is
//! what a simulated controller needs.
//!
//! # Request Layout
//!
//! | Bytes | Field |
//! |-------|-------|
//! | 0-8 | [`FrameHeader`] (subheader `50 00`, routing, length) |
//! | 9-10 | Monitoring timer (250 ms units, 0 = wait indefinitely) |
//! | 11-12 | Command |
//! | 13-14 | Subcommand |
//! | 15-17 | Head device number |
//! | 18 | Device code |
//! | 19-20 | Number of points |
//! | 21.. | Write data (write commands only) |
//!
//! # Example
//!
//! ```
//! use slmp::{Command, DeviceKind, Destination, ReadWordCommand};
//!
//! let cmd = ReadWordCommand::new(Destination::default(), DeviceKind::D, 100, 10).unwrap();
//! let bytes = cmd.to_bytes();
//! assert_eq!(bytes.len(), 21);
//! assert_eq!(&bytes[..2], &[0x50, 0x00]);
//! ```

use crate::device::{DeviceAddress, DeviceKind, DeviceWidth};
use crate::error::{Result, SlmpError};
use crate::header::{Destination, Direction, FrameClass, FrameHeader, HEADER_SIZE};
use crate::utils::{bytes_to_words, pack_bits, unpack_bits, words_to_bytes};

/// Batch read command code.
pub(crate) const CMD_BATCH_READ: u16 = 0x0401;
/// Batch write command code.
pub(crate) const CMD_BATCH_WRITE: u16 = 0x1401;
/// Subcommand for word-unit access.
pub(crate) const SUB_WORD_UNITS: u16 = 0x0000;
/// Subcommand for bit-unit access.
pub(crate) const SUB_BIT_UNITS: u16 = 0x0001;

/// Bytes after the length field and before write data:
/// timer (2) + command (2) + subcommand (2) + head (3) + device code (1) + count (2).
pub(crate) const REQUEST_BODY_LEN: usize = 12;

/// Default monitoring timer (0 = controller waits indefinitely).
pub const DEFAULT_MONITORING_TIMER: u16 = 0x0000;

/// Behaviour shared by all batch commands.
pub trait Command {
    /// Frame class of the request.
    fn class(&self) -> FrameClass;

    /// Addressed device range.
    fn address(&self) -> DeviceAddress;

    /// Serializes the command to a complete request frame.
    fn to_bytes(&self) -> Vec<u8>;

    /// Number of data bytes a successful response carries.
    fn response_data_len(&self) -> usize {
        if self.class().is_write() {
            0
        } else {
            self.address().payload_len()
        }
    }

    /// Total size of the successful response frame (header + end code + data).
    fn response_frame_len(&self) -> usize {
        HEADER_SIZE + 2 + self.response_data_len()
    }
}

/// Builds a request frame; the length field is computed from what follows it.
fn encode_request(
    destination: Destination,
    monitoring_timer: u16,
    command: u16,
    subcommand: u16,
    address: DeviceAddress,
    payload: &[u8],
) -> Vec<u8> {
    // Bounded by MAX_BIT_POINTS / MAX_WORD_POINTS, well under u16::MAX.
    let data_length = (REQUEST_BODY_LEN + payload.len()) as u16;
    let header = FrameHeader::request(destination, data_length);

    let mut bytes = Vec::with_capacity(header.frame_len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&monitoring_timer.to_le_bytes());
    bytes.extend_from_slice(&command.to_le_bytes());
    bytes.extend_from_slice(&subcommand.to_le_bytes());
    bytes.extend_from_slice(&address.to_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

/// Converts a data slice length to a point count.
fn point_count(len: usize) -> Result<u16> {
    u16::try_from(len)
        .map_err(|_| SlmpError::invalid_address(format!("{} points is out of range", len)))
}

/// Command for reading words.
#[derive(Debug, Clone)]
pub struct ReadWordCommand {
    destination: Destination,
    monitoring_timer: u16,
    address: DeviceAddress,
}

impl ReadWordCommand {
    /// Creates a new read word command.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::InvalidAddress` if `kind` is a bit device, `count`
    /// is 0 or above [`MAX_WORD_POINTS`](crate::MAX_WORD_POINTS), or the range
    /// runs past the addressable space.
    ///
    /// # Example
    ///
    /// ```
    /// use slmp::{Destination, DeviceKind, ReadWordCommand};
    ///
    /// let cmd = ReadWordCommand::new(Destination::default(), DeviceKind::D, 100, 10).unwrap();
    /// ```
    pub fn new(destination: Destination, kind: DeviceKind, head: u32, count: u16) -> Result<Self> {
        Ok(Self {
            destination,
            monitoring_timer: DEFAULT_MONITORING_TIMER,
            address: DeviceAddress::words(kind, head, count)?,
        })
    }

    /// Sets the monitoring timer.
    pub fn with_monitoring_timer(mut self, timer: u16) -> Self {
        self.monitoring_timer = timer;
        self
    }
}

impl Command for ReadWordCommand {
    fn class(&self) -> FrameClass {
        FrameClass::ReadCommand
    }

    fn address(&self) -> DeviceAddress {
        self.address
    }

    fn to_bytes(&self) -> Vec<u8> {
        encode_request(
            self.destination,
            self.monitoring_timer,
            CMD_BATCH_READ,
            SUB_WORD_UNITS,
            self.address,
            &[],
        )
    }
}

/// Command for writing words.
#[derive(Debug, Clone)]
pub struct WriteWordCommand {
    destination: Destination,
    monitoring_timer: u16,
    address: DeviceAddress,
    data: Vec<u16>,
}

impl WriteWordCommand {
    /// Creates a new write word command; the point count is `data.len()`.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::InvalidAddress` if `kind` is a bit device, `data`
    /// is empty or longer than [`MAX_WORD_POINTS`](crate::MAX_WORD_POINTS),
    /// or the range runs past the addressable space.
    ///
    /// # Example
    ///
    /// ```
    /// use slmp::{Command, Destination, DeviceKind, WriteWordCommand};
    ///
    /// let cmd = WriteWordCommand::new(
    ///     Destination::default(),
    ///     DeviceKind::D,
    ///     100,
    ///     &[0x1234, 0x5678],
    /// ).unwrap();
    /// assert_eq!(cmd.to_bytes().len(), 25);
    /// ```
    pub fn new(
        destination: Destination,
        kind: DeviceKind,
        head: u32,
        data: &[u16],
    ) -> Result<Self> {
        Ok(Self {
            destination,
            monitoring_timer: DEFAULT_MONITORING_TIMER,
            address: DeviceAddress::words(kind, head, point_count(data.len())?)?,
            data: data.to_vec(),
        })
    }

    /// Sets the monitoring timer.
    pub fn with_monitoring_timer(mut self, timer: u16) -> Self {
        self.monitoring_timer = timer;
        self
    }
}

impl Command for WriteWordCommand {
    fn class(&self) -> FrameClass {
        FrameClass::WriteCommand
    }

    fn address(&self) -> DeviceAddress {
        self.address
    }

    fn to_bytes(&self) -> Vec<u8> {
        encode_request(
            self.destination,
            self.monitoring_timer,
            CMD_BATCH_WRITE,
            SUB_WORD_UNITS,
            self.address,
            &words_to_bytes(&self.data),
        )
    }
}

/// Command for reading bits.
#[derive(Debug, Clone)]
pub struct ReadBitCommand {
    destination: Destination,
    monitoring_timer: u16,
    address: DeviceAddress,
}

impl ReadBitCommand {
    /// Creates a new read bit command.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::InvalidAddress` if `kind` is a word device, `count`
    /// is 0 or above [`MAX_BIT_POINTS`](crate::MAX_BIT_POINTS), or the range
    /// runs past the addressable space.
    pub fn new(destination: Destination, kind: DeviceKind, head: u32, count: u16) -> Result<Self> {
        Ok(Self {
            destination,
            monitoring_timer: DEFAULT_MONITORING_TIMER,
            address: DeviceAddress::bits(kind, head, count)?,
        })
    }

    /// Sets the monitoring timer.
    pub fn with_monitoring_timer(mut self, timer: u16) -> Self {
        self.monitoring_timer = timer;
        self
    }
}

impl Command for ReadBitCommand {
    fn class(&self) -> FrameClass {
        FrameClass::ReadCommand
    }

    fn address(&self) -> DeviceAddress {
        self.address
    }

    fn to_bytes(&self) -> Vec<u8> {
        encode_request(
            self.destination,
            self.monitoring_timer,
            CMD_BATCH_READ,
            SUB_BIT_UNITS,
            self.address,
            &[],
        )
    }
}

/// Command for writing bits.
///
/// Bits are given one byte per point; any non-zero byte is written as ON.
#[derive(Debug, Clone)]
pub struct WriteBitCommand {
    destination: Destination,
    monitoring_timer: u16,
    address: DeviceAddress,
    data: Vec<u8>,
}

impl WriteBitCommand {
    /// Creates a new write bit command; the point count is `bits.len()`.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::InvalidAddress` if `kind` is a word device, `bits`
    /// is empty or longer than [`MAX_BIT_POINTS`](crate::MAX_BIT_POINTS), or
    /// the range runs past the addressable space.
    ///
    /// # Example
    ///
    /// ```
    /// use slmp::{Command, Destination, DeviceKind, WriteBitCommand};
    ///
    /// let cmd = WriteBitCommand::new(Destination::default(), DeviceKind::M, 0, &[1, 0, 1]).unwrap();
    /// assert_eq!(&cmd.to_bytes()[21..], &[0x10, 0x10]);
    /// ```
    pub fn new(destination: Destination, kind: DeviceKind, head: u32, bits: &[u8]) -> Result<Self> {
        Ok(Self {
            destination,
            monitoring_timer: DEFAULT_MONITORING_TIMER,
            address: DeviceAddress::bits(kind, head, point_count(bits.len())?)?,
            data: bits.to_vec(),
        })
    }

    /// Sets the monitoring timer.
    pub fn with_monitoring_timer(mut self, timer: u16) -> Self {
        self.monitoring_timer = timer;
        self
    }
}

impl Command for WriteBitCommand {
    fn class(&self) -> FrameClass {
        FrameClass::WriteCommand
    }

    fn address(&self) -> DeviceAddress {
        self.address
    }

    fn to_bytes(&self) -> Vec<u8> {
        encode_request(
            self.destination,
            self.monitoring_timer,
            CMD_BATCH_WRITE,
            SUB_BIT_UNITS,
            self.address,
            &pack_bits(&self.data),
        )
    }
}

/// A parsed request frame.
///
/// Used by simulated controllers to decode what a client sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    /// Request header.
    pub header: FrameHeader,
    /// Monitoring timer.
    pub monitoring_timer: u16,
    /// Command code.
    pub command: u16,
    /// Subcommand code.
    pub subcommand: u16,
    /// Addressed device range.
    pub address: DeviceAddress,
    /// Raw write data (empty for reads).
    pub payload: Vec<u8>,
}

impl CommandFrame {
    /// Parses one complete request frame.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::Protocol` if the frame is short, is not a request,
    /// its length field disagrees with its size, the command or subcommand is
    /// not a batch read/write, or the write data does not match the point count.
    /// Address range violations surface as `SlmpError::InvalidAddress`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(data)?;
        if header.direction != Direction::Request {
            return Err(SlmpError::protocol("not a request frame"));
        }
        if header.frame_len() != data.len() {
            return Err(SlmpError::protocol(format!(
                "length field declares {} bytes, frame has {}",
                header.frame_len(),
                data.len()
            )));
        }
        if data.len() < HEADER_SIZE + REQUEST_BODY_LEN {
            return Err(SlmpError::protocol(format!(
                "request too short: {} bytes",
                data.len()
            )));
        }

        let body = &data[HEADER_SIZE..];
        let monitoring_timer = u16::from_le_bytes([body[0], body[1]]);
        let command = u16::from_le_bytes([body[2], body[3]]);
        let subcommand = u16::from_le_bytes([body[4], body[5]]);

        if command != CMD_BATCH_READ && command != CMD_BATCH_WRITE {
            return Err(SlmpError::protocol(format!(
                "unsupported command 0x{:04X}",
                command
            )));
        }
        let width = match subcommand {
            SUB_WORD_UNITS => DeviceWidth::Word,
            SUB_BIT_UNITS => DeviceWidth::Bit,
            other => {
                return Err(SlmpError::protocol(format!(
                    "unsupported subcommand 0x{:04X}",
                    other
                )))
            }
        };
        let address = DeviceAddress::from_bytes(&body[6..12], width)?;
        let payload = body[REQUEST_BODY_LEN..].to_vec();

        let expected = if command == CMD_BATCH_WRITE {
            address.payload_len()
        } else {
            0
        };
        if payload.len() != expected {
            return Err(SlmpError::protocol(format!(
                "expected {} data bytes for {} points, got {}",
                expected,
                address.count(),
                payload.len()
            )));
        }

        Ok(Self {
            header,
            monitoring_timer,
            command,
            subcommand,
            address,
            payload,
        })
    }

    /// Frame class of this request.
    pub fn class(&self) -> FrameClass {
        if self.command == CMD_BATCH_WRITE {
            FrameClass::WriteCommand
        } else {
            FrameClass::ReadCommand
        }
    }

    /// Returns whether the request is in bit units.
    pub fn is_bit_units(&self) -> bool {
        self.subcommand == SUB_BIT_UNITS
    }

    /// Write data decoded as words.
    pub fn words(&self) -> Vec<u16> {
        bytes_to_words(&self.payload)
    }

    /// Write data decoded as one byte (0/1) per point.
    pub fn bits(&self) -> Vec<u8> {
        unpack_bits(&self.payload, usize::from(self.address.count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dest() -> Destination {
        Destination::default()
    }

    #[test]
    fn test_read_word_command_serialization() {
        let cmd = ReadWordCommand::new(dest(), DeviceKind::D, 1, 1).unwrap();
        let expected = hex::decode("500000ffff03000c00000001040000010000a80100").unwrap();
        assert_eq!(cmd.to_bytes(), expected);
    }

    #[test]
    fn test_read_word_command_fields() {
        let cmd = ReadWordCommand::new(dest(), DeviceKind::R, 0x0102, 10)
            .unwrap()
            .with_monitoring_timer(0x0010);
        let bytes = cmd.to_bytes();

        assert_eq!(bytes.len(), HEADER_SIZE + REQUEST_BODY_LEN);
        assert_eq!(&bytes[7..9], &[0x0C, 0x00]); // length
        assert_eq!(&bytes[9..11], &[0x10, 0x00]); // timer
        assert_eq!(&bytes[11..13], &[0x01, 0x04]); // command
        assert_eq!(&bytes[13..15], &[0x00, 0x00]); // subcommand
        assert_eq!(&bytes[15..18], &[0x02, 0x01, 0x00]); // head
        assert_eq!(bytes[18], 0xAF); // R
        assert_eq!(&bytes[19..21], &[0x0A, 0x00]); // count
    }

    #[test]
    fn test_read_word_command_rejects_bit_device() {
        assert!(ReadWordCommand::new(dest(), DeviceKind::M, 0, 1).is_err());
    }

    #[test]
    fn test_read_word_command_invalid_count() {
        assert!(ReadWordCommand::new(dest(), DeviceKind::D, 0, 0).is_err());
        assert!(ReadWordCommand::new(dest(), DeviceKind::D, 0, 961).is_err());
    }

    #[test]
    fn test_write_word_command_serialization() {
        let cmd = WriteWordCommand::new(dest(), DeviceKind::D, 100, &[0x1234, 0x5678]).unwrap();
        let bytes = cmd.to_bytes();

        // 12 fixed body bytes + 4 data bytes
        assert_eq!(&bytes[7..9], &[0x10, 0x00]);
        assert_eq!(&bytes[11..13], &[0x01, 0x14]);
        assert_eq!(&bytes[15..18], &[0x64, 0x00, 0x00]);
        assert_eq!(&bytes[19..21], &[0x02, 0x00]);
        assert_eq!(&bytes[21..], &[0x34, 0x12, 0x78, 0x56]);
        assert_eq!(cmd.response_data_len(), 0);
        assert_eq!(cmd.response_frame_len(), 11);
    }

    #[test]
    fn test_write_word_command_empty() {
        let err = WriteWordCommand::new(dest(), DeviceKind::D, 0, &[]).unwrap_err();
        assert!(matches!(err, SlmpError::InvalidAddress { .. }));
    }

    #[test]
    fn test_read_bit_command_serialization() {
        let cmd = ReadBitCommand::new(dest(), DeviceKind::M, 0, 10).unwrap();
        let bytes = cmd.to_bytes();
        assert_eq!(&bytes[13..15], &[0x01, 0x00]);
        assert_eq!(bytes[18], 0x90);
        assert_eq!(cmd.response_data_len(), 5);
    }

    #[test]
    fn test_write_bit_command_serialization() {
        let bits = [1, 0, 1, 0, 0, 1, 0, 0, 0, 1];
        let cmd = WriteBitCommand::new(dest(), DeviceKind::Y, 0x20, &bits).unwrap();
        let bytes = cmd.to_bytes();

        assert_eq!(&bytes[7..9], &[0x11, 0x00]); // 12 + 5
        assert_eq!(&bytes[13..15], &[0x01, 0x00]);
        assert_eq!(bytes[18], 0x9D);
        assert_eq!(&bytes[19..21], &[0x0A, 0x00]);
        assert_eq!(&bytes[21..], &[0x10, 0x10, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_write_bit_command_rejects_word_device() {
        assert!(WriteBitCommand::new(dest(), DeviceKind::D, 0, &[1]).is_err());
    }

    #[test]
    fn test_command_frame_roundtrip_read() {
        let cmd = ReadWordCommand::new(dest(), DeviceKind::ZR, 5000, 42).unwrap();
        let frame = CommandFrame::from_bytes(&cmd.to_bytes()).unwrap();
        assert_eq!(frame.class(), FrameClass::ReadCommand);
        assert_eq!(frame.address.kind(), DeviceKind::ZR);
        assert_eq!(frame.address.head(), 5000);
        assert_eq!(frame.address.count(), 42);
        assert!(!frame.is_bit_units());
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_command_frame_roundtrip_write_bits() {
        let bits = [1, 1, 0, 1, 0];
        let cmd = WriteBitCommand::new(dest(), DeviceKind::X, 0x10, &bits).unwrap();
        let frame = CommandFrame::from_bytes(&cmd.to_bytes()).unwrap();
        assert_eq!(frame.class(), FrameClass::WriteCommand);
        assert!(frame.is_bit_units());
        assert_eq!(frame.bits(), bits.to_vec());
    }

    #[test]
    fn test_command_frame_roundtrip_write_words() {
        let cmd = WriteWordCommand::new(dest(), DeviceKind::D, 7, &[1, 2, 0xFFFF]).unwrap();
        let frame = CommandFrame::from_bytes(&cmd.to_bytes()).unwrap();
        assert_eq!(frame.words(), vec![1, 2, 0xFFFF]);
    }

    #[test]
    fn test_command_frame_length_mismatch() {
        let mut bytes = ReadWordCommand::new(dest(), DeviceKind::D, 0, 1)
            .unwrap()
            .to_bytes();
        bytes.push(0x00);
        assert!(CommandFrame::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_command_frame_unknown_command() {
        let mut bytes = ReadWordCommand::new(dest(), DeviceKind::D, 0, 1)
            .unwrap()
            .to_bytes();
        bytes[11] = 0x01;
        bytes[12] = 0x10; // 0x1001 remote run
        let err = CommandFrame::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, SlmpError::Protocol { .. }));
    }
}
