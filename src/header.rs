//! SLMP 3E frame header and routing.
//!
//! Every 3E binary frame, request or response, starts with the same 9 bytes:
//!
//! | Byte | Field | Description |
//! |------|-------|-------------|
//! | 0-1 | Subheader | `50 00` request, `D0 00` response |
//! | 2 | Network | Network number |
//! | 3 | Station | Station number (`0xFF` = connected station) |
//! | 4-5 | Module I/O | Request destination module I/O number (LE) |
//! | 6 | Multidrop | Multidrop station number |
//! | 7-8 | Length | Byte count of everything after this field (LE) |
//!
//! The length field is what lets a stream reader find frame boundaries;
//! see [`FrameBuffer`](crate::FrameBuffer).
//!
//! # Example
//!
//! ```
//! use slmp::{Destination, FrameHeader};
//!
//! let header = FrameHeader::request(Destination::default(), 12);
//! assert_eq!(
//!     header.to_bytes(),
//!     [0x50, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x0C, 0x00]
//! );
//! assert_eq!(header.frame_len(), 21);
//! ```

use crate::error::{Result, SlmpError};

/// Fixed header size in bytes (subheader + routing + length field).
pub const HEADER_SIZE: usize = 9;

/// Subheader of a 3E binary request frame.
pub const REQUEST_SUBHEADER: [u8; 2] = [0x50, 0x00];

/// Subheader of a 3E binary response frame.
pub const RESPONSE_SUBHEADER: [u8; 2] = [0xD0, 0x00];

/// Byte offset of the length field within the header.
pub(crate) const LENGTH_OFFSET: usize = 7;

/// Routing fields identifying the target station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Destination {
    /// Network number (0 = own network).
    pub network: u8,
    /// Station number (`0xFF` = the directly connected station).
    pub station: u8,
    /// Request destination module I/O number (`0x03FF` = own CPU).
    pub module_io: u16,
    /// Multidrop station number.
    pub multidrop: u8,
}

impl Destination {
    /// Creates a new destination.
    pub fn new(network: u8, station: u8, module_io: u16, multidrop: u8) -> Self {
        Self {
            network,
            station,
            module_io,
            multidrop,
        }
    }

    /// The directly connected station's own CPU.
    pub fn local() -> Self {
        Self::new(0x00, 0xFF, 0x03FF, 0x00)
    }

    pub(crate) fn to_bytes(self) -> [u8; 5] {
        let io = self.module_io.to_le_bytes();
        [self.network, self.station, io[0], io[1], self.multidrop]
    }

    pub(crate) fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 5 {
            return Err(SlmpError::protocol("routing block too short"));
        }
        Ok(Self::new(
            data[0],
            data[1],
            u16::from_le_bytes([data[2], data[3]]),
            data[4],
        ))
    }
}

impl Default for Destination {
    fn default() -> Self {
        Self::local()
    }
}

/// Direction of a frame, identified by its subheader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to controller.
    Request,
    /// Controller to client.
    Response,
}

impl Direction {
    fn subheader(self) -> [u8; 2] {
        match self {
            Direction::Request => REQUEST_SUBHEADER,
            Direction::Response => RESPONSE_SUBHEADER,
        }
    }
}

/// The fixed 9-byte header shared by all 3E frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Request or response.
    pub direction: Direction,
    /// Routing fields.
    pub destination: Destination,
    /// Byte count of everything after the length field.
    pub data_length: u16,
}

impl FrameHeader {
    /// Creates a request header.
    pub fn request(destination: Destination, data_length: u16) -> Self {
        Self {
            direction: Direction::Request,
            destination,
            data_length,
        }
    }

    /// Creates a response header.
    pub fn response(destination: Destination, data_length: u16) -> Self {
        Self {
            direction: Direction::Response,
            destination,
            data_length,
        }
    }

    /// Total frame length declared by this header.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + usize::from(self.data_length)
    }

    /// Serializes the header.
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let sub = self.direction.subheader();
        let dest = self.destination.to_bytes();
        let len = self.data_length.to_le_bytes();
        [
            sub[0], sub[1], dest[0], dest[1], dest[2], dest[3], dest[4], len[0], len[1],
        ]
    }

    /// Parses a header, accepting either subheader.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::Protocol` if fewer than [`HEADER_SIZE`] bytes are
    /// given or the subheader is not a 3E binary subheader.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(SlmpError::protocol(format!(
                "header too short: expected {} bytes, got {}",
                HEADER_SIZE,
                data.len()
            )));
        }

        let direction = match [data[0], data[1]] {
            REQUEST_SUBHEADER => Direction::Request,
            RESPONSE_SUBHEADER => Direction::Response,
            other => {
                return Err(SlmpError::protocol(format!(
                    "unexpected subheader {:02X} {:02X}",
                    other[0], other[1]
                )))
            }
        };

        Ok(Self {
            direction,
            destination: Destination::from_bytes(&data[2..7])?,
            data_length: read_length_field(data),
        })
    }
}

/// Reads the declared length from a buffered header prefix.
///
/// The caller guarantees at least [`HEADER_SIZE`] bytes.
pub(crate) fn read_length_field(data: &[u8]) -> u16 {
    u16::from_le_bytes([data[LENGTH_OFFSET], data[LENGTH_OFFSET + 1]])
}

/// Class of a frame, determined by direction, command and end code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    /// Batch read request.
    ReadCommand,
    /// Successful batch read response.
    ReadResponse,
    /// Failed batch read response.
    ReadError,
    /// Batch write request.
    WriteCommand,
    /// Successful batch write response.
    WriteResponse,
    /// Failed batch write response.
    WriteError,
}

impl FrameClass {
    /// Class of a response to a read (`is_write == false`) or write request.
    pub fn of_response(is_write: bool, end_code: u16) -> Self {
        match (is_write, end_code) {
            (false, 0) => FrameClass::ReadResponse,
            (false, _) => FrameClass::ReadError,
            (true, 0) => FrameClass::WriteResponse,
            (true, _) => FrameClass::WriteError,
        }
    }

    /// Returns whether this class belongs to a write exchange.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            FrameClass::WriteCommand | FrameClass::WriteResponse | FrameClass::WriteError
        )
    }

    /// Returns whether this class is an error response.
    pub fn is_error(self) -> bool {
        matches!(self, FrameClass::ReadError | FrameClass::WriteError)
    }
}
