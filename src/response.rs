//! SLMP response parsing and validation.
//!
//! # Response Structure
//!
//! | Component | Size | Description |
//! |-----------|------|-------------|
//! | Header | 9 bytes | Subheader `D0 00`, echoed routing, length |
//! | End code | 2 bytes | `0x0000` = success |
//! | Data | Variable | Read data, success only |
//! | Error information | 9 bytes | Failure only, optional |
//!
//! A decoded [`SlmpResponse`] is either [`ResponseBody::Completed`] with the
//! data bytes, or [`ResponseBody::Failed`] with the end code. A failed response
//! never exposes a data payload, and a completed one never carries an end code.
//!
//! # Example
//!
//! ```
//! use slmp::{Destination, SlmpResponse};
//!
//! let bytes = [
//!     0xD0, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x06, 0x00, // header
//!     0x00, 0x00,             // end code
//!     0x34, 0x12, 0x78, 0x56, // data: 0x1234, 0x5678
//! ];
//!
//! let response = SlmpResponse::from_bytes(&bytes).unwrap();
//! assert!(response.is_success());
//! assert_eq!(response.to_words(2).unwrap(), vec![0x1234, 0x5678]);
//! ```

use crate::error::{Result, SlmpError};
use crate::header::{Destination, Direction, FrameClass, FrameHeader, HEADER_SIZE};
use crate::utils::{bytes_to_words, unpack_bits};

/// Minimum response size: header (9) + end code (2).
pub const MIN_RESPONSE_SIZE: usize = HEADER_SIZE + 2;

/// Size of the error information block of a failed response.
pub const ERROR_INFO_SIZE: usize = 9;

/// [`ERROR_INFO_SIZE`] as a length field value.
const ERROR_INFO_LEN: u16 = ERROR_INFO_SIZE as u16;

/// Error information returned alongside a non-zero end code.
///
/// Identifies the station and command that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Routing of the station that raised the error.
    pub destination: Destination,
    /// Command of the failed request.
    pub command: u16,
    /// Subcommand of the failed request.
    pub subcommand: u16,
}

impl ErrorInfo {
    fn to_bytes(self) -> [u8; ERROR_INFO_SIZE] {
        let dest = self.destination.to_bytes();
        let cmd = self.command.to_le_bytes();
        let sub = self.subcommand.to_le_bytes();
        [
            dest[0], dest[1], dest[2], dest[3], dest[4], cmd[0], cmd[1], sub[0], sub[1],
        ]
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != ERROR_INFO_SIZE {
            return Err(SlmpError::protocol(format!(
                "error response carries {} bytes, expected 0 or {}",
                data.len(),
                ERROR_INFO_SIZE
            )));
        }
        Ok(Self {
            destination: Destination::from_bytes(&data[..5])?,
            command: u16::from_le_bytes([data[5], data[6]]),
            subcommand: u16::from_le_bytes([data[7], data[8]]),
        })
    }
}

/// Body of a response: data on success, end code on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// End code 0, with the returned data (empty for writes).
    Completed(Vec<u8>),
    /// Non-zero end code.
    Failed {
        /// Controller end code.
        end_code: u16,
        /// Error information block, if sent.
        info: Option<ErrorInfo>,
    },
}

/// Parsed SLMP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlmpResponse {
    /// Response header.
    pub header: FrameHeader,
    /// Response body.
    pub body: ResponseBody,
}

impl SlmpResponse {
    /// Builds a successful response carrying `data`.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::Protocol` if `data` is longer than 65533 bytes, the
    /// most the 16-bit length field can describe after the end code.
    pub fn completed(destination: Destination, data: Vec<u8>) -> Result<Self> {
        let data_length = u16::try_from(2 + data.len()).map_err(|_| {
            SlmpError::protocol(format!(
                "{} data bytes do not fit in one frame",
                data.len()
            ))
        })?;
        Ok(Self {
            header: FrameHeader::response(destination, data_length),
            body: ResponseBody::Completed(data),
        })
    }

    /// Builds a failed response. An `end_code` of 0 yields an empty completed
    /// response instead, since 0 cannot describe a failure.
    pub fn failed(destination: Destination, end_code: u16, info: Option<ErrorInfo>) -> Self {
        if end_code == 0 {
            return Self {
                header: FrameHeader::response(destination, 2),
                body: ResponseBody::Completed(Vec::new()),
            };
        }
        let data_length = if info.is_some() { 2 + ERROR_INFO_LEN } else { 2 };
        Self {
            header: FrameHeader::response(destination, data_length),
            body: ResponseBody::Failed { end_code, info },
        }
    }

    /// Parses one complete response frame.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::Protocol` if:
    /// - The frame is shorter than [`MIN_RESPONSE_SIZE`]
    /// - The subheader is not the response subheader
    /// - The length field disagrees with the frame size
    /// - A failed response carries anything other than an error information block
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_RESPONSE_SIZE {
            return Err(SlmpError::protocol(format!(
                "response too short: expected at least {} bytes, got {}",
                MIN_RESPONSE_SIZE,
                data.len()
            )));
        }

        let header = FrameHeader::from_bytes(&data[..HEADER_SIZE])?;
        if header.direction != Direction::Response {
            return Err(SlmpError::protocol("expected a response subheader"));
        }
        if header.frame_len() != data.len() {
            return Err(SlmpError::protocol(format!(
                "length field declares {} bytes, frame has {}",
                header.frame_len(),
                data.len()
            )));
        }

        let end_code = u16::from_le_bytes([data[HEADER_SIZE], data[HEADER_SIZE + 1]]);
        let rest = &data[MIN_RESPONSE_SIZE..];

        let body = if end_code == 0 {
            ResponseBody::Completed(rest.to_vec())
        } else {
            let info = if rest.is_empty() {
                None
            } else {
                Some(ErrorInfo::from_bytes(rest)?)
            };
            ResponseBody::Failed { end_code, info }
        };

        Ok(Self { header, body })
    }

    /// Serializes the response frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.header.frame_len());
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(&self.end_code().to_le_bytes());
        match &self.body {
            ResponseBody::Completed(data) => bytes.extend_from_slice(data),
            ResponseBody::Failed { info, .. } => {
                if let Some(info) = info {
                    bytes.extend_from_slice(&info.to_bytes());
                }
            }
        }
        bytes
    }

    /// Returns the end code (0 on success).
    pub fn end_code(&self) -> u16 {
        match self.body {
            ResponseBody::Completed(_) => 0,
            ResponseBody::Failed { end_code, .. } => end_code,
        }
    }

    /// Returns whether the end code is 0.
    pub fn is_success(&self) -> bool {
        matches!(self.body, ResponseBody::Completed(_))
    }

    /// Frame class of this response to a read or write request.
    pub fn class(&self, is_write: bool) -> FrameClass {
        FrameClass::of_response(is_write, self.end_code())
    }

    /// Returns the data on success, or the end code as an error.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::Controller` if the end code is non-zero.
    pub fn check_error(&self) -> Result<&[u8]> {
        match &self.body {
            ResponseBody::Completed(data) => Ok(data),
            ResponseBody::Failed { end_code, info } => Err(SlmpError::controller(*end_code, *info)),
        }
    }

    /// Validates a write acknowledgement: success with no data.
    ///
    /// # Errors
    ///
    /// `SlmpError::Controller` on a non-zero end code; `SlmpError::Protocol`
    /// if data came back.
    pub fn to_ack(&self) -> Result<()> {
        let data = self.check_error()?;
        if !data.is_empty() {
            return Err(SlmpError::protocol(format!(
                "write response carries {} unexpected data bytes",
                data.len()
            )));
        }
        Ok(())
    }

    /// Converts response data to exactly `count` words.
    ///
    /// # Errors
    ///
    /// `SlmpError::Controller` on a non-zero end code; `SlmpError::Protocol`
    /// if the data is not exactly `2 * count` bytes.
    pub fn to_words(&self, count: u16) -> Result<Vec<u16>> {
        let data = self.check_error()?;
        let expected = usize::from(count) * 2;
        if data.len() != expected {
            return Err(SlmpError::protocol(format!(
                "expected {} data bytes for {} words, got {}",
                expected,
                count,
                data.len()
            )));
        }
        Ok(bytes_to_words(data))
    }

    /// Converts response data to exactly `count` bit values (0 or 1).
    ///
    /// # Errors
    ///
    /// `SlmpError::Controller` on a non-zero end code; `SlmpError::Protocol`
    /// if the data is not exactly `ceil(count / 2)` bytes.
    pub fn to_bits(&self, count: u16) -> Result<Vec<u8>> {
        let data = self.check_error()?;
        let expected = usize::from(count).div_ceil(2);
        if data.len() != expected {
            return Err(SlmpError::protocol(format!(
                "expected {} data bytes for {} bits, got {}",
                expected,
                count,
                data.len()
            )));
        }
        Ok(unpack_bits(data, usize::from(count)))
    }
}
