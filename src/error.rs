//! Error types for the SLMP client.

use std::io;
use thiserror::Error;

use crate::response::ErrorInfo;

/// Result type alias for SLMP operations.
pub type Result<T> = std::result::Result<T, SlmpError>;

/// Integer code reported for [`SlmpError::Connect`].
pub const CODE_CONNECT_FAILURE: i32 = -1;
/// Integer code reported for [`SlmpError::Transport`].
pub const CODE_TRANSPORT_FAILURE: i32 = -2;
/// Integer code reported for [`SlmpError::Protocol`].
pub const CODE_PROTOCOL_VIOLATION: i32 = -3;
/// Integer code reported for [`SlmpError::InvalidAddress`].
pub const CODE_INVALID_ADDRESS: i32 = -4;

/// Errors that can occur during SLMP communication.
#[derive(Debug, Error)]
pub enum SlmpError {
    /// The transport session could not be established.
    #[error("Connect to {addr} failed: {source}")]
    Connect {
        /// Address that was dialled.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Send, receive or close failed in the middle of an operation.
    ///
    /// The connection should be discarded after this error.
    #[error("Transport failure: {0}")]
    Transport(#[from] io::Error),

    /// The received bytes do not form a valid response frame.
    #[error("Protocol violation: {reason}")]
    Protocol {
        /// Description of what did not match.
        reason: String,
    },

    /// The controller understood the request but reported a non-zero end code.
    #[error("Controller error: end code 0x{end_code:04X}")]
    Controller {
        /// Raw end code from the response.
        end_code: u16,
        /// Error information block, when the controller sent one.
        info: Option<ErrorInfo>,
    },

    /// The device address was rejected before anything was sent.
    #[error("Invalid address: {reason}")]
    InvalidAddress {
        /// Description of the addressing error.
        reason: String,
    },
}

impl SlmpError {
    /// Creates a new `Protocol` error.
    ///
    /// # Example
    ///
    /// ```
    /// use slmp::SlmpError;
    ///
    /// let err = SlmpError::protocol("bad subheader");
    /// assert_eq!(err.to_string(), "Protocol violation: bad subheader");
    /// ```
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidAddress` error.
    pub fn invalid_address(reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            reason: reason.into(),
        }
    }

    /// Creates a new `Controller` error from a response end code.
    pub fn controller(end_code: u16, info: Option<ErrorInfo>) -> Self {
        Self::Controller { end_code, info }
    }

    /// Returns the controller end code, if this is a controller error.
    pub fn end_code(&self) -> Option<u16> {
        match self {
            Self::Controller { end_code, .. } => Some(*end_code),
            _ => None,
        }
    }

    /// Returns whether this is a transport read/write timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Integer result code for callers that expect a single number.
    ///
    /// Controller errors return the end code itself (always positive);
    /// every other category maps to a fixed negative code. `0` is reserved
    /// for success and never returned.
    ///
    /// # Example
    ///
    /// ```
    /// use slmp::SlmpError;
    ///
    /// assert_eq!(SlmpError::controller(0xC056, None).code(), 0xC056);
    /// assert_eq!(SlmpError::invalid_address("zero count").code(), -4);
    /// ```
    pub fn code(&self) -> i32 {
        match self {
            Self::Connect { .. } => CODE_CONNECT_FAILURE,
            Self::Transport(_) => CODE_TRANSPORT_FAILURE,
            Self::Protocol { .. } => CODE_PROTOCOL_VIOLATION,
            Self::Controller { end_code, .. } => i32::from(*end_code),
            Self::InvalidAddress { .. } => CODE_INVALID_ADDRESS,
        }
    }
}

/// Returns a short description of a well-known controller end code.
///
/// Codes in the `0x4000..=0x4FFF` range are raised by the CPU module itself;
/// everything else unknown returns `"unknown end code"`.
///
/// # Example
///
/// ```
/// use slmp::end_code_description;
///
/// assert_eq!(end_code_description(0x0000), "normal completion");
/// assert_eq!(
///     end_code_description(0xC056),
///     "read/write request exceeds the maximum device address"
/// );
/// ```
pub fn end_code_description(end_code: u16) -> &'static str {
    match end_code {
        0x0000 => "normal completion",
        0xC050 => "ASCII data that cannot be converted to binary was received",
        0xC051..=0xC054 => "number of read/write points is outside the allowable range",
        0xC056 => "read/write request exceeds the maximum device address",
        0xC058 => "request data length does not match the data after conversion",
        0xC059 => "command or subcommand is wrong or not supported by the CPU",
        0xC05B => "CPU module cannot read/write the specified device",
        0xC05C => "request content error",
        0xC05F => "request cannot be executed on the target CPU module",
        0xC060 => "request content error in bit device data",
        0xC061 => "request data length does not match the number of data",
        0xC06F => "communication data code setting does not match (ASCII/binary)",
        0xC0D8 => "number of specified blocks exceeds the range",
        0xC200 => "remote password error",
        0x4000..=0x4FFF => "error detected by the CPU module",
        _ => "unknown end code",
    }
}
