//! # SLMP Client Library
//!
//! A Rust library for reading and writing Mitsubishi PLC devices over TCP using
//! SLMP (Seamless Message Protocol), also known as the MC protocol, in the
//! 3E binary frame format.
//!
//! This is a **protocol-only** library: no polling, caching or reconnection.
//! Each call produces exactly 1 request and waits for exactly 1 response.
//! No automatic retries.
//!
//! ## Features
//!
//! - **Batch access**: read/write up to 960 words or 7168 bits per call
//! - **Stream reassembly**: responses split or merged by TCP are reframed
//!   from the length field
//! - **Type-safe**: device kinds as an enum, word/bit family checked before
//!   anything is sent
//! - **No panics**: all errors returned as `Result<T, SlmpError>`
//! - **C API**: integer-code functions behind the `capi` feature
//!
//! ## Quick Start
//!
//! ```no_run
//! use slmp::{Connection, DeviceKind};
//!
//! fn main() -> slmp::Result<()> {
//!     let mut conn = Connection::connect("192.168.10.61", 5000)?;
//!
//!     // Read D100-D109
//!     let data = conn.read_words(DeviceKind::D, 100, 10)?;
//!     println!("D100-D109: {:?}", data);
//!
//!     // Write two words to D200
//!     conn.write_words(DeviceKind::D, 200, &[0x1234, 0x5678])?;
//!
//!     // Read 16 inputs starting at X20 (hex-numbered)
//!     let inputs = conn.read_bits(DeviceKind::X, 0x20, 16)?;
//!     println!("X20-X2F: {:?}", inputs);
//!
//!     // Set M0, M2 and M5
//!     conn.write_bits(DeviceKind::M, 0, &[1, 0, 1, 0, 0, 1])?;
//!
//!     conn.shutdown()
//! }
//! ```
//!
//! ## Devices
//!
//! | Kind | Description | Family | Code |
//! |------|-------------|--------|:----:|
//! | [`DeviceKind::D`] | Data register | word | `0xA8` |
//! | [`DeviceKind::R`] | File register | word | `0xAF` |
//! | [`DeviceKind::ZR`] | File register (serial) | word | `0xB0` |
//! | [`DeviceKind::M`] | Internal relay | bit | `0x90` |
//! | [`DeviceKind::X`] | Input | bit | `0x9C` |
//! | [`DeviceKind::Y`] | Output | bit | `0x9D` |
//!
//! Word operations on bit devices (and the reverse) are rejected with
//! [`SlmpError::InvalidAddress`].
//!
//! ## Error Handling
//!
//! ```no_run
//! use slmp::{end_code_description, Connection, DeviceKind, SlmpError};
//!
//! let mut conn = Connection::connect("192.168.10.61", 5000)?;
//!
//! match conn.read_words(DeviceKind::D, 100, 10) {
//!     Ok(data) => println!("Data: {:?}", data),
//!     Err(SlmpError::Controller { end_code, .. }) => {
//!         println!("PLC error 0x{:04X}: {}", end_code, end_code_description(end_code));
//!     }
//!     Err(e) if e.is_timeout() => println!("Communication timeout"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! # Ok::<(), SlmpError>(())
//! ```
//!
//! Every error also maps to a single integer through [`SlmpError::code`]:
//! the end code for controller errors, a fixed negative value otherwise.
//!
//! ## Configuration
//!
//! ```no_run
//! use slmp::{ClientConfig, Connection};
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("192.168.10.61", 5000)
//!     .with_timeout(Duration::from_secs(5))   // default: 2s
//!     .with_network(1)                        // default: 0
//!     .with_station(2)                        // default: 0xFF
//!     .with_monitoring_timer(0x0010);         // default: 0
//! let conn = Connection::connect_with(config)?;
//! # Ok::<(), slmp::SlmpError>(())
//! ```
//!
//! ## Logging
//!
//! The library logs through the [`log`](https://docs.rs/log) facade: `debug`
//! for connect, shutdown and each completed exchange, `trace` for raw frame
//! bytes, and `warn` when buffered bytes are discarded. Install any logger
//! (for example `env_logger`) to see them.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod buffer;
mod client;
mod command;
mod device;
mod error;
mod header;
mod response;
mod transport;
pub mod utils;

#[cfg(feature = "capi")]
pub mod capi;

// Public re-exports
pub use buffer::{FrameBuffer, DEFAULT_MAX_FRAME_SIZE};
pub use client::{ClientConfig, Connection};
pub use command::{
    Command, CommandFrame, ReadBitCommand, ReadWordCommand, WriteBitCommand, WriteWordCommand,
    DEFAULT_MONITORING_TIMER,
};
pub use device::{
    DeviceAddress, DeviceKind, DeviceWidth, MAX_BIT_POINTS, MAX_HEAD_NUMBER, MAX_WORD_POINTS,
};
pub use error::{
    end_code_description, Result, SlmpError, CODE_CONNECT_FAILURE, CODE_INVALID_ADDRESS,
    CODE_PROTOCOL_VIOLATION, CODE_TRANSPORT_FAILURE,
};
pub use header::{
    Destination, Direction, FrameClass, FrameHeader, HEADER_SIZE, REQUEST_SUBHEADER,
    RESPONSE_SUBHEADER,
};
pub use response::{ErrorInfo, ResponseBody, SlmpResponse, ERROR_INFO_SIZE, MIN_RESPONSE_SIZE};
pub use transport::{TcpTransport, Transport, DEFAULT_TIMEOUT};
