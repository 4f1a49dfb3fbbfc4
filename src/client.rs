//! SLMP connection for reading and writing controller devices.
//!
//! This module provides [`Connection`], the primary interface of the crate,
//! and [`ClientConfig`] to configure it.
//!
//! # Overview
//!
//! Each operation runs one complete exchange before returning:
//! 1. The address is validated; nothing is sent if it is rejected
//! 2. The command frame is encoded and written to the transport
//! 3. Received bytes are pushed into the connection's [`FrameBuffer`] until
//!    one full response frame is available
//! 4. The frame is decoded and the end code mapped to a result
//!
//! There is no retry at this layer. A failed call returns to the caller, who
//! decides whether to try again; a write is never sent twice by the library.
//!
//! # Example
//!
//! ```no_run
//! use slmp::{Connection, DeviceKind};
//!
//! let mut conn = Connection::connect("192.168.10.61", 5000)?;
//!
//! let words = conn.read_words(DeviceKind::D, 100, 10)?;
//! conn.write_words(DeviceKind::D, 200, &[0x1234, 0x5678])?;
//!
//! let bits = conn.read_bits(DeviceKind::M, 0, 10)?;
//! conn.write_bits(DeviceKind::Y, 0x20, &[1, 0, 1])?;
//!
//! conn.shutdown()?;
//! # Ok::<(), slmp::SlmpError>(())
//! ```
//!
//! # Lifecycle and Thread Safety
//!
//! A `Connection` exists only while connected. [`Connection::shutdown`] takes
//! it by value, so using it afterwards or shutting it down twice does not
//! compile. Operations take `&mut self`: the protocol has no request IDs, so
//! only one frame may be in flight per connection. To share a connection
//! between threads wrap it in a `Mutex`, or give each worker its own.
//!
//! # Timeouts
//!
//! The configured timeout applies to connect, send and receive. A timeout is
//! reported as [`SlmpError::Transport`] (see [`SlmpError::is_timeout`]).
//!
//! # Broken Connections
//!
//! After a transport failure or a protocol violation the byte stream can no
//! longer be trusted: late bytes of the abandoned response may still arrive
//! and would be taken as the reply to the next request. The connection is
//! then marked broken ([`Connection::is_broken`]) and every later operation
//! fails with [`SlmpError::Transport`] without sending anything. Shut it down
//! and connect again. Controller errors and rejected addresses leave the
//! connection usable.

use std::io;
use std::time::Duration;

use bytes::Bytes;

use crate::buffer::{FrameBuffer, DEFAULT_MAX_FRAME_SIZE};
use crate::command::{
    Command, ReadBitCommand, ReadWordCommand, WriteBitCommand, WriteWordCommand,
    DEFAULT_MONITORING_TIMER,
};
use crate::device::DeviceKind;
use crate::error::{Result, SlmpError};
use crate::header::Destination;
use crate::response::SlmpResponse;
use crate::transport::{TcpTransport, Transport, DEFAULT_TIMEOUT};

/// Size of each transport read.
const RECEIVE_CHUNK_SIZE: usize = 512;

/// Configuration for opening a [`Connection`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Controller host name or IP address.
    pub host: String,
    /// Controller TCP port.
    pub port: u16,
    /// Routing fields placed in every request.
    pub destination: Destination,
    /// Connect, send and receive timeout.
    pub timeout: Duration,
    /// Monitoring timer sent in every request (250 ms units).
    pub monitoring_timer: u16,
    /// Largest response frame accepted.
    pub max_frame_size: usize,
}

impl ClientConfig {
    /// Creates a configuration with default routing and timeouts.
    ///
    /// # Example
    ///
    /// ```
    /// use slmp::ClientConfig;
    ///
    /// let config = ClientConfig::new("192.168.10.61", 5000);
    /// assert_eq!(config.destination.station, 0xFF);
    /// ```
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            destination: Destination::default(),
            timeout: DEFAULT_TIMEOUT,
            monitoring_timer: DEFAULT_MONITORING_TIMER,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Sets the connect/send/receive timeout (default is 2 seconds).
    ///
    /// # Example
    ///
    /// ```
    /// use slmp::ClientConfig;
    /// use std::time::Duration;
    ///
    /// let config = ClientConfig::new("192.168.10.61", 5000)
    ///     .with_timeout(Duration::from_millis(500));
    /// ```
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces all routing fields.
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Sets the network number.
    pub fn with_network(mut self, network: u8) -> Self {
        self.destination.network = network;
        self
    }

    /// Sets the station number.
    pub fn with_station(mut self, station: u8) -> Self {
        self.destination.station = station;
        self
    }

    /// Sets the request destination module I/O number.
    pub fn with_module_io(mut self, module_io: u16) -> Self {
        self.destination.module_io = module_io;
        self
    }

    /// Sets the multidrop station number.
    pub fn with_multidrop(mut self, multidrop: u8) -> Self {
        self.destination.multidrop = multidrop;
        self
    }

    /// Sets the monitoring timer (250 ms units, 0 = wait indefinitely).
    pub fn with_monitoring_timer(mut self, timer: u16) -> Self {
        self.monitoring_timer = timer;
        self
    }

    /// Sets the largest frame accepted (default is 4096 bytes).
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// `host:port` string, for diagnostics.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// An open SLMP session with one controller.
///
/// Owns its transport and receive buffer exclusively; both are released
/// together by [`shutdown`](Self::shutdown).
pub struct Connection<T: Transport = TcpTransport> {
    transport: T,
    buffer: FrameBuffer,
    destination: Destination,
    monitoring_timer: u16,
    broken: bool,
}

impl Connection<TcpTransport> {
    /// Opens a TCP connection with default configuration.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::Connect` if the connection cannot be established.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_with(ClientConfig::new(host, port))
    }

    /// Opens a TCP connection using `config`.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::Connect` if the connection cannot be established.
    pub fn connect_with(config: ClientConfig) -> Result<Self> {
        let transport = TcpTransport::connect(&config.host, config.port, config.timeout)
            .map_err(|source| SlmpError::Connect {
                addr: config.addr(),
                source,
            })?;
        log::debug!("Connected to {}", config.addr());
        Ok(Self::with_transport(transport, &config))
    }
}

impl<T: Transport> Connection<T> {
    /// Wraps an already connected transport.
    pub fn with_transport(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport,
            buffer: FrameBuffer::with_max_frame_size(config.max_frame_size),
            destination: config.destination,
            monitoring_timer: config.monitoring_timer,
            broken: false,
        }
    }

    /// Routing fields used for requests.
    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Returns whether an earlier failure left the stream out of sync.
    ///
    /// A broken connection refuses every operation; reconnect instead.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Number of bytes currently held in the receive buffer.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Closes the transport and releases the receive buffer.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::Transport` if closing the transport fails. The
    /// connection is consumed either way.
    pub fn shutdown(self) -> Result<()> {
        let Self {
            transport, buffer, ..
        } = self;
        if !buffer.is_empty() {
            log::debug!("Dropping {} unread bytes on shutdown", buffer.len());
        }
        drop(buffer);
        transport.close()?;
        log::debug!("Connection shut down");
        Ok(())
    }

    /// Reads `count` words starting at `head`.
    ///
    /// # Errors
    ///
    /// - `SlmpError::InvalidAddress` if `kind` is a bit device, `count` is 0
    ///   or above the per-frame limit, or the range is out of bounds
    /// - `SlmpError::Transport` on send/receive failure or timeout, or if the
    ///   connection is already [broken](Self::is_broken)
    /// - `SlmpError::Protocol` on a malformed response
    /// - `SlmpError::Controller` if the controller reports an end code
    ///
    /// # Example
    ///
    /// ```no_run
    /// use slmp::{Connection, DeviceKind};
    ///
    /// let mut conn = Connection::connect("192.168.10.61", 5000).unwrap();
    /// let data = conn.read_words(DeviceKind::D, 100, 10).unwrap();
    /// println!("D100-D109: {:?}", data);
    /// ```
    pub fn read_words(&mut self, kind: DeviceKind, head: u32, count: u16) -> Result<Vec<u16>> {
        let cmd = ReadWordCommand::new(self.destination, kind, head, count)?
            .with_monitoring_timer(self.monitoring_timer);
        let result = self.transact(&cmd).and_then(|r| r.to_words(count));
        self.track(result)
    }

    /// Writes `values` to consecutive words starting at `head`.
    ///
    /// # Errors
    ///
    /// As [`read_words`](Self::read_words); `values` must hold 1 to 960 words.
    pub fn write_words(&mut self, kind: DeviceKind, head: u32, values: &[u16]) -> Result<()> {
        let cmd = WriteWordCommand::new(self.destination, kind, head, values)?
            .with_monitoring_timer(self.monitoring_timer);
        let result = self.transact(&cmd).and_then(|r| r.to_ack());
        self.track(result)
    }

    /// Reads `count` bits starting at `head`, one byte (0 or 1) per point.
    ///
    /// # Errors
    ///
    /// As [`read_words`](Self::read_words), with `kind` required to be a bit
    /// device and `count` up to 7168.
    pub fn read_bits(&mut self, kind: DeviceKind, head: u32, count: u16) -> Result<Vec<u8>> {
        let cmd = ReadBitCommand::new(self.destination, kind, head, count)?
            .with_monitoring_timer(self.monitoring_timer);
        let result = self.transact(&cmd).and_then(|r| r.to_bits(count));
        self.track(result)
    }

    /// Writes `bits` (one byte per point, non-zero = ON) starting at `head`.
    ///
    /// # Errors
    ///
    /// As [`read_bits`](Self::read_bits); `bits` must hold 1 to 7168 points.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use slmp::{Connection, DeviceKind};
    ///
    /// let mut conn = Connection::connect("192.168.10.61", 5000).unwrap();
    /// conn.write_bits(DeviceKind::M, 0, &[1, 0, 1, 0, 0, 1, 0, 0, 0, 1]).unwrap();
    /// ```
    pub fn write_bits(&mut self, kind: DeviceKind, head: u32, bits: &[u8]) -> Result<()> {
        let cmd = WriteBitCommand::new(self.destination, kind, head, bits)?
            .with_monitoring_timer(self.monitoring_timer);
        let result = self.transact(&cmd).and_then(|r| r.to_ack());
        self.track(result)
    }

    /// Marks the connection broken when `result` leaves the stream out of sync.
    fn track<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(SlmpError::Transport(_) | SlmpError::Protocol { .. }) = &result {
            if !self.broken {
                log::warn!("Connection marked broken; reconnect to continue");
            }
            self.broken = true;
        }
        result
    }

    /// Sends one command and decodes its response frame.
    fn transact(&mut self, cmd: &impl Command) -> Result<SlmpResponse> {
        if self.broken {
            return Err(SlmpError::Transport(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection is broken by an earlier failure",
            )));
        }

        let request = cmd.to_bytes();
        let max = self.buffer.max_frame_size();
        if request.len() > max || cmd.response_frame_len() > max {
            return Err(SlmpError::invalid_address(format!(
                "{} x{} does not fit in a {}-byte frame",
                cmd.address(),
                cmd.address().count(),
                max
            )));
        }

        if !self.buffer.is_empty() {
            log::warn!(
                "Discarding {} stale bytes before sending",
                self.buffer.len()
            );
            self.buffer.clear();
        }

        log::trace!("Request {:?}: {:02X?}", cmd.class(), request);
        let result = self
            .exchange(&request)
            .and_then(|frame| SlmpResponse::from_bytes(&frame));

        match result {
            Ok(response) => {
                log::debug!(
                    "{} x{}: {:?} (end code 0x{:04X})",
                    cmd.address(),
                    cmd.address().count(),
                    response.class(cmd.class().is_write()),
                    response.end_code()
                );
                Ok(response)
            }
            Err(e) => {
                if !self.buffer.is_empty() {
                    log::warn!("Clearing {} buffered bytes after: {}", self.buffer.len(), e);
                }
                self.buffer.clear();
                Err(e)
            }
        }
    }

    /// Writes the request and reads until one full frame is buffered.
    fn exchange(&mut self, request: &[u8]) -> Result<Bytes> {
        self.transport.send(request)?;

        let mut chunk = [0u8; RECEIVE_CHUNK_SIZE];
        loop {
            if let Some(frame) = self.buffer.try_take_frame()? {
                log::trace!("Response: {:02X?}", &frame[..]);
                return Ok(frame);
            }
            let n = self.transport.receive(&mut chunk)?;
            if n == 0 {
                return Err(SlmpError::Transport(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by peer",
                )));
            }
            self.buffer.push(&chunk[..n]);
        }
    }
}

impl<T: Transport> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("destination", &self.destination)
            .field("monitoring_timer", &self.monitoring_timer)
            .field("buffered", &self.buffer.len())
            .field("broken", &self.broken)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::command::CommandFrame;
    use crate::response::ErrorInfo;

    /// Transport that replays canned chunks and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        sent: Vec<Vec<u8>>,
        incoming: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedTransport {
        fn replying(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                sent: Vec::new(),
                incoming: chunks.into_iter().map(Ok).collect(),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&mut self, data: &[u8]) -> io::Result<()> {
            self.sent.push(data.to_vec());
            Ok(())
        }

        fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.incoming.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }

        fn close(self) -> io::Result<()> {
            Ok(())
        }
    }

    fn connection(chunks: Vec<Vec<u8>>) -> Connection<ScriptedTransport> {
        Connection::with_transport(
            ScriptedTransport::replying(chunks),
            &ClientConfig::new("plc", 5000),
        )
    }

    fn ok(data: &[u8]) -> Vec<u8> {
        SlmpResponse::completed(Destination::local(), data.to_vec())
            .unwrap()
            .to_bytes()
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new("10.0.0.1", 5000);
        assert_eq!(config.addr(), "10.0.0.1:5000");
        assert_eq!(config.destination, Destination::local());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.monitoring_timer, 0);
        assert_eq!(config.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
    }

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::new("plc", 1025)
            .with_network(1)
            .with_station(2)
            .with_module_io(0x03E0)
            .with_multidrop(3)
            .with_monitoring_timer(0x0010)
            .with_max_frame_size(1024)
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.destination, Destination::new(1, 2, 0x03E0, 3));
        assert_eq!(config.monitoring_timer, 0x0010);
        assert_eq!(config.max_frame_size, 1024);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_read_words_fragmented() {
        let frame = ok(&[0x01, 0x00, 0x02, 0x00]);
        let chunks = frame.chunks(3).map(|c| c.to_vec()).collect();
        let mut conn = connection(chunks);

        assert_eq!(conn.read_words(DeviceKind::D, 1, 2).unwrap(), vec![1, 2]);
        assert_eq!(conn.buffered_len(), 0);

        let sent = CommandFrame::from_bytes(&conn.transport.sent[0]).unwrap();
        assert_eq!(sent.address.kind(), DeviceKind::D);
        assert_eq!(sent.address.head(), 1);
        assert_eq!(sent.address.count(), 2);
    }

    #[test]
    fn test_monitoring_timer_is_sent() {
        let config = ClientConfig::new("plc", 5000).with_monitoring_timer(0x0010);
        let mut conn =
            Connection::with_transport(ScriptedTransport::replying(vec![ok(&[])]), &config);
        conn.write_words(DeviceKind::D, 0, &[7]).unwrap();
        let sent = CommandFrame::from_bytes(&conn.transport.sent[0]).unwrap();
        assert_eq!(sent.monitoring_timer, 0x0010);
    }

    #[test]
    fn test_invalid_address_sends_nothing() {
        let mut conn = connection(vec![]);
        assert!(matches!(
            conn.read_words(DeviceKind::D, 0, 0).unwrap_err(),
            SlmpError::InvalidAddress { .. }
        ));
        assert!(matches!(
            conn.read_bits(DeviceKind::D, 0, 1).unwrap_err(),
            SlmpError::InvalidAddress { .. }
        ));
        assert!(matches!(
            conn.write_bits(DeviceKind::M, 0, &[]).unwrap_err(),
            SlmpError::InvalidAddress { .. }
        ));
        assert!(conn.transport.sent.is_empty());
    }

    #[test]
    fn test_frame_size_limit_sends_nothing() {
        let config = ClientConfig::new("plc", 5000).with_max_frame_size(64);
        let mut conn = Connection::with_transport(ScriptedTransport::default(), &config);
        // 9 + 2 + 2 * 40 = 91 bytes of response
        let err = conn.read_words(DeviceKind::D, 0, 40).unwrap_err();
        assert!(matches!(err, SlmpError::InvalidAddress { .. }));
        assert!(conn.transport.sent.is_empty());
    }

    #[test]
    fn test_controller_error() {
        let info = ErrorInfo {
            destination: Destination::local(),
            command: 0x0401,
            subcommand: 0x0000,
        };
        let frame = SlmpResponse::failed(Destination::local(), 0xC056, Some(info)).to_bytes();
        let mut conn = connection(vec![frame]);

        match conn.read_words(DeviceKind::D, 0, 1).unwrap_err() {
            SlmpError::Controller { end_code, info } => {
                assert_eq!(end_code, 0xC056);
                assert_eq!(info.unwrap().command, 0x0401);
            }
            other => panic!("Expected Controller, got {:?}", other),
        }
    }

    #[test]
    fn test_peer_close_is_transport_failure() {
        let frame = ok(&[0x01, 0x00]);
        let mut conn = connection(vec![frame[..5].to_vec()]);
        let err = conn.read_words(DeviceKind::D, 0, 1).unwrap_err();
        assert!(matches!(err, SlmpError::Transport(_)));
        assert_eq!(conn.buffered_len(), 0);
    }

    #[test]
    fn test_timeout_clears_buffer() {
        let frame = ok(&[0x01, 0x00]);
        let transport = ScriptedTransport {
            sent: Vec::new(),
            incoming: VecDeque::from(vec![
                Ok(frame[..6].to_vec()),
                Err(io::Error::from(io::ErrorKind::WouldBlock)),
            ]),
        };
        let mut conn = Connection::with_transport(transport, &ClientConfig::new("plc", 5000));

        let err = conn.read_words(DeviceKind::D, 0, 1).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(conn.buffered_len(), 0);
        assert!(conn.is_broken());
    }

    #[test]
    fn test_broken_connection_sends_nothing() {
        // The late reply to the timed-out request sits right behind the timeout
        let late = ok(&[0x6F, 0x00]);
        let transport = ScriptedTransport {
            sent: Vec::new(),
            incoming: VecDeque::from(vec![
                Err(io::Error::from(io::ErrorKind::WouldBlock)),
                Ok(late),
            ]),
        };
        let mut conn = Connection::with_transport(transport, &ClientConfig::new("plc", 5000));

        assert!(conn.read_words(DeviceKind::D, 0, 1).unwrap_err().is_timeout());

        for _ in 0..2 {
            match conn.read_words(DeviceKind::D, 100, 1).unwrap_err() {
                SlmpError::Transport(e) => assert_eq!(e.kind(), io::ErrorKind::NotConnected),
                other => panic!("Expected Transport, got {:?}", other),
            }
        }
        assert!(conn.write_bits(DeviceKind::M, 0, &[1]).is_err());
        assert_eq!(conn.transport.sent.len(), 1);
        assert_eq!(conn.transport.incoming.len(), 1);
    }

    #[test]
    fn test_short_data_breaks_connection() {
        let mut conn = connection(vec![ok(&[0x01, 0x00]), ok(&[0x01, 0x00])]);
        assert!(conn.read_words(DeviceKind::D, 0, 2).is_err());
        assert!(conn.is_broken());
        assert!(conn.read_words(DeviceKind::D, 0, 1).is_err());
        assert_eq!(conn.transport.sent.len(), 1);
    }

    #[test]
    fn test_controller_error_and_invalid_address_keep_connection() {
        let failed = SlmpResponse::failed(Destination::local(), 0xC051, None).to_bytes();
        let mut conn = connection(vec![failed, ok(&[0x02, 0x00])]);

        assert!(conn.read_words(DeviceKind::D, 0, 1).is_err());
        assert!(conn.read_words(DeviceKind::D, 0, 0).is_err());
        assert!(!conn.is_broken());
        assert_eq!(conn.read_words(DeviceKind::D, 0, 1).unwrap(), vec![2]);
    }

    #[test]
    fn test_bad_subheader_is_protocol_violation() {
        let mut frame = ok(&[0x01, 0x00]);
        frame[0] = 0x54;
        let mut conn = connection(vec![frame]);
        let err = conn.read_words(DeviceKind::D, 0, 1).unwrap_err();
        assert!(matches!(err, SlmpError::Protocol { .. }));
    }

    #[test]
    fn test_short_data_is_protocol_violation() {
        let mut conn = connection(vec![ok(&[0x01, 0x00])]);
        let err = conn.read_words(DeviceKind::D, 0, 2).unwrap_err();
        assert!(matches!(err, SlmpError::Protocol { .. }));
    }

    #[test]
    fn test_stale_bytes_discarded_before_next_request() {
        let mut first = ok(&[0x05, 0x00]);
        first.extend_from_slice(&[0xD0, 0x00, 0x00]); // garbage after the frame
        let mut conn = connection(vec![first, ok(&[0x06, 0x00])]);

        assert_eq!(conn.read_words(DeviceKind::D, 0, 1).unwrap(), vec![5]);
        assert_eq!(conn.buffered_len(), 3);
        assert_eq!(conn.read_words(DeviceKind::D, 0, 1).unwrap(), vec![6]);
        assert_eq!(conn.buffered_len(), 0);
    }

    #[test]
    fn test_shutdown() {
        let conn = connection(vec![]);
        assert!(conn.shutdown().is_ok());
    }
}
