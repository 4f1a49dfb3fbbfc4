//! Byte-stream transport for SLMP communication.
//!
//! The protocol engine only needs four things from a transport: connect,
//! send bytes, receive whatever bytes are available, and close. The
//! [`Transport`] trait captures the last three (connecting is specific to each
//! implementation); [`TcpTransport`] implements it over a blocking
//! [`TcpStream`].
//!
//! The transport knows nothing about frames. Reassembly happens in
//! [`FrameBuffer`](crate::FrameBuffer).

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Default timeout for connect, send and receive.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// A connected byte stream.
pub trait Transport {
    /// Sends all of `data`.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Receives available bytes into `buf`, blocking until at least one
    /// arrives. Returns 0 when the peer has closed the stream.
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Closes the stream.
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}

/// TCP transport with read/write timeouts.
pub struct TcpTransport {
    stream: TcpStream,
    peer_addr: SocketAddr,
}

impl TcpTransport {
    /// Connects to `host:port`, trying each resolved address in turn.
    ///
    /// `timeout` bounds each connect attempt and every later send/receive.
    ///
    /// # Errors
    ///
    /// Returns the last connect error, or an `InvalidInput` error if `host`
    /// resolves to no address.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> io::Result<Self> {
        let mut last_err = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Self::from_stream(stream, timeout),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{}:{} did not resolve to any address", host, port),
            )
        }))
    }

    /// Wraps an already connected stream and applies `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket options cannot be set.
    pub fn from_stream(stream: TcpStream, timeout: Duration) -> io::Result<Self> {
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr()?;
        Ok(Self { stream, peer_addr })
    }

    /// Returns the remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data)
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.stream.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    fn close(self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer_addr", &self.peer_addr)
            .field("local_addr", &self.stream.local_addr().ok())
            .finish()
    }
}
