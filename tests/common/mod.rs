//! In-memory controller used by the integration tests.
//!
//! [`PlcState`] decodes request frames with [`CommandFrame`], keeps device
//! memory and builds response frames. [`FakePlc`] wraps it as a
//! [`Transport`] that hands responses back in fixed-size fragments;
//! [`serve_tcp`] puts the same state behind a real socket.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};

use slmp::utils::{pack_bits, words_to_bytes};
use slmp::{
    ClientConfig, CommandFrame, Connection, DeviceKind, ErrorInfo, FrameClass, SlmpResponse,
    Transport, HEADER_SIZE,
};

/// One-shot misbehaviour applied to the next request.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Reply with this end code and an error information block.
    EndCode(u16),
    /// Reply with these bytes instead of a response.
    Raw(Vec<u8>),
    /// Send only the first `n` bytes of the normal response, then hang up.
    Truncate(usize),
    /// Never reply; reads time out.
    Silent,
}

/// Controller memory and request log.
#[derive(Debug, Default)]
pub struct PlcState {
    words: HashMap<(DeviceKind, u32), u16>,
    bits: HashMap<(DeviceKind, u32), u8>,
    /// Every request frame received, decoded.
    pub requests: Vec<CommandFrame>,
    /// Every raw request received.
    pub raw_requests: Vec<Vec<u8>>,
    fault: Option<Fault>,
    /// Set once the client closes the transport.
    pub closed: bool,
}

impl PlcState {
    /// Word value at `kind`/`number` (0 if never written).
    pub fn word(&self, kind: DeviceKind, number: u32) -> u16 {
        self.words.get(&(kind, number)).copied().unwrap_or(0)
    }

    /// Bit value at `kind`/`number` (0 if never written).
    pub fn bit(&self, kind: DeviceKind, number: u32) -> u8 {
        self.bits.get(&(kind, number)).copied().unwrap_or(0)
    }

    /// Presets word memory.
    pub fn set_words(&mut self, kind: DeviceKind, head: u32, values: &[u16]) {
        for (i, v) in values.iter().enumerate() {
            self.words.insert((kind, head + i as u32), *v);
        }
    }

    /// Presets bit memory.
    pub fn set_bits(&mut self, kind: DeviceKind, head: u32, values: &[u8]) {
        for (i, v) in values.iter().enumerate() {
            self.bits.insert((kind, head + i as u32), u8::from(*v != 0));
        }
    }

    /// Arms a fault for the next request.
    pub fn fail_next(&mut self, fault: Fault) {
        self.fault = Some(fault);
    }

    /// Handles one request frame. Returns the reply bytes, or `None` for a
    /// silent fault.
    pub fn respond(&mut self, request: &[u8]) -> Option<Vec<u8>> {
        self.raw_requests.push(request.to_vec());
        let frame = CommandFrame::from_bytes(request).expect("client sent a malformed request");
        self.requests.push(frame.clone());

        let destination = frame.header.destination;
        match self.fault.take() {
            Some(Fault::EndCode(end_code)) => {
                let info = ErrorInfo {
                    destination,
                    command: frame.command,
                    subcommand: frame.subcommand,
                };
                Some(SlmpResponse::failed(destination, end_code, Some(info)).to_bytes())
            }
            Some(Fault::Raw(bytes)) => Some(bytes),
            Some(Fault::Silent) => None,
            Some(Fault::Truncate(n)) => {
                let mut full = self.execute(&frame);
                full.truncate(n);
                Some(full)
            }
            None => Some(self.execute(&frame)),
        }
    }

    fn execute(&mut self, frame: &CommandFrame) -> Vec<u8> {
        let address = frame.address;
        let (kind, head, count) = (address.kind(), address.head(), address.count());
        let destination = frame.header.destination;

        let data = match (frame.class(), frame.is_bit_units()) {
            (FrameClass::WriteCommand, false) => {
                self.set_words(kind, head, &frame.words());
                Vec::new()
            }
            (FrameClass::WriteCommand, true) => {
                self.set_bits(kind, head, &frame.bits());
                Vec::new()
            }
            (_, false) => {
                let words: Vec<u16> = (0..u32::from(count))
                    .map(|i| self.word(kind, head + i))
                    .collect();
                words_to_bytes(&words)
            }
            (_, true) => {
                let bits: Vec<u8> = (0..u32::from(count))
                    .map(|i| self.bit(kind, head + i))
                    .collect();
                pack_bits(&bits)
            }
        };
        SlmpResponse::completed(destination, data)
            .expect("reply fits in one frame")
            .to_bytes()
    }
}

/// Shared handle to a fake controller's state.
pub type PlcHandle = Arc<Mutex<PlcState>>;

/// In-memory [`Transport`] backed by a [`PlcState`].
pub struct FakePlc {
    state: PlcHandle,
    outgoing: VecDeque<u8>,
    fragment_size: usize,
    silent: bool,
}

impl FakePlc {
    /// Creates a fake controller delivering replies `fragment_size` bytes at a time.
    pub fn new(fragment_size: usize) -> (Self, PlcHandle) {
        let state = PlcHandle::default();
        let plc = Self {
            state: Arc::clone(&state),
            outgoing: VecDeque::new(),
            fragment_size: fragment_size.max(1),
            silent: false,
        };
        (plc, state)
    }
}

impl Transport for FakePlc {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let reply = self.state.lock().unwrap().respond(data);
        self.silent = reply.is_none();
        self.outgoing.extend(reply.unwrap_or_default());
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.outgoing.is_empty() {
            if self.silent {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "no reply"));
            }
            return Ok(0);
        }
        let n = self.fragment_size.min(buf.len()).min(self.outgoing.len());
        for (slot, byte) in buf.iter_mut().zip(self.outgoing.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn close(self) -> io::Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Connection to a fresh fake controller.
pub fn fake_connection(fragment_size: usize) -> (Connection<FakePlc>, PlcHandle) {
    let (plc, state) = FakePlc::new(fragment_size);
    let conn = Connection::with_transport(plc, &ClientConfig::new("fake-plc", 5000));
    (conn, state)
}

/// Serves one TCP client from `listener` until it disconnects.
pub fn serve_tcp(listener: TcpListener, state: PlcHandle) -> io::Result<()> {
    let (mut socket, _) = listener.accept()?;
    while let Some(request) = read_request(&mut socket)? {
        let reply = state.lock().unwrap().respond(&request);
        if let Some(reply) = reply {
            socket.write_all(&reply)?;
        }
    }
    Ok(())
}

/// Reads one request frame; `None` once the client disconnects.
pub fn read_request(socket: &mut TcpStream) -> io::Result<Option<Vec<u8>>> {
    let mut frame = vec![0u8; HEADER_SIZE];
    match socket.read_exact(&mut frame) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = usize::from(u16::from_le_bytes([frame[7], frame[8]]));
    frame.resize(HEADER_SIZE + len, 0);
    socket.read_exact(&mut frame[HEADER_SIZE..])?;
    Ok(Some(frame))
}
