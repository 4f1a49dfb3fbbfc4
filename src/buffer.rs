//! Receive buffer that reassembles frames from a byte stream.
//!
//! TCP delivers bytes, not frames: one read may hold half a frame, or the end
//! of one frame and the start of the next. [`FrameBuffer`] accumulates bytes
//! in arrival order and hands out a frame only once the length declared in
//! its header is fully present.
//!
//! # Example
//!
//! ```
//! use slmp::FrameBuffer;
//!
//! let frame = [0xD0, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x02, 0x00, 0x00, 0x00];
//! let mut buffer = FrameBuffer::new();
//!
//! buffer.push(&frame[..5]);
//! assert!(buffer.try_take_frame().unwrap().is_none());
//!
//! buffer.push(&frame[5..]);
//! let taken = buffer.try_take_frame().unwrap().unwrap();
//! assert_eq!(&taken[..], &frame[..]);
//! assert!(buffer.is_empty());
//! ```

use bytes::{Bytes, BytesMut};

use crate::error::{Result, SlmpError};
use crate::header::{read_length_field, HEADER_SIZE};

/// Default upper bound on a single frame, header included.
///
/// The largest batch response (7168 bit points) is 3595 bytes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4096;

/// Byte queue with frame extraction.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
    max_frame_size: usize,
}

impl FrameBuffer {
    /// Creates an empty buffer with [`DEFAULT_MAX_FRAME_SIZE`].
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Creates an empty buffer rejecting frames larger than `max_frame_size`.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_frame_size.min(DEFAULT_MAX_FRAME_SIZE)),
            max_frame_size,
        }
    }

    /// Maximum accepted frame size.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Appends received bytes and returns the total number buffered.
    pub fn push(&mut self, data: &[u8]) -> usize {
        self.buffer.extend_from_slice(data);
        self.buffer.len()
    }

    /// Removes and returns the first complete frame, if one is buffered.
    ///
    /// Returns `Ok(None)` when more bytes are needed; nothing is discarded in
    /// that case. Bytes after the returned frame stay buffered.
    ///
    /// # Errors
    ///
    /// Returns `SlmpError::Protocol` if the buffered header declares a frame
    /// larger than the maximum frame size. The buffer is left as is; the
    /// caller decides whether to [`clear`](Self::clear) it.
    pub fn try_take_frame(&mut self) -> Result<Option<Bytes>> {
        if self.buffer.len() < HEADER_SIZE {
            return Ok(None);
        }

        let frame_len = HEADER_SIZE + usize::from(read_length_field(&self.buffer));
        if frame_len > self.max_frame_size {
            return Err(SlmpError::protocol(format!(
                "declared frame size {} exceeds maximum {}",
                frame_len, self.max_frame_size
            )));
        }

        if self.buffer.len() < frame_len {
            return Ok(None);
        }

        Ok(Some(self.buffer.split_to(frame_len).freeze()))
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discards all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
