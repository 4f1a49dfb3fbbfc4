//! Payload conversions between caller values and wire bytes.
//!
//! Word devices travel as little-endian 16-bit values. Bit devices travel
//! packed two points per byte: the first point in the high nibble, the second
//! in the low nibble.
//!
//! # Example
//!
//! ```
//! use slmp::utils::{pack_bits, unpack_bits};
//!
//! let bits = [1, 0, 1, 1, 0];
//! let packed = pack_bits(&bits);
//! assert_eq!(packed, vec![0x10, 0x11, 0x00]);
//! assert_eq!(unpack_bits(&packed, 5), bits.to_vec());
//! ```

/// Packs one-byte-per-point bit values into wire nibbles.
///
/// Any non-zero input byte is treated as ON. An odd trailing point leaves the
/// low nibble of the last byte at 0.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks(2)
        .map(|pair| {
            let high = if pair[0] != 0 { 0x10 } else { 0x00 };
            let low = match pair.get(1) {
                Some(&b) if b != 0 => 0x01,
                _ => 0x00,
            };
            high | low
        })
        .collect()
}

/// Unpacks wire nibbles into `count` one-byte-per-point values (0 or 1).
///
/// Points beyond `count` (the padding nibble of an odd count) are dropped.
/// If `data` holds fewer than `count` points, only those present are returned.
pub fn unpack_bits(data: &[u8], count: usize) -> Vec<u8> {
    data.iter()
        .flat_map(|&b| [u8::from(b & 0xF0 != 0), u8::from(b & 0x0F != 0)])
        .take(count)
        .collect()
}

/// Serializes words as little-endian bytes.
pub fn words_to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Parses little-endian bytes into words. A trailing odd byte is ignored.
pub fn bytes_to_words(data: &[u8]) -> Vec<u16> {
    data.chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}
