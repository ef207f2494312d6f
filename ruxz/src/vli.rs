//! Variable-length integers (VLI).
//!
//! The xz container stores most sizes as little-endian base-128 integers:
//! seven payload bits per byte, high bit set on every byte except the last.
//! Values are limited to 63 bits, so an encoding never exceeds nine bytes,
//! and the shortest possible encoding is required (a final 0x00 byte after
//! the first is redundant and therefore invalid).

use ruxz_core::error::{Result, XzError};

/// Maximum value a VLI can carry.
pub const VLI_MAX: u64 = u64::MAX / 2;

/// Maximum encoded length in bytes.
pub const VLI_BYTES_MAX: usize = 9;

/// Incremental VLI accumulator.
///
/// The container parser receives input in arbitrary slices, so VLIs are
/// gathered byte by byte: feed each byte to [`Self::push`] until it reports
/// completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct VliDecoder {
    value: u64,
    shift: u32,
}

impl VliDecoder {
    /// Start decoding a fresh integer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one encoded byte. Returns `Some(value)` once the integer is
    /// complete, `None` when more bytes are needed.
    pub fn push(&mut self, byte: u8) -> Result<Option<u64>> {
        if self.shift >= 63 {
            return Err(XzError::data("variable-length integer exceeds nine bytes"));
        }
        if byte == 0x00 && self.shift > 0 {
            // Only the canonical, shortest encoding is accepted.
            return Err(XzError::data("non-minimal variable-length integer"));
        }

        self.value |= u64::from(byte & 0x7F) << self.shift;
        if byte & 0x80 == 0 {
            let value = self.value;
            *self = Self::default();
            return Ok(Some(value));
        }
        self.shift += 7;
        Ok(None)
    }
}

/// Decode a VLI from the front of `input`, returning the value and the
/// number of bytes consumed.
///
/// Fails if the slice ends mid-integer.
pub fn decode(input: &[u8]) -> Result<(u64, usize)> {
    let mut decoder = VliDecoder::new();
    for (i, &byte) in input.iter().enumerate() {
        if let Some(value) = decoder.push(byte)? {
            return Ok((value, i + 1));
        }
    }
    Err(XzError::data("truncated variable-length integer"))
}
