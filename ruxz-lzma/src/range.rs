//! Range decoder for LZMA decompression.
//!
//! The range decoder is an arithmetic-coding decoder operating over a
//! renormalized probability interval:
//! - 32-bit range, renormalized whenever it drops below 2^24
//! - 11-bit adaptive probabilities (2048 = certainty, 1024 = 50%)
//! - probabilities move by 1/32 of the remaining distance per update

use ruxz_core::error::{Result, XzError};

/// Number of bits in the probability model.
pub const PROB_BITS: u32 = 11;

/// Initial probability (50%).
pub const PROB_INIT: u16 = 1 << (PROB_BITS - 1);

/// Maximum probability value (certainty).
pub const PROB_MAX: u16 = 1 << PROB_BITS;

/// Adaptation shift: probabilities move by 1/32 per decoded bit.
const MOVE_BITS: u32 = 5;

/// Renormalization threshold.
const TOP_VALUE: u32 = 1 << 24;

/// Bytes consumed by range-decoder initialization.
pub const INIT_BYTES: usize = 5;

/// Range decoder over one LZMA2 chunk payload.
///
/// The decoder owns a cursor into the payload slice; a chunk is well-formed
/// only if decoding consumes the payload exactly (see [`Self::finish`]).
#[derive(Debug)]
pub struct RangeDecoder<'a> {
    input: &'a [u8],
    pos: usize,
    range: u32,
    code: u32,
}

impl<'a> RangeDecoder<'a> {
    /// Initialize from a chunk payload.
    ///
    /// The first payload byte must be zero and the next four seed the code
    /// value, per the LZMA scheme.
    pub fn new(input: &'a [u8]) -> Result<Self> {
        if input.len() < INIT_BYTES {
            return Err(XzError::data("LZMA chunk shorter than range coder init"));
        }
        if input[0] != 0x00 {
            return Err(XzError::data("nonzero first byte in range coder init"));
        }
        let code = u32::from_be_bytes([input[1], input[2], input[3], input[4]]);
        Ok(Self {
            input,
            pos: INIT_BYTES,
            range: u32::MAX,
            code,
        })
    }

    /// Refill the range when it gets small.
    #[inline]
    fn normalize(&mut self) -> Result<()> {
        if self.range < TOP_VALUE {
            let byte = *self
                .input
                .get(self.pos)
                .ok_or_else(|| XzError::data("range coder ran out of chunk payload"))?;
            self.pos += 1;
            self.range <<= 8;
            self.code = (self.code << 8) | byte as u32;
        }
        Ok(())
    }

    /// Decode one bit with an adaptive probability.
    #[inline]
    pub fn decode_bit(&mut self, prob: &mut u16) -> Result<u32> {
        self.normalize()?;

        let bound = (self.range >> PROB_BITS) * (*prob as u32);
        if self.code < bound {
            self.range = bound;
            *prob += (PROB_MAX - *prob) >> MOVE_BITS;
            Ok(0)
        } else {
            self.range -= bound;
            self.code -= bound;
            *prob -= *prob >> MOVE_BITS;
            Ok(1)
        }
    }

    /// Decode one bit at a fixed 50% probability.
    #[inline]
    pub fn decode_direct_bit(&mut self) -> Result<u32> {
        self.normalize()?;

        self.range >>= 1;
        self.code = self.code.wrapping_sub(self.range);
        let bit = if (self.code as i32) < 0 {
            self.code = self.code.wrapping_add(self.range);
            0
        } else {
            1
        };
        Ok(bit)
    }

    /// Decode `count` fixed-probability bits, most significant first.
    pub fn decode_direct_bits(&mut self, count: u32) -> Result<u32> {
        let mut result = 0u32;
        for _ in 0..count {
            result = (result << 1) | self.decode_direct_bit()?;
        }
        Ok(result)
    }

    /// Decode a bit tree of `num_bits` levels, returning the symbol.
    pub fn decode_bit_tree(&mut self, probs: &mut [u16], num_bits: u32) -> Result<u32> {
        let mut index = 1usize;
        for _ in 0..num_bits {
            let bit = self.decode_bit(&mut probs[index])?;
            index = (index << 1) | bit as usize;
        }
        Ok(index as u32 - (1 << num_bits))
    }

    /// Decode a bit tree in reverse bit order (used for distance low bits
    /// and the align field).
    pub fn decode_bit_tree_reverse(&mut self, probs: &mut [u16], num_bits: u32) -> Result<u32> {
        let mut index = 1usize;
        let mut result = 0u32;
        for i in 0..num_bits {
            let bit = self.decode_bit(&mut probs[index])?;
            index = (index << 1) | bit as usize;
            result |= bit << i;
        }
        Ok(result)
    }

    /// Verify the end-of-chunk condition: one final renormalization, the
    /// payload consumed exactly, and the code register back at zero.
    pub fn finish(mut self) -> Result<()> {
        self.normalize()?;
        if self.pos != self.input.len() {
            return Err(XzError::data(format!(
                "LZMA chunk payload size mismatch: consumed {} of {} bytes",
                self.pos,
                self.input.len()
            )));
        }
        if self.code != 0 {
            return Err(XzError::data("range coder not in end state at chunk end"));
        }
        Ok(())
    }
}
