//! LZMA2 chunk decoding.
//!
//! LZMA2 wraps raw LZMA in a sequence of self-describing chunks. Each chunk
//! header says whether the payload is LZMA-compressed or stored verbatim,
//! how large both forms are, and which decoder state (dictionary,
//! probability model, properties) must be reset before decoding it. The
//! range coder always restarts at each compressed chunk, so a chunk can be
//! decoded from a complete in-memory payload slice.
//!
//! Control byte layout:
//!
//! ```text
//! 0x00        end of the block's LZMA2 data
//! 0x01        uncompressed chunk, reset dictionary
//! 0x02        uncompressed chunk, no reset
//! 0x03-0x7F   invalid
//! 1RRUUUUU    compressed chunk; RR = reset level,
//!             UUUUU = bits 16-20 of (uncompressed size - 1)
//! ```

use ruxz_core::error::{Result, XzError};
use ruxz_core::window::{DictWindow, DICT_SIZE_MIN};

use crate::model::{LzmaModel, LzmaProps, State, MATCH_LEN_MIN};
use crate::range::RangeDecoder;

/// What a compressed chunk's control byte asks to be reset before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkReset {
    /// Continue with all state from the previous chunk.
    None,
    /// Reset the state machine, rep distances, and probabilities.
    State,
    /// State reset plus new properties from the header.
    StateAndProps,
    /// Everything, including the dictionary.
    Dict,
}

/// A parsed LZMA2 chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkHeader {
    /// Control byte 0x00: no more chunks in this block.
    EndOfData,
    /// Verbatim payload of `size` bytes.
    Uncompressed {
        /// Number of payload bytes.
        size: usize,
        /// Whether the dictionary is cleared before the copy.
        reset_dict: bool,
    },
    /// LZMA-compressed payload.
    Compressed {
        /// Decoded size of this chunk.
        uncompressed_size: usize,
        /// Payload size in the stream.
        compressed_size: usize,
        /// New properties, present when the reset level includes them.
        props: Option<LzmaProps>,
        /// Reset level from the control byte.
        reset: ChunkReset,
    },
}

impl ChunkHeader {
    /// Total header length implied by the control byte, including the
    /// control byte itself.
    pub fn encoded_len(control: u8) -> Result<usize> {
        match control {
            0x00 => Ok(1),
            0x01 | 0x02 => Ok(3),
            0x03..=0x7F => Err(XzError::data(format!(
                "invalid LZMA2 control byte 0x{control:02x}"
            ))),
            0x80..=0xBF => Ok(5),
            0xC0..=0xFF => Ok(6),
        }
    }

    /// Parse a complete chunk header.
    ///
    /// `bytes` must be exactly [`Self::encoded_len`] bytes for its control
    /// byte.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let control = bytes[0];
        debug_assert_eq!(bytes.len(), Self::encoded_len(control)?);

        match control {
            0x00 => Ok(Self::EndOfData),
            0x01 | 0x02 => {
                let size = u16::from_be_bytes([bytes[1], bytes[2]]) as usize + 1;
                Ok(Self::Uncompressed {
                    size,
                    reset_dict: control == 0x01,
                })
            }
            0x03..=0x7F => Err(XzError::data(format!(
                "invalid LZMA2 control byte 0x{control:02x}"
            ))),
            _ => {
                let high = ((control & 0x1F) as usize) << 16;
                let uncompressed_size =
                    high + u16::from_be_bytes([bytes[1], bytes[2]]) as usize + 1;
                let compressed_size = u16::from_be_bytes([bytes[3], bytes[4]]) as usize + 1;

                let reset = match (control >> 5) & 0x03 {
                    0 => ChunkReset::None,
                    1 => ChunkReset::State,
                    2 => ChunkReset::StateAndProps,
                    _ => ChunkReset::Dict,
                };
                let props = if control >= 0xC0 {
                    Some(LzmaProps::from_byte(bytes[5])?)
                } else {
                    None
                };

                Ok(Self::Compressed {
                    uncompressed_size,
                    compressed_size,
                    props,
                    reset,
                })
            }
        }
    }

    /// Payload bytes following this header in the stream.
    pub fn payload_len(&self) -> usize {
        match *self {
            Self::EndOfData => 0,
            Self::Uncompressed { size, .. } => size,
            Self::Compressed {
                compressed_size, ..
            } => compressed_size,
        }
    }
}

/// Streaming LZMA2 decoder for one xz block sequence.
///
/// The decoder holds the dictionary, the probability model, and the chunk
/// reset bookkeeping. The container layer hands it one complete chunk at a
/// time via [`Self::decode_chunk`]; decoded bytes are appended to the
/// caller's output vector.
#[derive(Debug)]
pub struct Lzma2Decoder {
    window: DictWindow,
    model: Box<LzmaModel>,
    props: LzmaProps,
    state: State,
    /// Rep distances, 0-based (stored value is real distance minus one).
    reps: [u32; 4],
    /// Set at block start; the first chunk must reset the dictionary.
    need_dict_reset: bool,
    /// Set until a chunk carries a properties byte.
    need_props: bool,
}

impl Lzma2Decoder {
    /// Create a decoder with the given dictionary capacity.
    pub fn new(dict_size: usize) -> Self {
        let mut decoder = Self {
            window: DictWindow::new(dict_size),
            model: LzmaModel::new(),
            props: LzmaProps::default(),
            state: State::new(),
            reps: [0; 4],
            need_dict_reset: true,
            need_props: true,
        };
        decoder.reset();
        decoder
    }

    /// Dictionary capacity in bytes.
    pub fn dict_size(&self) -> usize {
        self.window.capacity()
    }

    /// Prepare for a new xz block: chunk reset requirements start over but
    /// the dictionary allocation is kept.
    pub fn begin_block(&mut self) {
        self.need_dict_reset = true;
        self.need_props = true;
    }

    /// Discard all state, keeping the dictionary allocation.
    pub fn reset(&mut self) {
        self.window.reset();
        self.reset_lzma_state();
        self.need_dict_reset = true;
        self.need_props = true;
    }

    /// Replace the dictionary if `dict_size` differs from the current
    /// capacity, then reset.
    pub fn reset_with_dict_size(&mut self, dict_size: usize) {
        if dict_size.max(DICT_SIZE_MIN) != self.window.capacity() {
            self.window = DictWindow::new(dict_size);
        }
        self.reset();
    }

    fn reset_lzma_state(&mut self) {
        self.state = State::new();
        self.reps = [0; 4];
        self.model.reset();
    }

    /// Decode one complete chunk, appending its uncompressed bytes to `out`.
    ///
    /// `payload` must be exactly `header.payload_len()` bytes.
    pub fn decode_chunk(
        &mut self,
        header: &ChunkHeader,
        payload: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<()> {
        debug_assert_eq!(payload.len(), header.payload_len());

        match *header {
            ChunkHeader::EndOfData => Ok(()),
            ChunkHeader::Uncompressed { reset_dict, .. } => {
                if reset_dict {
                    self.window.reset();
                    self.need_props = true;
                    self.need_dict_reset = false;
                } else if self.need_dict_reset {
                    return Err(XzError::data(
                        "first LZMA2 chunk of a block must reset the dictionary",
                    ));
                }
                self.window.extend(payload);
                out.extend_from_slice(payload);
                Ok(())
            }
            ChunkHeader::Compressed {
                uncompressed_size,
                props,
                reset,
                ..
            } => {
                if reset == ChunkReset::Dict {
                    self.window.reset();
                    self.need_props = true;
                    self.need_dict_reset = false;
                } else if self.need_dict_reset {
                    return Err(XzError::data(
                        "first LZMA2 chunk of a block must reset the dictionary",
                    ));
                }

                if let Some(new_props) = props {
                    self.props = new_props;
                    self.need_props = false;
                    self.reset_lzma_state();
                } else if self.need_props {
                    return Err(XzError::data(
                        "LZMA2 chunk uses properties before any were set",
                    ));
                } else if reset == ChunkReset::State {
                    self.reset_lzma_state();
                }

                self.decode_lzma(payload, uncompressed_size, out)
            }
        }
    }

    /// Run the LZMA symbol loop over one chunk payload.
    fn decode_lzma(&mut self, payload: &[u8], limit: usize, out: &mut Vec<u8>) -> Result<()> {
        let mut rc = RangeDecoder::new(payload)?;
        let mut produced = 0usize;

        while produced < limit {
            let pos_state = (self.window.total() & self.props.pos_mask()) as usize;
            let state = self.state.index();

            if rc.decode_bit(&mut self.model.is_match[state][pos_state])? == 0 {
                let byte = self.decode_literal(&mut rc)?;
                self.window.push(byte);
                out.push(byte);
                self.state.update_literal();
                produced += 1;
                continue;
            }

            let len;
            if rc.decode_bit(&mut self.model.is_rep[state])? == 0 {
                // New match: length first, then the distance machinery.
                len = self.decode_len(&mut rc, false, pos_state)?;
                let dist = self.decode_distance(&mut rc, len)?;
                if dist == u32::MAX {
                    // The classic LZMA end marker has no place in LZMA2;
                    // chunk boundaries delimit the data instead.
                    return Err(XzError::data("unexpected end marker in LZMA2 chunk"));
                }
                self.reps = [dist, self.reps[0], self.reps[1], self.reps[2]];
                self.state.update_match();
            } else if rc.decode_bit(&mut self.model.is_rep0[state])? == 0 {
                if rc.decode_bit(&mut self.model.is_rep0_long[state][pos_state])? == 0 {
                    // Short rep: a single byte from the rep0 distance.
                    self.state.update_short_rep();
                    let byte = self.window.byte_at(self.reps[0] as usize)?;
                    self.window.push(byte);
                    out.push(byte);
                    produced += 1;
                    continue;
                }
                len = self.decode_len(&mut rc, true, pos_state)?;
                self.state.update_rep();
            } else {
                // Pull the selected rep distance to the front.
                if rc.decode_bit(&mut self.model.is_rep1[state])? == 0 {
                    self.reps.swap(0, 1);
                } else if rc.decode_bit(&mut self.model.is_rep2[state])? == 0 {
                    self.reps = [self.reps[2], self.reps[0], self.reps[1], self.reps[3]];
                } else {
                    self.reps = [self.reps[3], self.reps[0], self.reps[1], self.reps[2]];
                }
                len = self.decode_len(&mut rc, true, pos_state)?;
                self.state.update_rep();
            }

            if produced + len > limit {
                // A match may not run past the chunk's declared size.
                return Err(XzError::data("LZMA2 match extends past chunk end"));
            }
            self.window
                .copy_match(self.reps[0] as usize, len, out)?;
            produced += len;
        }

        rc.finish()
    }

    /// Decode one literal byte, using the matched-literal probabilities when
    /// the previous symbol was a match.
    fn decode_literal(&mut self, rc: &mut RangeDecoder<'_>) -> Result<u8> {
        let prev_byte = self.window.last().unwrap_or(0);
        let context = self
            .model
            .literal_context(&self.props, self.window.total(), prev_byte);
        let probs = &mut self.model.literal[context];

        let mut symbol = 1usize;
        if !self.state.is_literal() {
            // After a match the byte at the rep0 distance predicts this one
            // bit by bit; on the first mismatch we fall back to the plain
            // tree below.
            let mut match_byte = self.window.byte_at(self.reps[0] as usize)? as usize;
            while symbol < 0x100 {
                match_byte <<= 1;
                let match_bit = match_byte & 0x100;
                let index = 0x100 + match_bit + symbol;
                let bit = rc.decode_bit(&mut probs[index])? as usize;
                symbol = (symbol << 1) | bit;
                if match_bit != bit << 8 {
                    break;
                }
            }
        }
        while symbol < 0x100 {
            let bit = rc.decode_bit(&mut probs[symbol])? as usize;
            symbol = (symbol << 1) | bit;
        }
        Ok(symbol as u8)
    }

    /// Decode a match length (2 to 273).
    fn decode_len(
        &mut self,
        rc: &mut RangeDecoder<'_>,
        is_rep: bool,
        pos_state: usize,
    ) -> Result<usize> {
        let len_model = if is_rep {
            &mut self.model.rep_len
        } else {
            &mut self.model.match_len
        };

        if rc.decode_bit(&mut len_model.choice)? == 0 {
            let sym = rc.decode_bit_tree(&mut len_model.low[pos_state], 3)?;
            Ok(MATCH_LEN_MIN + sym as usize)
        } else if rc.decode_bit(&mut len_model.choice2)? == 0 {
            let sym = rc.decode_bit_tree(&mut len_model.mid[pos_state], 3)?;
            Ok(MATCH_LEN_MIN + 8 + sym as usize)
        } else {
            let sym = rc.decode_bit_tree(&mut len_model.high, 8)?;
            Ok(MATCH_LEN_MIN + 16 + sym as usize)
        }
    }

    /// Decode a 0-based match distance for a new match of length `len`.
    fn decode_distance(&mut self, rc: &mut RangeDecoder<'_>, len: usize) -> Result<u32> {
        let len_state = (len - MATCH_LEN_MIN).min(3);
        let slot = rc.decode_bit_tree(&mut self.model.dist_slot[len_state], 6)? as usize;

        if slot < 4 {
            return Ok(slot as u32);
        }

        let footer_bits = (slot >> 1) as u32 - 1;
        let base = (2 | (slot & 1)) << footer_bits;

        if slot < crate::model::DIST_MODEL_END {
            // Adaptive reverse tree; the table offset is anchored at the
            // slot's base distance.
            let mut dist = base as u32;
            let mut index = 1usize;
            for i in 0..footer_bits {
                let probs_index = base + index - slot - 1;
                let bit = rc.decode_bit(&mut self.model.dist_special[probs_index])?;
                index = (index << 1) | bit as usize;
                dist += bit << i;
            }
            Ok(dist)
        } else {
            let direct = rc.decode_direct_bits(footer_bits - crate::model::ALIGN_BITS)?;
            let align = rc.decode_bit_tree_reverse(&mut self.model.dist_align, 4)?;
            Ok((base as u32)
                .wrapping_add(direct << crate::model::ALIGN_BITS)
                .wrapping_add(align))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lengths() {
        assert_eq!(ChunkHeader::encoded_len(0x00).unwrap(), 1);
        assert_eq!(ChunkHeader::encoded_len(0x01).unwrap(), 3);
        assert_eq!(ChunkHeader::encoded_len(0x02).unwrap(), 3);
        assert_eq!(ChunkHeader::encoded_len(0x80).unwrap(), 5);
        assert_eq!(ChunkHeader::encoded_len(0xC0).unwrap(), 6);
        assert_eq!(ChunkHeader::encoded_len(0xE0).unwrap(), 6);
        assert!(ChunkHeader::encoded_len(0x03).is_err());
        assert!(ChunkHeader::encoded_len(0x7F).is_err());
    }

    #[test]
    fn test_parse_uncompressed_header() {
        let header = ChunkHeader::parse(&[0x01, 0x00, 0x04]).unwrap();
        assert_eq!(
            header,
            ChunkHeader::Uncompressed {
                size: 5,
                reset_dict: true
            }
        );
        assert_eq!(header.payload_len(), 5);
    }

    #[test]
    fn test_parse_compressed_header_sizes() {
        // Control 0xE1: dict reset, high size bit set.
        let header = ChunkHeader::parse(&[0xE1, 0x00, 0x00, 0x12, 0x33, 0x5D]).unwrap();
        match header {
            ChunkHeader::Compressed {
                uncompressed_size,
                compressed_size,
                props,
                reset,
            } => {
                assert_eq!(uncompressed_size, (1 << 16) + 1);
                assert_eq!(compressed_size, 0x1234);
                assert!(props.is_some());
                assert_eq!(reset, ChunkReset::Dict);
            }
            other => panic!("unexpected header {other:?}"),
        }
    }

    #[test]
    fn test_parse_reset_levels() {
        let parse = |control: u8| {
            let mut bytes = vec![control, 0, 0, 0, 0];
            if control >= 0xC0 {
                bytes.push(0x5D);
            }
            match ChunkHeader::parse(&bytes).unwrap() {
                ChunkHeader::Compressed { reset, .. } => reset,
                other => panic!("unexpected header {other:?}"),
            }
        };
        assert_eq!(parse(0x80), ChunkReset::None);
        assert_eq!(parse(0xA0), ChunkReset::State);
        assert_eq!(parse(0xC0), ChunkReset::StateAndProps);
        assert_eq!(parse(0xE0), ChunkReset::Dict);
    }

    #[test]
    fn test_uncompressed_chunks_round_trip() {
        let mut decoder = Lzma2Decoder::new(1 << 16);
        let mut out = Vec::new();

        let first = ChunkHeader::parse(&[0x01, 0x00, 0x04]).unwrap();
        decoder.decode_chunk(&first, b"hello", &mut out).unwrap();

        let second = ChunkHeader::parse(&[0x02, 0x00, 0x05]).unwrap();
        decoder.decode_chunk(&second, b" world", &mut out).unwrap();

        assert_eq!(out, b"hello world");
    }

    #[test]
    fn test_first_chunk_must_reset_dict() {
        let mut decoder = Lzma2Decoder::new(1 << 16);
        let mut out = Vec::new();
        let header = ChunkHeader::parse(&[0x02, 0x00, 0x04]).unwrap();
        let err = decoder.decode_chunk(&header, b"hello", &mut out).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::Data);
    }

    #[test]
    fn test_begin_block_requires_fresh_dict_reset() {
        let mut decoder = Lzma2Decoder::new(1 << 16);
        let mut out = Vec::new();
        let reset = ChunkHeader::parse(&[0x01, 0x00, 0x00]).unwrap();
        decoder.decode_chunk(&reset, b"x", &mut out).unwrap();

        decoder.begin_block();
        let follow = ChunkHeader::parse(&[0x02, 0x00, 0x00]).unwrap();
        assert!(decoder.decode_chunk(&follow, b"y", &mut out).is_err());
    }

    #[test]
    fn test_compressed_chunk_needs_props_first() {
        let mut decoder = Lzma2Decoder::new(1 << 16);
        let mut out = Vec::new();
        // Dict reset via an uncompressed chunk, then a compressed chunk
        // without a properties byte: still invalid.
        let reset = ChunkHeader::parse(&[0x01, 0x00, 0x00]).unwrap();
        decoder.decode_chunk(&reset, b"x", &mut out).unwrap();

        let header = ChunkHeader::parse(&[0x80, 0x00, 0x00, 0x00, 0x08]).unwrap();
        let payload = [0u8; 9];
        let err = decoder.decode_chunk(&header, &payload, &mut out).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::Data);
    }

    #[test]
    fn test_decode_real_compressed_chunk() {
        // One chunk produced by xz for the input "abcabcabcabc".
        let header = ChunkHeader::parse(&[0xE0, 0x00, 0x0B, 0x00, 0x08, 0x5D]).unwrap();
        let payload = [0x00, 0x30, 0x98, 0x88, 0xA7, 0xEA, 0x25, 0x00, 0x00];

        let mut decoder = Lzma2Decoder::new(1 << 16);
        let mut out = Vec::new();
        decoder.decode_chunk(&header, &payload, &mut out).unwrap();
        assert_eq!(out, b"abcabcabcabc");
    }

    #[test]
    fn test_corrupt_payload_is_data_error() {
        let header = ChunkHeader::parse(&[0xE0, 0x00, 0x0B, 0x00, 0x08, 0x5D]).unwrap();
        // Same chunk as above with a flipped payload byte.
        let payload = [0x00, 0x30, 0x98, 0x88, 0xA7, 0xEA, 0x25, 0x00, 0x01];

        let mut decoder = Lzma2Decoder::new(1 << 16);
        let mut out = Vec::new();
        assert!(decoder.decode_chunk(&header, &payload, &mut out).is_err());
    }
}
