//! # ruxz LZMA2
//!
//! LZMA2 chunk decoder for the ruxz streaming xz decompressor.
//!
//! This crate implements the codec layer: the range decoder, the adaptive
//! probability model, and the chunk-oriented LZMA2 framing that xz blocks
//! carry. It knows nothing about the xz container; the `ruxz` crate parses
//! stream headers, blocks, and the index, and feeds complete chunks into
//! [`Lzma2Decoder`].
//!
//! ## Example
//!
//! ```
//! use ruxz_lzma::{ChunkHeader, Lzma2Decoder};
//!
//! // A chunk produced by xz for the input "abcabcabcabc".
//! let header = ChunkHeader::parse(&[0xE0, 0x00, 0x0B, 0x00, 0x08, 0x5D])?;
//! let payload = [0x00, 0x30, 0x98, 0x88, 0xA7, 0xEA, 0x25, 0x00, 0x00];
//!
//! let mut decoder = Lzma2Decoder::new(1 << 16);
//! let mut out = Vec::new();
//! decoder.decode_chunk(&header, &payload, &mut out)?;
//! assert_eq!(out, b"abcabcabcabc");
//! # Ok::<(), ruxz_core::XzError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lzma2;
pub mod model;
pub mod range;

pub use lzma2::{ChunkHeader, ChunkReset, Lzma2Decoder};
pub use model::LzmaProps;
pub use range::RangeDecoder;

use ruxz_core::error::{Result, XzError};

/// Decode the dictionary size from the LZMA2 filter properties byte.
///
/// Sizes follow `(2 | (b & 1)) << (b / 2 + 11)`, giving 4 KiB, 6 KiB, 8 KiB,
/// 12 KiB, ... up to value 39; value 40 means 4 GiB - 1. Note that half the
/// sizes are three times a power of two.
pub fn dict_size_from_props(props: u8) -> Result<u64> {
    if props > 40 {
        return Err(XzError::options(format!(
            "invalid LZMA2 dictionary size properties 0x{props:02x}"
        )));
    }
    if props == 40 {
        return Ok(u32::MAX as u64);
    }
    Ok((2 | (props as u64 & 1)) << (props / 2 + 11))
}
