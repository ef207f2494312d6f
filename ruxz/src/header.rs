//! xz container headers: stream header/footer, stream flags, block headers.
//!
//! Every structure here is fixed-size or self-sizing, so parsing works on
//! complete byte slices; the streaming layer gathers the right number of
//! bytes first.

use ruxz_core::crc::Crc32;
use ruxz_core::error::{Result, XzError};

use crate::vli;

/// The six magic bytes opening every xz stream.
pub const STREAM_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];

/// The two magic bytes closing every xz stream.
pub const FOOTER_MAGIC: [u8; 2] = [0x59, 0x5A];

/// Encoded size of the stream header (magic + flags + CRC32).
pub const STREAM_HEADER_SIZE: usize = 12;

/// Encoded size of the stream footer.
pub const STREAM_FOOTER_SIZE: usize = 12;

/// The only filter this decoder understands.
pub const FILTER_LZMA2: u64 = 0x21;

/// Integrity check declared in the stream flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckType {
    /// No check; the trailer is empty.
    None,
    /// 4-byte CRC32.
    Crc32,
    /// 8-byte CRC64 (the xz default).
    Crc64,
    /// 32-byte SHA-256.
    Sha256,
    /// A check id the format reserves but this decoder cannot compute.
    /// The trailer size is still known, so the stream can be decoded with
    /// the check skipped.
    Unsupported(u8),
}

impl CheckType {
    /// Map a check id from the stream flags.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0x00 => Ok(Self::None),
            0x01 => Ok(Self::Crc32),
            0x04 => Ok(Self::Crc64),
            0x0A => Ok(Self::Sha256),
            0x02..=0x0F => Ok(Self::Unsupported(id)),
            _ => Err(XzError::UnsupportedCheck { id }),
        }
    }

    /// The check id as stored in the stream flags.
    pub fn id(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Crc32 => 0x01,
            Self::Crc64 => 0x04,
            Self::Sha256 => 0x0A,
            Self::Unsupported(id) => id,
        }
    }

    /// Size of the check field following each block's data.
    ///
    /// The table is defined for all sixteen ids, so even unsupported checks
    /// can be skipped over.
    pub fn size(self) -> usize {
        match self.id() {
            0 => 0,
            id => 4 << ((id - 1) / 3),
        }
    }
}

/// The stream flags field, stored in both the header and the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFlags {
    /// Declared integrity check.
    pub check: CheckType,
}

impl StreamFlags {
    /// Parse the two flag bytes.
    pub fn parse(bytes: [u8; 2]) -> Result<Self> {
        if bytes[0] != 0x00 || bytes[1] & 0xF0 != 0 {
            return Err(XzError::options(format!(
                "reserved stream flag bits set: {:02x} {:02x}",
                bytes[0], bytes[1]
            )));
        }
        Ok(Self {
            check: CheckType::from_id(bytes[1] & 0x0F)?,
        })
    }

    fn to_bytes(self) -> [u8; 2] {
        [0x00, self.check.id()]
    }
}

/// Parse and validate a 12-byte stream header.
pub fn parse_stream_header(bytes: &[u8; STREAM_HEADER_SIZE]) -> Result<StreamFlags> {
    if bytes[..6] != STREAM_MAGIC {
        return Err(XzError::InvalidMagic {
            expected: STREAM_MAGIC.to_vec(),
            found: bytes[..6].to_vec(),
        });
    }

    let stored_crc = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let computed = Crc32::compute(&bytes[6..8]);
    if stored_crc != computed {
        return Err(XzError::format("stream header CRC32 mismatch"));
    }

    StreamFlags::parse([bytes[6], bytes[7]])
}

/// The decoded stream footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFooter {
    /// Stream flags; must match the header's.
    pub flags: StreamFlags,
    /// Real size of the index field in bytes.
    pub backward_size: u64,
}

/// Parse and validate a 12-byte stream footer.
pub fn parse_stream_footer(bytes: &[u8; STREAM_FOOTER_SIZE]) -> Result<StreamFooter> {
    if bytes[10..12] != FOOTER_MAGIC {
        return Err(XzError::format("bad stream footer magic"));
    }

    let stored_crc = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let computed = Crc32::compute(&bytes[4..10]);
    if stored_crc != computed {
        return Err(XzError::format("stream footer CRC32 mismatch"));
    }

    let flags = StreamFlags::parse([bytes[8], bytes[9]])?;
    let stored = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let backward_size = (u64::from(stored) + 1) * 4;

    Ok(StreamFooter {
        flags,
        backward_size,
    })
}

/// Verify that header and footer agree on the stream flags.
pub fn check_flags_match(header: StreamFlags, footer: StreamFlags) -> Result<()> {
    if header != footer {
        return Err(XzError::format(format!(
            "stream footer flags {:02x?} do not match header flags {:02x?}",
            footer.to_bytes(),
            header.to_bytes()
        )));
    }
    Ok(())
}

/// A parsed block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Total encoded header size, including the size byte and CRC32.
    pub header_size: usize,
    /// Compressed size declared in the header, if present.
    pub compressed_size: Option<u64>,
    /// Uncompressed size declared in the header, if present.
    pub uncompressed_size: Option<u64>,
    /// Dictionary size from the LZMA2 filter properties.
    pub dict_size: u64,
}

impl BlockHeader {
    /// Encoded header size implied by the leading size byte.
    ///
    /// The size byte is never zero here; 0x00 in that position marks the
    /// index instead of a block.
    pub fn encoded_len(size_byte: u8) -> usize {
        (size_byte as usize + 1) * 4
    }

    /// Parse a complete block header, `bytes[0]` being the size byte.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let header_size = Self::encoded_len(bytes[0]);
        debug_assert_eq!(bytes.len(), header_size);

        let stored_crc = u32::from_le_bytes([
            bytes[header_size - 4],
            bytes[header_size - 3],
            bytes[header_size - 2],
            bytes[header_size - 1],
        ]);
        let computed = Crc32::compute(&bytes[..header_size - 4]);
        if stored_crc != computed {
            return Err(XzError::format("block header CRC32 mismatch"));
        }

        let flags = bytes[1];
        if flags & 0x3C != 0 {
            return Err(XzError::options(format!(
                "reserved block header flag bits set: 0x{flags:02x}"
            )));
        }
        let num_filters = (flags & 0x03) + 1;
        if num_filters != 1 {
            return Err(XzError::options(format!(
                "unsupported filter chain of {num_filters} filters"
            )));
        }

        let mut pos = 2;
        let body = &bytes[..header_size - 4];

        let compressed_size = if flags & 0x40 != 0 {
            let (value, used) = vli::decode(&body[pos..])?;
            pos += used;
            if value == 0 {
                return Err(XzError::data("declared compressed size is zero"));
            }
            Some(value)
        } else {
            None
        };
        let uncompressed_size = if flags & 0x80 != 0 {
            let (value, used) = vli::decode(&body[pos..])?;
            pos += used;
            Some(value)
        } else {
            None
        };

        let (filter_id, used) = vli::decode(&body[pos..])?;
        pos += used;
        if filter_id != FILTER_LZMA2 {
            return Err(XzError::options(format!(
                "unsupported filter id 0x{filter_id:02x}"
            )));
        }
        let (props_size, used) = vli::decode(&body[pos..])?;
        pos += used;
        if props_size != 1 {
            return Err(XzError::options(format!(
                "LZMA2 filter properties must be one byte, got {props_size}"
            )));
        }
        if pos >= body.len() {
            return Err(XzError::data("block header too small for filter properties"));
        }
        let dict_size = ruxz_lzma::dict_size_from_props(body[pos])?;
        pos += 1;

        // Everything up to the CRC is zero padding.
        if body[pos..].iter().any(|&b| b != 0) {
            return Err(XzError::data("nonzero padding in block header"));
        }

        Ok(Self {
            header_size,
            compressed_size,
            uncompressed_size,
            dict_size,
        })
    }
}
