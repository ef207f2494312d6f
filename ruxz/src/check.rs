//! Per-block integrity check computation.
//!
//! Each block's decompressed bytes feed one of the check engines declared in
//! the stream flags. Check ids the format reserves but this decoder cannot
//! compute are represented too, so their trailer bytes can still be skipped.

use sha2::{Digest, Sha256};

use ruxz_core::crc::{Crc32, Crc64};
use ruxz_core::error::{Result, XzError};

use crate::header::CheckType;

/// A running check over one block's uncompressed data.
pub enum BlockCheck {
    /// Check id 0x00: nothing to compute or verify.
    None,
    /// CRC32, little-endian 4-byte trailer.
    Crc32(Crc32),
    /// CRC64, little-endian 8-byte trailer.
    Crc64(Crc64),
    /// SHA-256, 32-byte trailer.
    Sha256(Box<Sha256>),
    /// An id this decoder cannot compute; the trailer is skipped.
    Skip(usize),
}

impl std::fmt::Debug for BlockCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "BlockCheck::None"),
            Self::Crc32(_) => write!(f, "BlockCheck::Crc32"),
            Self::Crc64(_) => write!(f, "BlockCheck::Crc64"),
            Self::Sha256(_) => write!(f, "BlockCheck::Sha256"),
            Self::Skip(size) => write!(f, "BlockCheck::Skip({size})"),
        }
    }
}

impl BlockCheck {
    /// Start a check of the given type.
    pub fn new(check: CheckType) -> Self {
        match check {
            CheckType::None => Self::None,
            CheckType::Crc32 => Self::Crc32(Crc32::new()),
            CheckType::Crc64 => Self::Crc64(Crc64::new()),
            CheckType::Sha256 => Self::Sha256(Box::new(Sha256::new())),
            CheckType::Unsupported(id) => Self::Skip(CheckType::Unsupported(id).size()),
        }
    }

    /// Size of the trailer field this check occupies after the block data.
    pub fn size(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Crc32(_) => 4,
            Self::Crc64(_) => 8,
            Self::Sha256(_) => 32,
            Self::Skip(size) => *size,
        }
    }

    /// True when the trailer bytes cannot be verified, only skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skip(_))
    }

    /// Feed decompressed block bytes.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::None | Self::Skip(_) => {}
            Self::Crc32(crc) => crc.update(data),
            Self::Crc64(crc) => crc.update(data),
            Self::Sha256(hash) => hash.update(data),
        }
    }

    /// Compare the computed check against the stored trailer.
    ///
    /// `stored` must be exactly [`Self::size`] bytes. The engine is consumed;
    /// a new one is created per block.
    pub fn verify(self, stored: &[u8]) -> Result<()> {
        debug_assert_eq!(stored.len(), self.size());
        match self {
            Self::None | Self::Skip(_) => Ok(()),
            Self::Crc32(crc) => {
                let expected = u32::from_le_bytes([stored[0], stored[1], stored[2], stored[3]]);
                let computed = crc.value();
                if expected != computed {
                    return Err(XzError::checksum_mismatch(
                        u64::from(expected),
                        u64::from(computed),
                    ));
                }
                Ok(())
            }
            Self::Crc64(crc) => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(stored);
                let expected = u64::from_le_bytes(bytes);
                let computed = crc.value();
                if expected != computed {
                    return Err(XzError::checksum_mismatch(expected, computed));
                }
                Ok(())
            }
            Self::Sha256(hash) => {
                let computed = hash.finalize();
                if computed.as_slice() != stored {
                    // Report the leading bytes so the mismatch is inspectable.
                    let head = |b: &[u8]| {
                        u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
                    };
                    return Err(XzError::checksum_mismatch(head(stored), head(&computed)));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_accepts_empty_trailer() {
        let check = BlockCheck::new(CheckType::None);
        assert_eq!(check.size(), 0);
        check.verify(&[]).unwrap();
    }

    #[test]
    fn test_crc32_known_answer() {
        let mut check = BlockCheck::new(CheckType::Crc32);
        check.update(b"123456789");
        check.verify(&0xCBF43926u32.to_le_bytes()).unwrap();
    }

    #[test]
    fn test_crc32_mismatch() {
        let mut check = BlockCheck::new(CheckType::Crc32);
        check.update(b"123456789");
        let err = check.verify(&[0, 0, 0, 0]).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::Data);
    }

    #[test]
    fn test_crc64_known_answer() {
        let mut check = BlockCheck::new(CheckType::Crc64);
        check.update(b"123456789");
        check.verify(&0x995DC9BBDF1939FAu64.to_le_bytes()).unwrap();
    }

    #[test]
    fn test_sha256_known_answer() {
        // SHA-256 of the empty string.
        let digest: [u8; 32] = [
            0xE3, 0xB0, 0xC4, 0x42, 0x98, 0xFC, 0x1C, 0x14, 0x9A, 0xFB, 0xF4, 0xC8, 0x99, 0x6F,
            0xB9, 0x24, 0x27, 0xAE, 0x41, 0xE4, 0x64, 0x9B, 0x93, 0x4C, 0xA4, 0x95, 0x99, 0x1B,
            0x78, 0x52, 0xB8, 0x55,
        ];
        let check = BlockCheck::new(CheckType::Sha256);
        check.verify(&digest).unwrap();
    }

    #[test]
    fn test_sha256_incremental() {
        let mut whole = BlockCheck::new(CheckType::Sha256);
        whole.update(b"hello world");

        let mut split = BlockCheck::new(CheckType::Sha256);
        split.update(b"hello ");
        split.update(b"world");

        let digest = match whole {
            BlockCheck::Sha256(hash) => hash.finalize(),
            _ => unreachable!(),
        };
        split.verify(&digest).unwrap();
    }

    #[test]
    fn test_skipped_check_accepts_anything() {
        let mut check = BlockCheck::new(CheckType::Unsupported(0x02));
        assert_eq!(check.size(), 4);
        assert!(check.is_skipped());
        check.update(b"data");
        check.verify(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
    }
}
