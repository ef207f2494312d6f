//! # ruxz
//!
//! Streaming xz decompressor in pure Rust.
//!
//! The crate decodes the xz container: stream headers and footers, blocks
//! of LZMA2-compressed data, the index, and per-block integrity checks
//! (CRC32, CRC64, SHA-256). Multi-block files and concatenated streams are
//! supported, and decoding is fully incremental in both directions: input
//! can arrive in arbitrary slices and output can be drained into buffers of
//! any size, with identical results.
//!
//! ## Reading from any `io::Read`
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::Read;
//! use ruxz::XzReader;
//!
//! let file = File::open("data.xz")?;
//! let mut reader = XzReader::new(file);
//! let mut contents = Vec::new();
//! reader.read_to_end(&mut contents)?;
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! ## One-shot decompression
//!
//! ```
//! let compressed: &[u8] = &[
//!     0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00, 0x01, 0x69, 0x22, 0xDE, 0x36, 0x04, 0xC0,
//!     0x10, 0x0C, 0x21, 0x01, 0x16, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x7B, 0xB0, 0x54, 0x28, 0xE0, 0x00, 0x0B, 0x00, 0x08, 0x5D, 0x00, 0x30, 0x98, 0x88,
//!     0xA7, 0xEA, 0x25, 0x00, 0x00, 0x00, 0x34, 0x2A, 0x6E, 0x5A, 0x00, 0x01, 0x28, 0x0C,
//!     0xAA, 0x57, 0x6D, 0x74, 0x90, 0x42, 0x99, 0x0D, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01,
//!     0x59, 0x5A,
//! ];
//! assert_eq!(ruxz::decompress(compressed)?, b"abcabcabcabc");
//! # Ok::<(), ruxz::XzError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod check;
pub mod header;
pub mod reader;
pub mod stream;
pub mod vli;

pub use header::CheckType;
pub use reader::{Status, XzReader};
pub use stream::XzStream;

pub use ruxz_core::error::{ErrorKind, Result, XzError};
pub use ruxz_core::traits::{Action, DecodeStatus, Decompressor};

/// Default dictionary memory limit (64 MiB), enough for every standard xz
/// preset.
pub const DEFAULT_DICT_SIZE_LIMIT: u64 = 64 << 20;

/// Decoder configuration.
#[derive(Debug, Clone)]
pub struct XzOptions {
    /// Reject blocks whose declared dictionary exceeds this many bytes.
    pub dict_size_limit: u64,
    /// Fail on check algorithms this build cannot verify, instead of
    /// decoding the data and skipping verification.
    pub strict_checks: bool,
    /// Decode a sequence of padded, concatenated streams rather than
    /// stopping at the first stream footer.
    pub concatenated: bool,
}

impl Default for XzOptions {
    fn default() -> Self {
        Self {
            dict_size_limit: DEFAULT_DICT_SIZE_LIMIT,
            strict_checks: false,
            concatenated: true,
        }
    }
}

impl XzOptions {
    /// Set the dictionary memory limit in bytes.
    pub fn dict_size_limit(mut self, limit: u64) -> Self {
        self.dict_size_limit = limit;
        self
    }

    /// Set whether unverifiable check algorithms are fatal.
    pub fn strict_checks(mut self, strict: bool) -> Self {
        self.strict_checks = strict;
        self
    }

    /// Set whether concatenated streams are decoded.
    pub fn concatenated(mut self, concatenated: bool) -> Self {
        self.concatenated = concatenated;
        self
    }
}

/// Decompress a complete in-memory xz file with default options.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    decompress_with_options(input, &XzOptions::default())
}

/// Decompress a complete in-memory xz file.
pub fn decompress_with_options(input: &[u8], options: &XzOptions) -> Result<Vec<u8>> {
    XzStream::new(options).process_all(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = XzOptions::default();
        assert_eq!(options.dict_size_limit, 64 << 20);
        assert!(!options.strict_checks);
        assert!(options.concatenated);
    }

    #[test]
    fn test_builder_chains() {
        let options = XzOptions::default()
            .dict_size_limit(1 << 20)
            .strict_checks(true)
            .concatenated(false);
        assert_eq!(options.dict_size_limit, 1 << 20);
        assert!(options.strict_checks);
        assert!(!options.concatenated);
    }
}
