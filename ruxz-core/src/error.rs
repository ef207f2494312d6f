//! Error types for xz decoding.
//!
//! Decode failures are grouped into a few well-defined kinds so that callers
//! can tell corrupt input apart from unsupported-but-valid input and from
//! resource-limit rejections. None of these errors are retryable: once a
//! session reports one, the input position is indeterminate and the only
//! valid recovery is a reset with fresh input.

use std::io;
use thiserror::Error;

/// The main error type for xz decoding operations.
#[derive(Debug, Error)]
pub enum XzError {
    /// I/O error from the underlying byte source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic bytes in the stream header or footer.
    #[error("invalid magic bytes: expected {expected:02x?}, found {found:02x?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: Vec<u8>,
        /// Actual bytes found.
        found: Vec<u8>,
    },

    /// Structurally invalid container data.
    #[error("format error: {message}")]
    Format {
        /// Description of the violation.
        message: String,
    },

    /// A declared option is valid to declare but not acceptable here,
    /// for example reserved header bits, an unknown filter id, or
    /// out-of-range LZMA properties.
    #[error("unsupported or invalid option: {message}")]
    Options {
        /// Description of the offending option.
        message: String,
    },

    /// Checksum mismatch (CRC-32, CRC-64 or SHA-256, widened to u64;
    /// SHA-256 mismatches report truncated leading bytes).
    #[error("checksum mismatch: expected {expected:#x}, computed {computed:#x}")]
    ChecksumMismatch {
        /// Expected value stored in the stream.
        expected: u64,
        /// Value computed from the data.
        computed: u64,
    },

    /// Corrupt compressed payload: malformed range-coded data, size
    /// mismatches, truncation, or bad chunk framing.
    #[error("corrupt data: {message}")]
    Data {
        /// Description of the corruption.
        message: String,
    },

    /// A back-reference pointed before the start of the decoded history.
    #[error("invalid back-reference distance {distance} (history size {history})")]
    InvalidDistance {
        /// The offending distance (0-based: 0 is the most recent byte).
        distance: usize,
        /// Number of bytes available in the history window.
        history: usize,
    },

    /// The declared dictionary size exceeds the configured memory limit.
    #[error("memory limit exceeded: dictionary needs {needed} bytes, limit is {limit}")]
    MemLimit {
        /// Bytes the input asked for.
        needed: u64,
        /// Configured upper bound.
        limit: u64,
    },

    /// No forward progress is possible: the caller supplied no room for
    /// output (or no input) while decoding work is still outstanding.
    #[error("no forward progress possible")]
    NoProgress,

    /// The stream declares a recognized check algorithm this build does not
    /// verify. Only raised in strict mode; the lenient default decodes the
    /// data and skips verification.
    #[error("unsupported check algorithm (id {id:#04x})")]
    UnsupportedCheck {
        /// The xz check id (0x00..=0x0f).
        id: u8,
    },
}

/// Coarse classification of an [`XzError`], mirroring the error kinds of
/// the xz reference library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O failure in the byte source.
    Io,
    /// Bad magic or container structure.
    Format,
    /// Unsupported or invalid declared option.
    Options,
    /// Corrupt data (checksums, distances, framing, sizes).
    Data,
    /// Configured memory limit exceeded.
    MemLimit,
    /// No forward progress possible.
    Buf,
    /// Recognized but unverifiable check algorithm.
    UnsupportedCheck,
}

/// Result type alias for xz decoding operations.
pub type Result<T> = std::result::Result<T, XzError>;

impl XzError {
    /// Create a format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Create an options error.
    pub fn options(message: impl Into<String>) -> Self {
        Self::Options {
            message: message.into(),
        }
    }

    /// Create a data error.
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(expected: u64, computed: u64) -> Self {
        Self::ChecksumMismatch { expected, computed }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history: usize) -> Self {
        Self::InvalidDistance { distance, history }
    }

    /// Create a memory limit error.
    pub fn mem_limit(needed: u64, limit: u64) -> Self {
        Self::MemLimit { needed, limit }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidMagic { .. } | Self::Format { .. } => ErrorKind::Format,
            Self::Options { .. } => ErrorKind::Options,
            Self::ChecksumMismatch { .. } | Self::Data { .. } | Self::InvalidDistance { .. } => {
                ErrorKind::Data
            }
            Self::MemLimit { .. } => ErrorKind::MemLimit,
            Self::NoProgress => ErrorKind::Buf,
            Self::UnsupportedCheck { .. } => ErrorKind::UnsupportedCheck,
        }
    }

    /// Duplicate this error so a terminal session can re-report it on every
    /// subsequent call. `io::Error` is not `Clone`, so the I/O variant is
    /// rebuilt from its kind and message.
    pub fn duplicate(&self) -> Self {
        match self {
            Self::Io(e) => Self::Io(io::Error::new(e.kind(), e.to_string())),
            Self::InvalidMagic { expected, found } => Self::InvalidMagic {
                expected: expected.clone(),
                found: found.clone(),
            },
            Self::Format { message } => Self::Format {
                message: message.clone(),
            },
            Self::Options { message } => Self::Options {
                message: message.clone(),
            },
            Self::ChecksumMismatch { expected, computed } => Self::ChecksumMismatch {
                expected: *expected,
                computed: *computed,
            },
            Self::Data { message } => Self::Data {
                message: message.clone(),
            },
            Self::InvalidDistance { distance, history } => Self::InvalidDistance {
                distance: *distance,
                history: *history,
            },
            Self::MemLimit { needed, limit } => Self::MemLimit {
                needed: *needed,
                limit: *limit,
            },
            Self::NoProgress => Self::NoProgress,
            Self::UnsupportedCheck { id } => Self::UnsupportedCheck { id: *id },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = XzError::InvalidMagic {
            expected: vec![0xfd, 0x37],
            found: vec![0x1f, 0x8b],
        };
        assert!(err.to_string().contains("invalid magic"));

        let err = XzError::checksum_mismatch(0x12345678, 0xdeadbeef);
        assert!(err.to_string().contains("checksum mismatch"));

        let err = XzError::mem_limit(1 << 30, 1 << 26);
        assert!(err.to_string().contains("memory limit"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(XzError::format("x").kind(), ErrorKind::Format);
        assert_eq!(XzError::options("x").kind(), ErrorKind::Options);
        assert_eq!(XzError::data("x").kind(), ErrorKind::Data);
        assert_eq!(XzError::invalid_distance(9, 1).kind(), ErrorKind::Data);
        assert_eq!(XzError::NoProgress.kind(), ErrorKind::Buf);
        assert_eq!(
            XzError::UnsupportedCheck { id: 0x02 }.kind(),
            ErrorKind::UnsupportedCheck
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let err: XzError = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_duplicate_preserves_kind() {
        let errs = [
            XzError::format("a"),
            XzError::data("b"),
            XzError::NoProgress,
            XzError::Io(io::Error::other("boom")),
        ];
        for err in &errs {
            assert_eq!(err.duplicate().kind(), err.kind());
            assert_eq!(err.duplicate().to_string(), err.to_string());
        }
    }
}
