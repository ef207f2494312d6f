//! Pull-based decompression driver.
//!
//! [`XzReader`] wraps any `std::io::Read` source of compressed bytes and
//! drives an [`XzStream`] from it, exposing the decompressed bytes both
//! through [`XzReader::fill_output`] (with an explicit end-of-stream
//! status) and through `std::io::Read`.

use std::io::{self, Read};

use ruxz_core::error::{Result, XzError};
use ruxz_core::traits::{Action, DecodeStatus, Decompressor};

use crate::stream::XzStream;
use crate::XzOptions;

/// Size of the internal compressed-input buffer.
const INPUT_BUF_SIZE: usize = 32 * 1024;

/// Outcome of a [`XzReader::fill_output`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// More decompressed data may follow.
    Ok,
    /// The stream ended cleanly; all checks verified.
    EndOfStream,
}

/// Streaming decompressor reading compressed bytes from an inner source.
#[derive(Debug)]
pub struct XzReader<R> {
    source: R,
    stream: XzStream,
    buf: Box<[u8]>,
    buf_pos: usize,
    buf_len: usize,
    eof: bool,
    /// Terminal error, re-reported on every later call.
    error: Option<XzError>,
}

impl<R: Read> XzReader<R> {
    /// Wrap `source` with default options.
    pub fn new(source: R) -> Self {
        Self::with_options(source, &XzOptions::default())
    }

    /// Wrap `source` with explicit options.
    pub fn with_options(source: R, options: &XzOptions) -> Self {
        Self {
            source,
            stream: XzStream::new(options),
            buf: vec![0u8; INPUT_BUF_SIZE].into_boxed_slice(),
            buf_pos: 0,
            buf_len: 0,
            eof: false,
            error: None,
        }
    }

    /// Decompress into `output`, reading from the source as needed.
    ///
    /// Returns the number of bytes written and whether the stream has
    /// ended. A full `output` slice with [`Status::Ok`] means more data is
    /// (or may be) available; call again. An empty `output` slice while
    /// decoding work remains fails with [`XzError::NoProgress`].
    pub fn fill_output(&mut self, output: &mut [u8]) -> Result<(usize, Status)> {
        if let Some(err) = &self.error {
            return Err(err.duplicate());
        }
        match self.fill_inner(output) {
            Ok(result) => Ok(result),
            Err(err) => {
                self.error = Some(err.duplicate());
                Err(err)
            }
        }
    }

    fn fill_inner(&mut self, output: &mut [u8]) -> Result<(usize, Status)> {
        let mut produced = 0;

        loop {
            if self.stream.is_finished() {
                return Ok((produced, Status::EndOfStream));
            }
            if output.is_empty() {
                return Err(XzError::NoProgress);
            }
            if produced == output.len() {
                return Ok((produced, Status::Ok));
            }

            if self.buf_pos == self.buf_len && !self.eof {
                match self.source.read(&mut self.buf) {
                    Ok(0) => self.eof = true,
                    Ok(n) => {
                        self.buf_pos = 0;
                        self.buf_len = n;
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(XzError::Io(e)),
                }
            }

            let action = if self.eof { Action::Finish } else { Action::Run };
            let (consumed, n, status) = self.stream.process(
                &self.buf[self.buf_pos..self.buf_len],
                &mut output[produced..],
                action,
            )?;
            self.buf_pos += consumed;
            produced += n;

            if status == DecodeStatus::Finished {
                return Ok((produced, Status::EndOfStream));
            }
        }
    }

    /// Total compressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.stream.total_in()
    }

    /// Total decompressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.stream.total_out()
    }

    /// The check id of a recognized check this build could not verify, if
    /// one was seen while decoding.
    pub fn unsupported_check(&self) -> Option<u8> {
        self.stream.unsupported_check()
    }

    /// Check type declared by the most recent stream header, once one has
    /// been parsed.
    pub fn check_type(&self) -> Option<crate::header::CheckType> {
        self.stream.check_type()
    }

    /// Replace the source and prepare for a fresh stream, keeping the
    /// internal buffers and the dictionary allocation.
    pub fn reset(&mut self, source: R) {
        self.source = source;
        self.stream.reset();
        self.buf_pos = 0;
        self.buf_len = 0;
        self.eof = false;
        self.error = None;
    }

    /// Borrow the inner source.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Mutably borrow the inner source.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// Unwrap, returning the inner source.
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: Read> Read for XzReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.fill_output(buf) {
            Ok((n, _)) => Ok(n),
            Err(XzError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `xz --check=crc32` output for the input "abcabcabcabc".
    const ABC_XZ: &[u8] = &[
        0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00, 0x01, 0x69, 0x22, 0xDE, 0x36, 0x04, 0xC0, 0x10,
        0x0C, 0x21, 0x01, 0x16, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x7B, 0xB0,
        0x54, 0x28, 0xE0, 0x00, 0x0B, 0x00, 0x08, 0x5D, 0x00, 0x30, 0x98, 0x88, 0xA7, 0xEA, 0x25,
        0x00, 0x00, 0x00, 0x34, 0x2A, 0x6E, 0x5A, 0x00, 0x01, 0x28, 0x0C, 0xAA, 0x57, 0x6D, 0x74,
        0x90, 0x42, 0x99, 0x0D, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x59, 0x5A,
    ];

    /// A reader that returns its data one byte per read call.
    struct TrickleReader<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl Read for TrickleReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos == self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn test_read_to_end() {
        let mut reader = XzReader::new(ABC_XZ);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcabcabcabc");
        assert_eq!(reader.total_in(), ABC_XZ.len() as u64);
        assert_eq!(reader.total_out(), 12);
    }

    #[test]
    fn test_fill_output_reports_end_of_stream() {
        let mut reader = XzReader::new(ABC_XZ);
        let mut buf = [0u8; 64];
        let (n, status) = reader.fill_output(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"abcabcabcabc");
        assert_eq!(status, Status::EndOfStream);

        // Idempotent once finished.
        let (n, status) = reader.fill_output(&mut buf).unwrap();
        assert_eq!(n, 0);
        assert_eq!(status, Status::EndOfStream);
    }

    #[test]
    fn test_trickling_source() {
        let source = TrickleReader {
            data: ABC_XZ,
            pos: 0,
        };
        let mut reader = XzReader::new(source);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcabcabcabc");
    }

    #[test]
    fn test_one_byte_output_buffers() {
        let mut reader = XzReader::new(ABC_XZ);
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let (n, status) = reader.fill_output(&mut byte).unwrap();
            out.extend_from_slice(&byte[..n]);
            if status == Status::EndOfStream {
                break;
            }
        }
        assert_eq!(out, b"abcabcabcabc");
    }

    #[test]
    fn test_empty_output_with_work_is_no_progress() {
        let mut reader = XzReader::new(ABC_XZ);
        let err = reader.fill_output(&mut []).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::Buf);
    }

    #[test]
    fn test_empty_read_buffer_is_ok_zero() {
        let mut reader = XzReader::new(ABC_XZ);
        assert_eq!(reader.read(&mut []).unwrap(), 0);
    }

    #[test]
    fn test_truncated_source_fails() {
        let mut reader = XzReader::new(&ABC_XZ[..40]);
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_errors_are_sticky() {
        let mut corrupt = ABC_XZ.to_vec();
        corrupt[40] ^= 0xFF;
        let mut reader = XzReader::new(&corrupt[..]);
        let mut buf = [0u8; 64];
        assert!(reader.fill_output(&mut buf).is_err());
        assert!(reader.fill_output(&mut buf).is_err());
    }

    #[test]
    fn test_reset_reuses_reader() {
        let mut reader = XzReader::new(&ABC_XZ[..30]);
        let mut out = Vec::new();
        assert!(reader.read_to_end(&mut out).is_err());

        reader.reset(ABC_XZ);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcabcabcabc");
    }

    #[test]
    fn test_source_io_error_propagates() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk on fire"))
            }
        }

        let mut reader = XzReader::new(FailingReader);
        let mut buf = [0u8; 16];
        let err = reader.fill_output(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::Io);
    }
}
