//! LZ77 sliding window (dictionary) for LZMA2 decompression.
//!
//! The window keeps the most recent `capacity` bytes of decompressed output
//! so back-references can be resolved. Unlike DEFLATE-family windows the
//! capacity is not necessarily a power of two (LZMA2 dictionary sizes follow
//! the `(2 | (bit)) << n` pattern and can be three times a power of two), so
//! wrapping is done with compares instead of a bit mask.
//!
//! Distances are 0-based throughout: distance 0 is the most recently written
//! byte. This matches the rep-distance convention of the LZMA scheme, where
//! the stored value is `real_distance - 1`.

use crate::error::{Result, XzError};

/// Smallest dictionary the format permits; declared sizes below this are
/// rounded up, matching the reference implementation.
pub const DICT_SIZE_MIN: usize = 4096;

/// A circular history buffer for resolving LZ77 back-references.
#[derive(Debug, Clone)]
pub struct DictWindow {
    /// The underlying buffer; its length is the window capacity.
    buf: Vec<u8>,
    /// Next write index.
    pos: usize,
    /// Valid history bytes, at most the capacity.
    len: usize,
    /// Total bytes written since the last reset (not capped).
    total: u64,
}

impl DictWindow {
    /// Create a window with the given capacity.
    ///
    /// Capacities below [`DICT_SIZE_MIN`] are rounded up to it.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(DICT_SIZE_MIN);
        Self {
            buf: vec![0; capacity],
            pos: 0,
            len: 0,
            total: 0,
        }
    }

    /// Window capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of history bytes currently available.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no bytes have been written since the last reset.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total bytes written since the last reset.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Forget all history (dictionary reset).
    pub fn reset(&mut self) {
        self.pos = 0;
        self.len = 0;
        self.total = 0;
    }

    /// Append one decoded byte.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.buf[self.pos] = byte;
        self.pos += 1;
        if self.pos == self.buf.len() {
            self.pos = 0;
        }
        if self.len < self.buf.len() {
            self.len += 1;
        }
        self.total += 1;
    }

    /// Append a run of literal bytes (uncompressed LZMA2 chunks).
    pub fn extend(&mut self, data: &[u8]) {
        for &byte in data {
            self.push(byte);
        }
    }

    /// The most recently written byte, if any.
    #[inline]
    pub fn last(&self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let index = if self.pos == 0 {
            self.buf.len() - 1
        } else {
            self.pos - 1
        };
        Some(self.buf[index])
    }

    /// Read the byte `distance` positions back (0 = most recent).
    #[inline]
    pub fn byte_at(&self, distance: usize) -> Result<u8> {
        if distance >= self.len {
            return Err(XzError::invalid_distance(distance, self.len));
        }
        let index = if self.pos > distance {
            self.pos - distance - 1
        } else {
            self.buf.len() - (distance - self.pos) - 1
        };
        Ok(self.buf[index])
    }

    /// Copy `length` bytes from `distance` back, appending each byte to both
    /// the window and `out`.
    ///
    /// Copying proceeds forward one byte at a time, so an overlapping range
    /// (`length > distance + 1`) duplicates recently written bytes. That is
    /// the intended LZ77 run-length behavior, not an error.
    pub fn copy_match(&mut self, distance: usize, length: usize, out: &mut Vec<u8>) -> Result<()> {
        if distance >= self.len {
            return Err(XzError::invalid_distance(distance, self.len));
        }
        out.reserve(length);
        for _ in 0..length {
            // The distance stays valid as the window grows with each push.
            let byte = self.byte_at(distance)?;
            self.push(byte);
            out.push(byte);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_capacity() {
        let window = DictWindow::new(16);
        assert_eq!(window.capacity(), DICT_SIZE_MIN);
    }

    #[test]
    fn test_push_and_byte_at() {
        let mut window = DictWindow::new(DICT_SIZE_MIN);
        window.extend(b"hello");
        assert_eq!(window.len(), 5);
        assert_eq!(window.byte_at(0).unwrap(), b'o');
        assert_eq!(window.byte_at(4).unwrap(), b'h');
        assert_eq!(window.last(), Some(b'o'));
    }

    #[test]
    fn test_invalid_distance() {
        let mut window = DictWindow::new(DICT_SIZE_MIN);
        assert!(window.byte_at(0).is_err());
        window.push(b'a');
        assert!(window.byte_at(0).is_ok());
        assert!(window.byte_at(1).is_err());
    }

    #[test]
    fn test_copy_match() {
        let mut window = DictWindow::new(DICT_SIZE_MIN);
        let mut out = Vec::new();
        window.extend(b"abcd");
        window.copy_match(3, 4, &mut out).unwrap();
        assert_eq!(out, b"abcd");
        assert_eq!(window.len(), 8);
    }

    #[test]
    fn test_overlapping_copy_duplicates() {
        // Window "ab": distance 1 starts at 'a'; copying 6 bytes forward
        // re-reads what was just written and yields "ababab".
        let mut window = DictWindow::new(DICT_SIZE_MIN);
        let mut out = Vec::new();
        window.extend(b"ab");
        window.copy_match(1, 6, &mut out).unwrap();
        assert_eq!(out, b"ababab");
    }

    #[test]
    fn test_single_byte_run() {
        // A length-10 run expanded from a single history byte.
        let mut window = DictWindow::new(DICT_SIZE_MIN);
        let mut out = Vec::new();
        window.push(b'a');
        window.copy_match(0, 10, &mut out).unwrap();
        assert_eq!(out, b"aaaaaaaaaa");
    }

    #[test]
    fn test_reset_clears_history() {
        let mut window = DictWindow::new(DICT_SIZE_MIN);
        window.extend(b"abc");
        assert_eq!(window.total(), 3);
        window.reset();
        assert!(window.is_empty());
        assert_eq!(window.total(), 0);
        assert!(window.byte_at(0).is_err());
    }

    #[test]
    fn test_wraparound() {
        let mut window = DictWindow::new(DICT_SIZE_MIN);
        for i in 0..DICT_SIZE_MIN + 10 {
            window.push((i % 251) as u8);
        }
        assert_eq!(window.len(), DICT_SIZE_MIN);
        assert_eq!(window.total(), (DICT_SIZE_MIN + 10) as u64);
        let newest = ((DICT_SIZE_MIN + 9) % 251) as u8;
        assert_eq!(window.byte_at(0).unwrap(), newest);
        // Oldest retained byte is capacity-1 back.
        assert!(window.byte_at(DICT_SIZE_MIN - 1).is_ok());
        assert!(window.byte_at(DICT_SIZE_MIN).is_err());
    }
}
