//! CRC implementations used by the xz container format.
//!
//! - **CRC-32 (ISO 3309)**: stream flags, block headers, index and footer
//!   integrity fields, and the CRC-32 block check.
//! - **CRC-64/XZ (ECMA-182, reflected)**: the CRC-64 block check.
//!
//! Both engines expose a streaming `new`/`update`/`value`/`finalize` API so
//! block checks can be accumulated incrementally as decompressed bytes are
//! produced, plus a one-shot `compute` helper for small header fields.

/// CRC-32 lookup table (polynomial 0xEDB88320, reflected).
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// CRC-64 lookup table (polynomial 0xC96C5795D7870F42, reflected).
const CRC64_TABLE: [u64; 256] = {
    let mut table = [0u64; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u64;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xC96C5795D7870F42;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Streaming CRC-32 (ISO 3309) calculator.
///
/// - Polynomial: 0x04C11DB7 (reflected: 0xEDB88320)
/// - Initial value: 0xFFFFFFFF
/// - Final XOR: 0xFFFFFFFF
///
/// # Example
///
/// ```
/// use ruxz_core::crc::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, World!");
/// assert_eq!(crc.finalize(), 0xEC4AC3D0);
/// ```
#[derive(Debug, Clone)]
pub struct Crc32 {
    crc: u32,
}

impl Crc32 {
    /// Create a new CRC-32 calculator.
    pub fn new() -> Self {
        Self { crc: 0xFFFFFFFF }
    }

    /// Reset to the initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFFFFFF;
    }

    /// Update with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        let mut crc = self.crc;
        for &byte in data {
            let index = ((crc ^ byte as u32) & 0xFF) as usize;
            crc = CRC32_TABLE[index] ^ (crc >> 8);
        }
        self.crc = crc;
    }

    /// Current CRC value without consuming the calculator.
    #[inline(always)]
    pub fn value(&self) -> u32 {
        self.crc ^ 0xFFFFFFFF
    }

    /// Finalize and return the CRC value.
    #[inline(always)]
    pub fn finalize(self) -> u32 {
        self.crc ^ 0xFFFFFFFF
    }

    /// Compute the CRC-32 of a slice in one call.
    #[inline]
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming CRC-64/XZ (ECMA-182, reflected) calculator.
///
/// - Polynomial: 0x42F0E1EBA9EA3693 (reflected: 0xC96C5795D7870F42)
/// - Initial value: 0xFFFFFFFFFFFFFFFF
/// - Final XOR: 0xFFFFFFFFFFFFFFFF
#[derive(Debug, Clone)]
pub struct Crc64 {
    crc: u64,
}

impl Crc64 {
    /// Create a new CRC-64 calculator.
    pub fn new() -> Self {
        Self {
            crc: 0xFFFFFFFF_FFFFFFFF,
        }
    }

    /// Reset to the initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFFFFFF_FFFFFFFF;
    }

    /// Update with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        let mut crc = self.crc;
        for &byte in data {
            let index = ((crc ^ byte as u64) & 0xFF) as usize;
            crc = CRC64_TABLE[index] ^ (crc >> 8);
        }
        self.crc = crc;
    }

    /// Current CRC value without consuming the calculator.
    #[inline(always)]
    pub fn value(&self) -> u64 {
        self.crc ^ 0xFFFFFFFF_FFFFFFFF
    }

    /// Finalize and return the CRC value.
    #[inline(always)]
    pub fn finalize(self) -> u64 {
        self.crc ^ 0xFFFFFFFF_FFFFFFFF
    }

    /// Compute the CRC-64 of a slice in one call.
    #[inline]
    pub fn compute(data: &[u8]) -> u64 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for Crc64 {
    fn default() -> Self {
        Self::new()
    }
}
