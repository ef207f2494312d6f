//! # ruxz Core
//!
//! Core components for the ruxz streaming xz decompressor.
//!
//! This crate provides the building blocks shared by the decoding layers:
//!
//! - [`crc`]: CRC-32 and CRC-64 engines used for container fields and block
//!   checks
//! - [`window`]: the LZ77 sliding dictionary for back-reference resolution
//! - [`traits`]: the incremental [`Decompressor`] contract
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! ruxz is a layered decoder:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Driver                                              │
//! │     XzReader (pull, std::io::Read)                      │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Container                                           │
//! │     xz stream/block/index/footer parsing, checks        │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Codec                                               │
//! │     LZMA2 chunks, range decoder, probability model      │
//! ├─────────────────────────────────────────────────────────┤
//! │ L0: this crate                                          │
//! │     DictWindow, CRC engines, Decompressor trait         │
//! └─────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod crc;
pub mod error;
pub mod traits;
pub mod window;

// Re-exports for convenience
pub use crc::{Crc32, Crc64};
pub use error::{ErrorKind, Result, XzError};
pub use traits::{Action, DecodeStatus, Decompressor};
pub use window::{DICT_SIZE_MIN, DictWindow};
