//! Core trait for incremental decompression.

use crate::error::Result;

/// Whether more input may still arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// More input may follow the bytes supplied in this call.
    #[default]
    Run,
    /// The input source is exhausted; drain remaining output and expect the
    /// logical end of the stream.
    Finish,
}

/// Status of one incremental decompression step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// All supplied input was consumed and more is needed to continue.
    NeedsInput,
    /// The output buffer filled up before decoding could continue.
    NeedsOutput,
    /// The logical end of the compressed stream was reached and verified.
    Finished,
}

/// A streaming decompressor.
///
/// Implementations consume arbitrarily-sized input chunks and produce
/// arbitrarily-sized output chunks, carrying partial structures internally so
/// callers never need to align input to any frame boundary.
pub trait Decompressor {
    /// Run the decoder over `input`, writing decompressed bytes to `output`.
    ///
    /// Returns `(bytes consumed from input, bytes written to output, status)`.
    /// Errors are sticky: after a failure every later call reports the same
    /// error without consuming anything.
    fn process(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        action: Action,
    ) -> Result<(usize, usize, DecodeStatus)>;

    /// Discard all state and prepare for a fresh stream.
    fn reset(&mut self);

    /// True once the stream end has been reached and verified.
    fn is_finished(&self) -> bool;

    /// Decompress a complete in-memory input in one call (convenience).
    fn process_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buffer = vec![0u8; 32768];
        let mut pos = 0;

        loop {
            let action = if pos == input.len() {
                Action::Finish
            } else {
                Action::Run
            };
            let (consumed, produced, status) =
                self.process(&input[pos..], &mut buffer, action)?;
            pos += consumed;
            out.extend_from_slice(&buffer[..produced]);

            match status {
                DecodeStatus::Finished => return Ok(out),
                DecodeStatus::NeedsOutput => continue,
                DecodeStatus::NeedsInput => {
                    // With Finish the implementation either finishes or
                    // reports truncation, so landing here means Run with
                    // input left over.
                    continue;
                }
            }
        }
    }
}
