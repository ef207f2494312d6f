//! Push-based xz stream decoder.
//!
//! [`XzStream`] walks the container structure with an explicit state
//! machine, gathering each fixed-size structure into a hold buffer before
//! parsing it. Input can therefore arrive in arbitrary slices, down to one
//! byte at a time, and the decoded output is byte-identical regardless of
//! how the input was split.
//!
//! Decoded chunk output lands in a pending buffer and is drained into the
//! caller's slices, so output buffer sizes are equally unconstrained.

use ruxz_core::crc::Crc32;
use ruxz_core::error::{Result, XzError};
use ruxz_core::traits::{Action, DecodeStatus, Decompressor};
use ruxz_lzma::{ChunkHeader, Lzma2Decoder};

use crate::check::BlockCheck;
use crate::header::{
    self, BlockHeader, CheckType, StreamFlags, STREAM_FOOTER_SIZE, STREAM_HEADER_SIZE,
};
use crate::vli::VliDecoder;
use crate::XzOptions;

/// Where the parser currently is in the container structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Gathering the 12-byte stream header.
    StreamHeader,
    /// Gathering one byte: a block header size byte, or 0x00 for the index.
    BlockOrIndex,
    /// Gathering the rest of a block header.
    BlockHeader,
    /// Gathering an LZMA2 chunk control byte.
    ChunkControl,
    /// Gathering the rest of a chunk header.
    ChunkHeader,
    /// Gathering a chunk payload.
    ChunkPayload(ChunkHeader),
    /// Skipping zero bytes aligning the block to four bytes.
    BlockPadding(usize),
    /// Gathering the block check trailer.
    BlockCheckTrailer,
    /// Index: record count VLI.
    IndexCount,
    /// Index: a record's unpadded size VLI.
    IndexUnpadded,
    /// Index: a record's uncompressed size VLI; the unpadded size is held.
    IndexUncompressed(u64),
    /// Index: zero bytes aligning the index to four bytes.
    IndexPadding,
    /// Gathering the 4-byte index CRC32.
    IndexCrc,
    /// Gathering the 12-byte stream footer.
    StreamFooter,
    /// Between streams: zero padding, possibly followed by another stream.
    /// Carries the padding length seen so far, modulo four.
    StreamPadding(usize),
    /// All input fully decoded and verified.
    Finished,
}

/// Incremental xz decompressor over pushed byte slices.
///
/// Implements [`Decompressor`]; most callers want the [`crate::XzReader`]
/// wrapper instead, which drives this from any `std::io::Read`.
#[derive(Debug)]
pub struct XzStream {
    dict_size_limit: u64,
    strict_checks: bool,
    concatenated: bool,

    state: ParseState,
    /// Bytes gathered for the structure currently being parsed.
    hold: Vec<u8>,
    /// Target size of `hold` for the current structure.
    needed: usize,

    /// Decoded output not yet handed to the caller.
    pending: Vec<u8>,
    pending_pos: usize,

    decoder: Lzma2Decoder,
    stream_flags: Option<StreamFlags>,
    check: BlockCheck,

    block_header: Option<BlockHeader>,
    /// Bytes of LZMA2 data seen in the current block, framing included.
    block_compressed: u64,
    /// Decoded bytes of the current block.
    block_uncompressed: u64,

    /// (unpadded size, uncompressed size) per finished block, in order,
    /// for verification against the index.
    records: Vec<(u64, u64)>,
    index_record_count: u64,
    index_records_seen: u64,
    index_crc: Crc32,
    index_size: u64,
    vli: VliDecoder,

    total_in: u64,
    total_out: u64,

    /// Declared check type of the most recent stream header.
    check_type: Option<CheckType>,
    /// Check id of the first recognized-but-unverifiable check seen.
    unsupported_check: Option<u8>,
    /// Sticky terminal error, re-reported on every later call.
    error: Option<XzError>,
}

impl XzStream {
    /// Create a decoder with the given options.
    pub fn new(options: &XzOptions) -> Self {
        Self {
            dict_size_limit: options.dict_size_limit,
            strict_checks: options.strict_checks,
            concatenated: options.concatenated,
            state: ParseState::StreamHeader,
            hold: Vec::new(),
            needed: STREAM_HEADER_SIZE,
            pending: Vec::new(),
            pending_pos: 0,
            decoder: Lzma2Decoder::new(0),
            stream_flags: None,
            check: BlockCheck::None,
            block_header: None,
            block_compressed: 0,
            block_uncompressed: 0,
            records: Vec::new(),
            index_record_count: 0,
            index_records_seen: 0,
            index_crc: Crc32::new(),
            index_size: 0,
            vli: VliDecoder::new(),
            total_in: 0,
            total_out: 0,
            check_type: None,
            unsupported_check: None,
            error: None,
        }
    }

    /// Total compressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total decompressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// The check id of a recognized check this build could not verify, if
    /// one was seen. Data decoded fine; only its integrity went unverified.
    pub fn unsupported_check(&self) -> Option<u8> {
        self.unsupported_check
    }

    /// Check type declared by the most recent stream header, once one has
    /// been parsed. [`CheckType::None`] means the data carries no
    /// integrity check at all; that is valid, just worth knowing.
    pub fn check_type(&self) -> Option<CheckType> {
        self.check_type
    }

    fn enter(&mut self, state: ParseState, needed: usize) {
        self.hold.clear();
        self.needed = needed;
        self.state = state;
    }

    /// Copy bytes from `input` into the hold buffer. Returns the number
    /// taken and whether the structure is now complete.
    fn gather(&mut self, input: &[u8]) -> (usize, bool) {
        let want = self.needed - self.hold.len();
        let take = want.min(input.len());
        self.hold.extend_from_slice(&input[..take]);
        (take, self.hold.len() == self.needed)
    }

    fn drain_pending(&mut self, output: &mut [u8]) -> usize {
        let available = self.pending.len() - self.pending_pos;
        let n = available.min(output.len());
        output[..n].copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
        self.pending_pos += n;
        if self.pending_pos == self.pending.len() {
            self.pending.clear();
            self.pending_pos = 0;
        }
        n
    }

    fn pending_remaining(&self) -> usize {
        self.pending.len() - self.pending_pos
    }

    fn run(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        action: Action,
    ) -> Result<(usize, usize, DecodeStatus)> {
        let mut consumed = 0;
        let mut produced = 0;

        loop {
            produced += self.drain_pending(&mut output[produced..]);
            if self.pending_remaining() > 0 {
                return Ok((consumed, produced, DecodeStatus::NeedsOutput));
            }
            if self.state == ParseState::Finished {
                return Ok((consumed, produced, DecodeStatus::Finished));
            }
            if consumed == input.len() {
                match action {
                    Action::Run => return Ok((consumed, produced, DecodeStatus::NeedsInput)),
                    Action::Finish => {
                        self.finish_at_eof()?;
                        continue;
                    }
                }
            }
            consumed += self.step(&input[consumed..])?;
        }
    }

    /// The input source reported end-of-file: either we are at a clean
    /// stream boundary or the stream is truncated.
    fn finish_at_eof(&mut self) -> Result<()> {
        match self.state {
            ParseState::StreamPadding(pad) => {
                if pad % 4 != 0 {
                    return Err(XzError::data(
                        "stream padding is not a multiple of four bytes",
                    ));
                }
                self.state = ParseState::Finished;
                Ok(())
            }
            ParseState::Finished => Ok(()),
            _ => Err(XzError::data("truncated xz stream")),
        }
    }

    /// Advance the state machine, consuming at least one byte of `input`
    /// (never called with an empty slice).
    fn step(&mut self, input: &[u8]) -> Result<usize> {
        match self.state {
            ParseState::StreamHeader => {
                let (n, done) = self.gather(input);
                if done {
                    let mut bytes = [0u8; STREAM_HEADER_SIZE];
                    bytes.copy_from_slice(&self.hold);
                    let flags = header::parse_stream_header(&bytes)?;
                    if let CheckType::Unsupported(id) = flags.check {
                        if self.strict_checks {
                            return Err(XzError::UnsupportedCheck { id });
                        }
                        self.unsupported_check.get_or_insert(id);
                    }
                    self.check_type = Some(flags.check);
                    self.stream_flags = Some(flags);
                    self.enter(ParseState::BlockOrIndex, 1);
                }
                Ok(n)
            }

            ParseState::BlockOrIndex => {
                let byte = input[0];
                if byte == 0x00 {
                    // Index indicator: block headers never encode size zero.
                    self.index_crc.reset();
                    self.index_crc.update(&[0x00]);
                    self.index_size = 1;
                    self.vli = VliDecoder::new();
                    self.enter(ParseState::IndexCount, 0);
                } else {
                    self.hold.clear();
                    self.hold.push(byte);
                    self.needed = BlockHeader::encoded_len(byte);
                    self.state = ParseState::BlockHeader;
                }
                Ok(1)
            }

            ParseState::BlockHeader => {
                let (n, done) = self.gather(input);
                if done {
                    let block = BlockHeader::parse(&self.hold)?;
                    if block.dict_size > self.dict_size_limit {
                        return Err(XzError::mem_limit(block.dict_size, self.dict_size_limit));
                    }
                    let dict_size = block.dict_size as usize;
                    if self.decoder.dict_size() >= dict_size {
                        self.decoder.begin_block();
                    } else {
                        self.decoder.reset_with_dict_size(dict_size);
                    }
                    let Some(flags) = self.stream_flags else {
                        return Err(XzError::format("block before stream header"));
                    };
                    self.check = BlockCheck::new(flags.check);
                    self.block_header = Some(block);
                    self.block_compressed = 0;
                    self.block_uncompressed = 0;
                    self.enter(ParseState::ChunkControl, 1);
                }
                Ok(n)
            }

            ParseState::ChunkControl => {
                let control = input[0];
                self.block_compressed += 1;
                if control == 0x00 {
                    self.finish_block_data()?;
                } else {
                    let len = ChunkHeader::encoded_len(control)?;
                    self.hold.clear();
                    self.hold.push(control);
                    self.needed = len;
                    self.state = ParseState::ChunkHeader;
                }
                Ok(1)
            }

            ParseState::ChunkHeader => {
                let (n, done) = self.gather(input);
                self.block_compressed += n as u64;
                if done {
                    let chunk = ChunkHeader::parse(&self.hold)?;
                    self.enter(ParseState::ChunkPayload(chunk), chunk.payload_len());
                }
                Ok(n)
            }

            ParseState::ChunkPayload(chunk) => {
                let (n, done) = self.gather(input);
                self.block_compressed += n as u64;
                if done {
                    let start = self.pending.len();
                    // The hold buffer is the complete payload; decode the
                    // whole chunk in one go.
                    self.decoder
                        .decode_chunk(&chunk, &self.hold, &mut self.pending)?;

                    let decoded = &self.pending[start..];
                    self.check.update(decoded);
                    self.block_uncompressed += decoded.len() as u64;
                    if let Some(block) = &self.block_header {
                        if let Some(declared) = block.uncompressed_size {
                            if self.block_uncompressed > declared {
                                return Err(XzError::data(
                                    "block output exceeds declared uncompressed size",
                                ));
                            }
                        }
                    }
                    self.enter(ParseState::ChunkControl, 1);
                }
                Ok(n)
            }

            ParseState::BlockPadding(remaining) => {
                let take = remaining.min(input.len());
                if input[..take].iter().any(|&b| b != 0) {
                    return Err(XzError::data("nonzero block padding"));
                }
                if take == remaining {
                    self.enter_check_trailer()?;
                } else {
                    self.state = ParseState::BlockPadding(remaining - take);
                }
                Ok(take)
            }

            ParseState::BlockCheckTrailer => {
                let (n, done) = self.gather(input);
                if done {
                    self.finish_block()?;
                }
                Ok(n)
            }

            ParseState::IndexCount => {
                let byte = input[0];
                self.index_crc.update(&[byte]);
                self.index_size += 1;
                if let Some(count) = self.vli.push(byte)? {
                    if count != self.records.len() as u64 {
                        return Err(XzError::data(format!(
                            "index declares {count} records, stream had {}",
                            self.records.len()
                        )));
                    }
                    self.index_record_count = count;
                    self.index_records_seen = 0;
                    if count == 0 {
                        self.enter_index_padding();
                    } else {
                        self.state = ParseState::IndexUnpadded;
                    }
                }
                Ok(1)
            }

            ParseState::IndexUnpadded => {
                let byte = input[0];
                self.index_crc.update(&[byte]);
                self.index_size += 1;
                if let Some(unpadded) = self.vli.push(byte)? {
                    self.state = ParseState::IndexUncompressed(unpadded);
                }
                Ok(1)
            }

            ParseState::IndexUncompressed(unpadded) => {
                let byte = input[0];
                self.index_crc.update(&[byte]);
                self.index_size += 1;
                if let Some(uncompressed) = self.vli.push(byte)? {
                    let seen = self.index_records_seen as usize;
                    if self.records[seen] != (unpadded, uncompressed) {
                        return Err(XzError::data(format!(
                            "index record {seen} does not match the decoded block"
                        )));
                    }
                    self.index_records_seen += 1;
                    if self.index_records_seen == self.index_record_count {
                        self.enter_index_padding();
                    } else {
                        self.state = ParseState::IndexUnpadded;
                    }
                }
                Ok(1)
            }

            ParseState::IndexPadding => {
                let byte = input[0];
                if byte != 0 {
                    return Err(XzError::data("nonzero index padding"));
                }
                self.index_crc.update(&[byte]);
                self.index_size += 1;
                if self.index_size % 4 == 0 {
                    self.enter(ParseState::IndexCrc, 4);
                }
                Ok(1)
            }

            ParseState::IndexCrc => {
                let (n, done) = self.gather(input);
                if done {
                    let stored = u32::from_le_bytes([
                        self.hold[0],
                        self.hold[1],
                        self.hold[2],
                        self.hold[3],
                    ]);
                    let computed = self.index_crc.value();
                    if stored != computed {
                        return Err(XzError::checksum_mismatch(
                            u64::from(stored),
                            u64::from(computed),
                        ));
                    }
                    self.index_size += 4;
                    self.enter(ParseState::StreamFooter, STREAM_FOOTER_SIZE);
                }
                Ok(n)
            }

            ParseState::StreamFooter => {
                let (n, done) = self.gather(input);
                if done {
                    let mut bytes = [0u8; STREAM_FOOTER_SIZE];
                    bytes.copy_from_slice(&self.hold);
                    let footer = header::parse_stream_footer(&bytes)?;
                    let Some(flags) = self.stream_flags else {
                        return Err(XzError::format("stream footer before header"));
                    };
                    header::check_flags_match(flags, footer.flags)?;
                    if footer.backward_size != self.index_size {
                        return Err(XzError::data(format!(
                            "footer backward size {} does not match index size {}",
                            footer.backward_size, self.index_size
                        )));
                    }

                    if self.concatenated {
                        self.records.clear();
                        self.stream_flags = None;
                        self.enter(ParseState::StreamPadding(0), 0);
                    } else {
                        self.enter(ParseState::Finished, 0);
                    }
                }
                Ok(n)
            }

            ParseState::StreamPadding(pad) => {
                let byte = input[0];
                if byte == 0 {
                    self.state = ParseState::StreamPadding((pad + 1) % 4);
                } else {
                    if pad % 4 != 0 {
                        return Err(XzError::data(
                            "stream padding is not a multiple of four bytes",
                        ));
                    }
                    // A new stream begins with this byte.
                    self.hold.clear();
                    self.hold.push(byte);
                    self.needed = STREAM_HEADER_SIZE;
                    self.state = ParseState::StreamHeader;
                }
                Ok(1)
            }

            ParseState::Finished => Ok(0),
        }
    }

    /// The 0x00 end marker of the block's LZMA2 data was consumed: verify
    /// declared sizes and move on to padding and the check trailer.
    fn finish_block_data(&mut self) -> Result<()> {
        let Some(block) = self.block_header else {
            return Err(XzError::format("block data without a block header"));
        };
        if let Some(declared) = block.compressed_size {
            if declared != self.block_compressed {
                return Err(XzError::data(format!(
                    "block compressed size is {}, header declared {declared}",
                    self.block_compressed
                )));
            }
        }
        if let Some(declared) = block.uncompressed_size {
            if declared != self.block_uncompressed {
                return Err(XzError::data(format!(
                    "block uncompressed size is {}, header declared {declared}",
                    self.block_uncompressed
                )));
            }
        }

        let padding = (4 - (self.block_compressed % 4) as usize) % 4;
        if padding > 0 {
            self.enter(ParseState::BlockPadding(padding), 0);
            Ok(())
        } else {
            self.enter_check_trailer()
        }
    }

    fn enter_check_trailer(&mut self) -> Result<()> {
        let size = self.check.size();
        if size == 0 {
            self.hold.clear();
            self.finish_block()
        } else {
            self.enter(ParseState::BlockCheckTrailer, size);
            Ok(())
        }
    }

    /// Verify the check trailer in the hold buffer and record the block for
    /// index verification.
    fn finish_block(&mut self) -> Result<()> {
        let Some(block) = self.block_header.take() else {
            return Err(XzError::format("block trailer without a block header"));
        };
        let check = std::mem::replace(&mut self.check, BlockCheck::None);
        let check_size = check.size() as u64;
        check.verify(&self.hold)?;

        let unpadded = block.header_size as u64 + self.block_compressed + check_size;
        self.records.push((unpadded, self.block_uncompressed));
        self.enter(ParseState::BlockOrIndex, 1);
        Ok(())
    }

    /// Move to index padding, or straight to the CRC if already aligned.
    fn enter_index_padding(&mut self) {
        if self.index_size % 4 == 0 {
            self.enter(ParseState::IndexCrc, 4);
        } else {
            self.enter(ParseState::IndexPadding, 0);
        }
    }
}

impl Decompressor for XzStream {
    fn process(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        action: Action,
    ) -> Result<(usize, usize, DecodeStatus)> {
        if let Some(err) = &self.error {
            return Err(err.duplicate());
        }
        match self.run(input, output, action) {
            Ok((consumed, produced, status)) => {
                self.total_in += consumed as u64;
                self.total_out += produced as u64;
                Ok((consumed, produced, status))
            }
            Err(err) => {
                self.error = Some(err.duplicate());
                Err(err)
            }
        }
    }

    fn reset(&mut self) {
        self.state = ParseState::StreamHeader;
        self.hold.clear();
        self.needed = STREAM_HEADER_SIZE;
        self.pending.clear();
        self.pending_pos = 0;
        self.decoder.reset();
        self.stream_flags = None;
        self.check = BlockCheck::None;
        self.block_header = None;
        self.block_compressed = 0;
        self.block_uncompressed = 0;
        self.records.clear();
        self.index_record_count = 0;
        self.index_records_seen = 0;
        self.index_crc.reset();
        self.index_size = 0;
        self.vli = VliDecoder::new();
        self.total_in = 0;
        self.total_out = 0;
        self.check_type = None;
        self.unsupported_check = None;
        self.error = None;
    }

    fn is_finished(&self) -> bool {
        self.state == ParseState::Finished && self.pending_remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::XzOptions;

    // `xz --check=crc32` output for the input "abcabcabcabc".
    const ABC_XZ: &[u8] = &[
        0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00, 0x01, 0x69, 0x22, 0xDE, 0x36, 0x04, 0xC0, 0x10,
        0x0C, 0x21, 0x01, 0x16, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x7B, 0xB0,
        0x54, 0x28, 0xE0, 0x00, 0x0B, 0x00, 0x08, 0x5D, 0x00, 0x30, 0x98, 0x88, 0xA7, 0xEA, 0x25,
        0x00, 0x00, 0x00, 0x34, 0x2A, 0x6E, 0x5A, 0x00, 0x01, 0x28, 0x0C, 0xAA, 0x57, 0x6D, 0x74,
        0x90, 0x42, 0x99, 0x0D, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x59, 0x5A,
    ];

    fn decode_all(stream: &mut XzStream, input: &[u8]) -> Result<Vec<u8>> {
        stream.process_all(input)
    }

    #[test]
    fn test_whole_file_at_once() {
        let mut stream = XzStream::new(&XzOptions::default());
        let out = decode_all(&mut stream, ABC_XZ).unwrap();
        assert_eq!(out, b"abcabcabcabc");
        assert!(stream.is_finished());
        assert_eq!(stream.total_in(), ABC_XZ.len() as u64);
        assert_eq!(stream.total_out(), 12);
    }

    #[test]
    fn test_one_byte_at_a_time() {
        let mut stream = XzStream::new(&XzOptions::default());
        let mut out = Vec::new();
        let mut buf = [0u8; 1];

        for (i, &byte) in ABC_XZ.iter().enumerate() {
            let action = if i + 1 == ABC_XZ.len() {
                Action::Finish
            } else {
                Action::Run
            };
            let mut offset = 0;
            loop {
                let (consumed, produced, status) =
                    stream.process(&[byte][offset..], &mut buf, action).unwrap();
                offset += consumed;
                out.extend_from_slice(&buf[..produced]);
                match status {
                    DecodeStatus::NeedsOutput => continue,
                    _ => break,
                }
            }
        }
        assert_eq!(out, b"abcabcabcabc");
        assert!(stream.is_finished());
    }

    #[test]
    fn test_truncated_input_is_data_error() {
        let mut stream = XzStream::new(&XzOptions::default());
        let err = decode_all(&mut stream, &ABC_XZ[..30]).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::Data);
    }

    #[test]
    fn test_errors_are_sticky() {
        let mut stream = XzStream::new(&XzOptions::default());
        let mut corrupt = ABC_XZ.to_vec();
        corrupt[40] ^= 0xFF; // inside the chunk payload
        assert!(decode_all(&mut stream, &corrupt).is_err());

        // Valid input after the failure still reports the original error.
        let mut buf = [0u8; 64];
        let err = stream.process(ABC_XZ, &mut buf, Action::Run).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::Data);
        assert!(!stream.is_finished());
    }

    #[test]
    fn test_reset_recovers_from_error() {
        let mut stream = XzStream::new(&XzOptions::default());
        assert!(decode_all(&mut stream, &ABC_XZ[..20]).is_err());
        stream.reset();
        let out = decode_all(&mut stream, ABC_XZ).unwrap();
        assert_eq!(out, b"abcabcabcabc");
    }

    #[test]
    fn test_check_mismatch_detected() {
        let mut stream = XzStream::new(&XzOptions::default());
        let mut corrupt = ABC_XZ.to_vec();
        corrupt[48] ^= 0x01; // stored CRC32 of the block data
        let err = decode_all(&mut stream, &corrupt).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::Data);
    }

    #[test]
    fn test_memory_limit_enforced() {
        let options = XzOptions::default().dict_size_limit(4096);
        let mut stream = XzStream::new(&options);
        // The fixture declares an 8 MiB dictionary.
        let err = decode_all(&mut stream, ABC_XZ).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::MemLimit);
    }

    #[test]
    fn test_concatenated_streams() {
        let mut input = ABC_XZ.to_vec();
        input.extend_from_slice(ABC_XZ);
        let mut stream = XzStream::new(&XzOptions::default());
        let out = decode_all(&mut stream, &input).unwrap();
        assert_eq!(out, b"abcabcabcabcabcabcabcabc");
    }

    #[test]
    fn test_concatenated_with_padding() {
        let mut input = ABC_XZ.to_vec();
        input.extend_from_slice(&[0, 0, 0, 0]);
        input.extend_from_slice(ABC_XZ);
        input.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);
        let mut stream = XzStream::new(&XzOptions::default());
        let out = decode_all(&mut stream, &input).unwrap();
        assert_eq!(out, b"abcabcabcabcabcabcabcabc");
    }

    #[test]
    fn test_misaligned_stream_padding_rejected() {
        let mut input = ABC_XZ.to_vec();
        input.extend_from_slice(&[0, 0]);
        let mut stream = XzStream::new(&XzOptions::default());
        let err = decode_all(&mut stream, &input).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::Data);
    }

    #[test]
    fn test_single_stream_mode_stops_at_footer() {
        let mut input = ABC_XZ.to_vec();
        input.extend_from_slice(b"trailing garbage");
        let options = XzOptions::default().concatenated(false);
        let mut stream = XzStream::new(&options);

        let mut buf = [0u8; 64];
        let (consumed, produced, status) =
            stream.process(&input, &mut buf, Action::Run).unwrap();
        assert_eq!(status, DecodeStatus::Finished);
        assert_eq!(consumed, ABC_XZ.len());
        assert_eq!(&buf[..produced], b"abcabcabcabc");
    }

    #[test]
    fn test_garbage_after_padding_rejected() {
        let mut input = ABC_XZ.to_vec();
        input.extend_from_slice(&[0, 0, 0, 0]);
        input.extend_from_slice(b"garbage, not an xz stream");
        let mut stream = XzStream::new(&XzOptions::default());
        // The non-zero byte is taken as a new stream header, which fails
        // its magic check.
        let err = decode_all(&mut stream, &input).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::Format);
    }

    #[test]
    fn test_bad_index_crc_rejected() {
        let mut corrupt = ABC_XZ.to_vec();
        corrupt[56] ^= 0x01; // index CRC32
        let mut stream = XzStream::new(&XzOptions::default());
        let err = decode_all(&mut stream, &corrupt).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::Data);
    }

    #[test]
    fn test_empty_input_rejected() {
        let mut stream = XzStream::new(&XzOptions::default());
        let err = decode_all(&mut stream, &[]).unwrap_err();
        assert_eq!(err.kind(), ruxz_core::ErrorKind::Data);
    }
}
