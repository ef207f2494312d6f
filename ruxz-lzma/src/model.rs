//! LZMA probability models and decoder state.
//!
//! All adaptive probabilities live here, grouped by what they predict:
//! literal bytes, match/rep choices, match lengths, and distances. LZMA2
//! restricts `lc + lp <= 4`, which caps every table at a fixed size, so the
//! whole model is flat arrays with no per-properties allocation.

use ruxz_core::error::{Result, XzError};

use crate::range::PROB_INIT;

/// Number of states in the LZMA state machine.
pub const NUM_STATES: usize = 12;

/// Maximum number of position states (`pb <= 4`).
pub const POS_STATES_MAX: usize = 1 << 4;

/// Maximum number of literal contexts (`lc + lp <= 4` in LZMA2).
pub const LITERAL_CONTEXTS_MAX: usize = 1 << 4;

/// Symbols in the low and mid length trees.
pub const LEN_LOW_SYMBOLS: usize = 1 << 3;
/// Symbols in the high length tree.
pub const LEN_HIGH_SYMBOLS: usize = 1 << 8;

/// Minimum match length the format can express.
pub const MATCH_LEN_MIN: usize = 2;

/// Number of distance slots.
pub const DIST_SLOTS: usize = 64;

/// Slots below this use the special (adaptive reverse-tree) distance bits.
pub const DIST_MODEL_END: usize = 14;

/// Distances below this are modeled entirely; larger ones use direct bits
/// plus the align tree.
pub const FULL_DISTANCES: usize = 1 << (DIST_MODEL_END / 2);

/// Number of align bits for large distances.
pub const ALIGN_BITS: u32 = 4;
/// Size of the align tree.
pub const ALIGN_SIZE: usize = 1 << ALIGN_BITS;

/// LZMA state machine position.
///
/// The state encodes the recent symbol history (literal vs match vs rep) and
/// selects probability contexts; states below 7 follow a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State(u8);

impl State {
    /// Initial state.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Index into state-keyed probability tables.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// True if the previous symbol was a literal.
    #[inline]
    pub fn is_literal(self) -> bool {
        self.0 < 7
    }

    /// Transition after decoding a literal.
    pub fn update_literal(&mut self) {
        self.0 = match self.0 {
            0..=3 => 0,
            4..=9 => self.0 - 3,
            _ => self.0 - 6,
        };
    }

    /// Transition after a match with an explicit distance.
    pub fn update_match(&mut self) {
        self.0 = if self.0 < 7 { 7 } else { 10 };
    }

    /// Transition after a repeated-distance match.
    pub fn update_rep(&mut self) {
        self.0 = if self.0 < 7 { 8 } else { 11 };
    }

    /// Transition after a length-1 rep0 match.
    pub fn update_short_rep(&mut self) {
        self.0 = if self.0 < 7 { 9 } else { 11 };
    }
}

/// LZMA literal-coding properties (lc, lp, pb), decoded from the properties
/// byte of a compressed LZMA2 chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaProps {
    /// Literal context bits: how many high bits of the previous byte select
    /// the literal probability table.
    pub lc: u32,
    /// Literal position bits.
    pub lp: u32,
    /// Position bits for match contexts.
    pub pb: u32,
}

impl LzmaProps {
    /// Decode a properties byte (`b = (pb * 5 + lp) * 9 + lc`).
    ///
    /// LZMA2 tightens the classic LZMA limits: each field must be at most 4
    /// and `lc + lp` must not exceed 4, keeping the literal tables small.
    pub fn from_byte(byte: u8) -> Result<Self> {
        let byte = byte as u32;
        if byte >= 45 * 5 {
            return Err(XzError::options(format!(
                "invalid LZMA properties byte 0x{byte:02x}"
            )));
        }
        let pb = byte / 45;
        let lp = (byte % 45) / 9;
        let lc = byte % 9;

        if lc > 4 || lc + lp > 4 {
            return Err(XzError::options(format!(
                "unsupported literal context bits: lc={lc} lp={lp}"
            )));
        }

        Ok(Self { lc, lp, pb })
    }

    /// Number of position states (`1 << pb`).
    pub fn num_pos_states(&self) -> usize {
        1 << self.pb
    }

    /// Mask selecting the position-state bits of the uncompressed position.
    pub fn pos_mask(&self) -> u64 {
        (1 << self.pb) - 1
    }

    /// Mask selecting the literal-position bits.
    pub fn literal_pos_mask(&self) -> u64 {
        (1 << self.lp) - 1
    }
}

impl Default for LzmaProps {
    fn default() -> Self {
        // lc=3, lp=0, pb=2 is what xz emits at every preset.
        Self { lc: 3, lp: 0, pb: 2 }
    }
}

/// Match length model: a choice pair plus three bit trees.
///
/// Lengths 2-9 come from `low`, 10-17 from `mid`, 18-273 from `high`.
#[derive(Debug, Clone)]
pub struct LengthModel {
    /// Low tree vs the rest.
    pub choice: u16,
    /// Mid tree vs high tree.
    pub choice2: u16,
    /// 3-bit trees keyed by position state.
    pub low: [[u16; LEN_LOW_SYMBOLS]; POS_STATES_MAX],
    /// 3-bit trees keyed by position state.
    pub mid: [[u16; LEN_LOW_SYMBOLS]; POS_STATES_MAX],
    /// Shared 8-bit tree.
    pub high: [u16; LEN_HIGH_SYMBOLS],
}

impl LengthModel {
    fn new() -> Self {
        Self {
            choice: PROB_INIT,
            choice2: PROB_INIT,
            low: [[PROB_INIT; LEN_LOW_SYMBOLS]; POS_STATES_MAX],
            mid: [[PROB_INIT; LEN_LOW_SYMBOLS]; POS_STATES_MAX],
            high: [PROB_INIT; LEN_HIGH_SYMBOLS],
        }
    }

    fn reset(&mut self) {
        self.choice = PROB_INIT;
        self.choice2 = PROB_INIT;
        for tree in &mut self.low {
            tree.fill(PROB_INIT);
        }
        for tree in &mut self.mid {
            tree.fill(PROB_INIT);
        }
        self.high.fill(PROB_INIT);
    }
}

/// Every adaptive probability table of one LZMA decoder.
///
/// Sized for the LZMA2 worst case (about 28 KiB of counters); callers keep it
/// boxed and reuse the allocation across resets.
#[derive(Debug, Clone)]
pub struct LzmaModel {
    /// P(match | state, pos_state): match vs literal.
    pub is_match: [[u16; POS_STATES_MAX]; NUM_STATES],
    /// P(rep | state): repeated distance vs new distance.
    pub is_rep: [u16; NUM_STATES],
    /// P(not rep0 | state).
    pub is_rep0: [u16; NUM_STATES],
    /// P(not rep1 | state).
    pub is_rep1: [u16; NUM_STATES],
    /// P(rep3 | state).
    pub is_rep2: [u16; NUM_STATES],
    /// P(length > 1 | state, pos_state) for rep0 matches.
    pub is_rep0_long: [[u16; POS_STATES_MAX]; NUM_STATES],

    /// Length model for matches with explicit distances.
    pub match_len: LengthModel,
    /// Length model for repeated-distance matches.
    pub rep_len: LengthModel,

    /// Literal trees, keyed by (literal position, previous-byte bits).
    pub literal: [[u16; 0x300]; LITERAL_CONTEXTS_MAX],

    /// Distance slot trees, keyed by the length state (min(len - 2, 3)).
    pub dist_slot: [[u16; DIST_SLOTS]; 4],
    /// Reverse-tree bits for distance slots 4-13; shared flat table indexed
    /// by the slot's base distance.
    pub dist_special: [u16; FULL_DISTANCES - DIST_MODEL_END],
    /// Low 4 bits of large distances.
    pub dist_align: [u16; ALIGN_SIZE],
}

impl LzmaModel {
    /// Create a fully initialized model.
    pub fn new() -> Box<Self> {
        let mut model = Box::new(Self {
            is_match: [[0; POS_STATES_MAX]; NUM_STATES],
            is_rep: [0; NUM_STATES],
            is_rep0: [0; NUM_STATES],
            is_rep1: [0; NUM_STATES],
            is_rep2: [0; NUM_STATES],
            is_rep0_long: [[0; POS_STATES_MAX]; NUM_STATES],
            match_len: LengthModel::new(),
            rep_len: LengthModel::new(),
            literal: [[0; 0x300]; LITERAL_CONTEXTS_MAX],
            dist_slot: [[0; DIST_SLOTS]; 4],
            dist_special: [0; FULL_DISTANCES - DIST_MODEL_END],
            dist_align: [0; ALIGN_SIZE],
        });
        model.reset();
        model
    }

    /// Reset every probability to the 50% starting point.
    pub fn reset(&mut self) {
        for row in &mut self.is_match {
            row.fill(PROB_INIT);
        }
        self.is_rep.fill(PROB_INIT);
        self.is_rep0.fill(PROB_INIT);
        self.is_rep1.fill(PROB_INIT);
        self.is_rep2.fill(PROB_INIT);
        for row in &mut self.is_rep0_long {
            row.fill(PROB_INIT);
        }
        self.match_len.reset();
        self.rep_len.reset();
        for tree in &mut self.literal {
            tree.fill(PROB_INIT);
        }
        for tree in &mut self.dist_slot {
            tree.fill(PROB_INIT);
        }
        self.dist_special.fill(PROB_INIT);
        self.dist_align.fill(PROB_INIT);
    }

    /// Index of the literal tree for a given uncompressed position and
    /// previous byte.
    #[inline]
    pub fn literal_context(&self, props: &LzmaProps, pos: u64, prev_byte: u8) -> usize {
        let low = (pos & props.literal_pos_mask()) as usize;
        let high = (prev_byte as usize) >> (8 - props.lc as usize);
        (low << props.lc) + high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let mut state = State::new();
        assert!(state.is_literal());

        state.update_match();
        assert!(!state.is_literal());
        assert_eq!(state.index(), 7);

        state.update_literal();
        assert!(state.is_literal());
        assert_eq!(state.index(), 4);
    }

    #[test]
    fn test_literal_after_nonliteral_match() {
        // A match decoded from a non-literal state lands in state 10; the
        // literal after it must go to state 4 (match-then-literal), not the
        // short-rep literal state.
        let mut state = State::new();
        state.update_match();
        state.update_match();
        assert_eq!(state.index(), 10);
        state.update_literal();
        assert_eq!(state.index(), 4);

        state.update_match();
        state.update_rep();
        assert_eq!(state.index(), 11);
        state.update_literal();
        assert_eq!(state.index(), 5);
    }

    #[test]
    fn test_rep_transitions() {
        let mut state = State::new();
        state.update_rep();
        assert_eq!(state.index(), 8);
        state.update_short_rep();
        assert_eq!(state.index(), 11);
    }

    #[test]
    fn test_props_default_byte() {
        // 0x5D is the byte for lc=3 lp=0 pb=2.
        let props = LzmaProps::from_byte(0x5D).unwrap();
        assert_eq!(props, LzmaProps::default());
        assert_eq!(props.num_pos_states(), 4);
    }

    #[test]
    fn test_props_rejects_out_of_range_byte() {
        assert!(LzmaProps::from_byte(225).is_err());
        assert!(LzmaProps::from_byte(0xFF).is_err());
    }

    #[test]
    fn test_props_rejects_large_literal_context() {
        // lc=8 lp=0 pb=0 is legal in classic LZMA but not in LZMA2.
        assert!(LzmaProps::from_byte(8).is_err());
        // lc=3 lp=2: sum exceeds 4.
        assert!(LzmaProps::from_byte(3 + 2 * 9).is_err());
        // lc=0 lp=4 is right at the limit.
        assert!(LzmaProps::from_byte(4 * 9).is_ok());
    }

    #[test]
    fn test_literal_context_uses_prev_byte_bits() {
        let model = LzmaModel::new();
        let props = LzmaProps::default();
        // lc=3: top three bits of the previous byte.
        assert_eq!(model.literal_context(&props, 0, 0b1110_0000), 7);
        assert_eq!(model.literal_context(&props, 0, 0b0001_1111), 0);
    }

    #[test]
    fn test_model_reset_restores_init() {
        let mut model = LzmaModel::new();
        model.is_match[3][1] = 17;
        model.dist_align[2] = 9;
        model.reset();
        assert_eq!(model.is_match[3][1], PROB_INIT);
        assert_eq!(model.dist_align[2], PROB_INIT);
    }
}
