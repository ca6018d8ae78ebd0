//! The Iguana block format.
//!
//! A block is six parallel streams. `Tokens` drives the decoder; the
//! other five supply parameters as the tokens request them:
//!
//! ```text
//! token >= 32:  [F] [ M M M M ] [ L L L ]
//!               bit 7    match len   literal len
//!               F = reuse the last offset, otherwise pull 16 bits
//!               M = 15 -> extended via VarMatchLen
//!               L = 7  -> extended via VarLitLen
//! token < 32:   24-bit offset follows in Offset24;
//!               match len = token + 16, or 47 + VarMatchLen for 31
//! ```
//!
//! Short matches are only representable with 16-bit offsets, so the
//! cost model prices the 24-bit shape as infinite below 16 bytes.

use core::ops::{Index, IndexMut};

pub(crate) mod compress;
pub(crate) mod decompress;
pub(crate) mod matcher;
pub mod vint;

use vint::var_uint_cost;

/// Number of parallel streams in a block; the order below is part of
/// the wire format.
pub(crate) const STREAM_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub(crate) enum StreamId {
    Tokens = 0,
    Offset16 = 1,
    Offset24 = 2,
    VarLitLen = 3,
    VarMatchLen = 4,
    Literals = 5,
}

impl StreamId {
    pub(crate) const ALL: [StreamId; STREAM_COUNT] = [
        StreamId::Tokens,
        StreamId::Offset16,
        StreamId::Offset24,
        StreamId::VarLitLen,
        StreamId::VarMatchLen,
        StreamId::Literals,
    ];
}

/// The six output streams of the structural encoder. Buffers are reused
/// across blocks; clearing keeps their capacity.
#[derive(Default)]
pub(crate) struct StreamPack {
    streams: [Vec<u8>; STREAM_COUNT],
}

impl StreamPack {
    pub(crate) fn clear(&mut self) {
        for s in &mut self.streams {
            s.clear();
        }
    }

    pub(crate) fn get(&self, id: StreamId) -> &[u8] {
        &self.streams[id as usize]
    }
}

impl Index<StreamId> for StreamPack {
    type Output = Vec<u8>;
    #[inline]
    fn index(&self, id: StreamId) -> &Vec<u8> {
        &self.streams[id as usize]
    }
}

impl IndexMut<StreamId> for StreamPack {
    #[inline]
    fn index_mut(&mut self, id: StreamId) -> &mut Vec<u8> {
        &mut self.streams[id as usize]
    }
}

/// Smallest representable back-reference distance. The wide-copy
/// decode loops rely on source and destination being at least this far
/// apart.
pub(crate) const MIN_OFFSET: usize = 32;

/// Largest distance the 16-bit offset stream can carry.
pub(crate) const MAX_OFFSET_16: u32 = 0xffff;
/// Largest distance the 24-bit offset stream can carry.
pub(crate) const MAX_OFFSET_24: u32 = (1 << 24) - 1;

/// Literal lengths above this go through `VarLitLen`.
pub(crate) const MAX_SHORT_LIT_LEN: u32 = 7;
/// Match lengths above this go through `VarMatchLen`.
pub(crate) const MAX_SHORT_MATCH_LEN: u32 = 15;
/// Smallest match length of the 24-bit-offset token group.
pub(crate) const MM_LONG_OFFSETS: u32 = 16;
/// Token value announcing an extended long-offset match length.
pub(crate) const LAST_LONG_OFFSET: u8 = 31;
/// Match length at which the long-offset shape switches to `VarMatchLen`.
pub(crate) const LONG_MATCH_EXT_BASE: u32 = MM_LONG_OFFSETS + LAST_LONG_OFFSET as u32;

/// High bit of a short-shape token: reuse the previous offset.
pub(crate) const TOKEN_LAST_OFFSET: u8 = 0x80;

/// Longest match the token streams can express without overflowing a
/// VarUint extension.
pub(crate) const MAX_MATCH_LEN: u32 = MAX_SHORT_MATCH_LEN + vint::VAR_UINT_MAX;
/// Longest literal run a single token can carry.
pub(crate) const MAX_TOKEN_LIT_LEN: u32 = MAX_SHORT_LIT_LEN + vint::VAR_UINT_MAX;

const COST_TOKEN: i32 = 1;
const COST_OFFS16: i32 = 2;
const COST_OFFS24: i32 = 3;
/// Cost of an unrepresentable emission.
pub(crate) const COST_INFINITE: i32 = i32::MAX;

/// Bytes added to the output by emitting a match of `length` at
/// distance `offs` with `lit_len` pending literals, negative when the
/// match is a net win. The pending literal bytes themselves are paid
/// either way, so only their extension VarUint is priced in.
pub(crate) fn match_cost(offs: u32, length: u32, lit_len: u32, last_offs: u32) -> i32 {
    let length_gain = length as i32;
    if offs == last_offs || offs <= MAX_OFFSET_16 {
        let mut cost = COST_TOKEN - length_gain;
        if offs != last_offs {
            cost += COST_OFFS16;
        }
        if lit_len >= MAX_SHORT_LIT_LEN {
            cost += var_uint_cost(lit_len - MAX_SHORT_LIT_LEN) as i32;
        }
        if length >= MAX_SHORT_MATCH_LEN {
            cost += var_uint_cost(length - MAX_SHORT_MATCH_LEN) as i32;
        }
        cost
    } else if length <= MAX_SHORT_MATCH_LEN {
        COST_INFINITE
    } else {
        let mut cost = COST_TOKEN - length_gain + COST_OFFS24;
        if lit_len > 0 {
            // The pending literals need a separate literals-only token.
            cost += COST_TOKEN;
            if lit_len >= MAX_SHORT_LIT_LEN {
                cost += var_uint_cost(lit_len - MAX_SHORT_LIT_LEN) as i32;
            }
        }
        if length >= LONG_MATCH_EXT_BASE {
            cost += var_uint_cost(length - LONG_MATCH_EXT_BASE) as i32;
        }
        cost
    }
}
