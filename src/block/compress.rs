//! The structural encoder.
//!
//! Walks the input behind a hash-chain match finder, keeping a run of
//! pending literals between matches. Every accepted match flushes the
//! pending run and appends one token plus its side-stream parameters;
//! whatever remains at the end of the input is appended to the literal
//! stream without a token.

use crate::block::matcher::Matcher;
use crate::block::vint::append_var_uint;
use crate::block::{
    StreamId, StreamPack, LAST_LONG_OFFSET, LONG_MATCH_EXT_BASE, MAX_OFFSET_16,
    MAX_SHORT_LIT_LEN, MAX_SHORT_MATCH_LEN, MAX_TOKEN_LIT_LEN, MIN_OFFSET, MM_LONG_OFFSETS,
    TOKEN_LAST_OFFSET,
};

pub(crate) struct StructuralEncoder {
    matcher: Matcher,
    pub(crate) pack: StreamPack,
    last_offs: u32,
    /// Insert every skipped position into the hash chain instead of the
    /// first `MIN_OFFSET`. Better ratio, slower on long matches.
    pub(crate) optimal_matching: bool,
}

impl StructuralEncoder {
    pub(crate) fn new() -> Self {
        StructuralEncoder {
            matcher: Matcher::new(),
            pack: StreamPack::default(),
            last_offs: 0,
            optimal_matching: false,
        }
    }

    /// Encodes `src` into the six streams of `self.pack`.
    pub(crate) fn encode(&mut self, src: &[u8]) {
        self.pack.clear();
        self.last_offs = 0;
        if src.is_empty() {
            return;
        }
        self.matcher.reset(src.len());

        // The first MIN_OFFSET bytes cannot be match targets; emit them
        // as pending literals and seed the chain.
        let start = MIN_OFFSET.min(src.len());
        for p in 0..start {
            self.matcher.insert(src, p);
        }

        let mut anchor = 0usize;
        let mut pos = start;
        while pos < src.len() {
            let best = self.matcher.find_best(src, pos, anchor, self.last_offs);
            match best {
                Some(m) if m.cost < 0 => {
                    let match_start = pos - m.back as usize;
                    self.append_match(&src[anchor..match_start], m.offs, m.length);

                    let next = match_start + m.length as usize;
                    let insert_until = if self.optimal_matching {
                        next
                    } else {
                        next.min(pos + MIN_OFFSET)
                    };
                    for p in pos..insert_until {
                        self.matcher.insert(src, p);
                    }
                    pos = next;
                    anchor = next;
                }
                _ => {
                    self.matcher.insert(src, pos);
                    pos += 1;
                }
            }
        }

        // Unconsumed tail bytes carry no token; the decoder drains the
        // literal stream once the tokens run out.
        self.pack[StreamId::Literals].extend_from_slice(&src[anchor..]);
    }

    /// Flushes `lits` and appends the token(s) for a match of
    /// `match_len` at distance `offs`.
    fn append_match(&mut self, lits: &[u8], offs: u32, match_len: u32) {
        self.pack[StreamId::Literals].extend_from_slice(lits);
        let mut lit_len = lits.len() as u32;
        while lit_len > MAX_TOKEN_LIT_LEN {
            self.append_literals_only_token(MAX_TOKEN_LIT_LEN);
            lit_len -= MAX_TOKEN_LIT_LEN;
        }

        if offs == self.last_offs || offs <= MAX_OFFSET_16 {
            let mut token = 0u8;
            if offs == self.last_offs {
                token |= TOKEN_LAST_OFFSET;
            } else {
                let stream = &mut self.pack[StreamId::Offset16];
                stream.extend_from_slice(&(offs as u16).to_le_bytes());
            }
            if match_len >= MAX_SHORT_MATCH_LEN {
                token |= (MAX_SHORT_MATCH_LEN as u8) << 3;
                append_var_uint(
                    &mut self.pack[StreamId::VarMatchLen],
                    match_len - MAX_SHORT_MATCH_LEN,
                );
            } else {
                token |= (match_len as u8) << 3;
            }
            if lit_len >= MAX_SHORT_LIT_LEN {
                token |= MAX_SHORT_LIT_LEN as u8;
                append_var_uint(&mut self.pack[StreamId::VarLitLen], lit_len - MAX_SHORT_LIT_LEN);
            } else {
                token |= lit_len as u8;
            }
            self.pack[StreamId::Tokens].push(token);
        } else {
            // The 24-bit shape has no literal field.
            if lit_len > 0 {
                self.append_literals_only_token(lit_len);
            }
            debug_assert!(match_len >= MM_LONG_OFFSETS);
            if match_len >= LONG_MATCH_EXT_BASE {
                self.pack[StreamId::Tokens].push(LAST_LONG_OFFSET);
                append_var_uint(
                    &mut self.pack[StreamId::VarMatchLen],
                    match_len - LONG_MATCH_EXT_BASE,
                );
            } else {
                self.pack[StreamId::Tokens].push((match_len - MM_LONG_OFFSETS) as u8);
            }
            let stream = &mut self.pack[StreamId::Offset24];
            stream.push(offs as u8);
            stream.push((offs >> 8) as u8);
            stream.push((offs >> 16) as u8);
        }
        self.last_offs = offs;
    }

    /// A short-shape token with match length 0 and the reuse flag set,
    /// so it consumes no offset: literals only.
    fn append_literals_only_token(&mut self, lit_len: u32) {
        let mut token = TOKEN_LAST_OFFSET;
        if lit_len >= MAX_SHORT_LIT_LEN {
            token |= MAX_SHORT_LIT_LEN as u8;
            append_var_uint(&mut self.pack[StreamId::VarLitLen], lit_len - MAX_SHORT_LIT_LEN);
        } else {
            token |= lit_len as u8;
        }
        self.pack[StreamId::Tokens].push(token);
    }
}
