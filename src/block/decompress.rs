//! The structural decoder.
//!
//! Walks the token stream left to right, pulling parameters from the
//! side streams and reconstructing the plaintext through literal copies
//! and overlap-safe match copies.

use crate::block::{
    StreamId, LAST_LONG_OFFSET, MAX_SHORT_LIT_LEN, MAX_SHORT_MATCH_LEN, MM_LONG_OFFSETS,
    STREAM_COUNT, TOKEN_LAST_OFFSET,
};
use crate::error::Error;
use crate::reader::ByteReader;

/// Reconstructs a block from its six streams (in pack order), appending
/// the plaintext to `dst`. `out_limit` bounds the output length so a
/// corrupt token stream cannot balloon the buffer.
pub(crate) fn decompress(
    streams: [&[u8]; STREAM_COUNT],
    dst: &mut Vec<u8>,
    out_limit: usize,
) -> Result<(), Error> {
    let mut tokens = ByteReader::new(streams[StreamId::Tokens as usize]);
    let mut offs16 = ByteReader::new(streams[StreamId::Offset16 as usize]);
    let mut offs24 = ByteReader::new(streams[StreamId::Offset24 as usize]);
    let mut var_lit_len = ByteReader::new(streams[StreamId::VarLitLen as usize]);
    let mut var_match_len = ByteReader::new(streams[StreamId::VarMatchLen as usize]);
    let mut literals = ByteReader::new(streams[StreamId::Literals as usize]);

    let mut last_offs = 0usize;
    while !tokens.is_empty() {
        let token = tokens.fetch8()?;
        if token >= 32 {
            if token & TOKEN_LAST_OFFSET == 0 {
                last_offs = offs16.fetch16_le()? as usize;
            }
            let mut lit_len = (token & 0x07) as usize;
            if lit_len == MAX_SHORT_LIT_LEN as usize {
                lit_len += var_lit_len.fetch_var_uint()? as usize;
            }
            if lit_len > 0 {
                dst.extend_from_slice(literals.fetch_sequence(lit_len)?);
            }
            let mut match_len = ((token >> 3) & 0x0f) as usize;
            if match_len == MAX_SHORT_MATCH_LEN as usize {
                match_len += var_match_len.fetch_var_uint()? as usize;
            }
            copy_match(dst, last_offs, match_len)?;
            if dst.len() > out_limit {
                return Err(Error::CorruptedBitStream);
            }
        } else {
            last_offs = offs24.fetch24_le()? as usize;
            let match_len = if token < LAST_LONG_OFFSET {
                token as usize + MM_LONG_OFFSETS as usize
            } else {
                (MM_LONG_OFFSETS + LAST_LONG_OFFSET as u32) as usize
                    + var_match_len.fetch_var_uint()? as usize
            };
            copy_match(dst, last_offs, match_len)?;
            if dst.len() > out_limit {
                return Err(Error::CorruptedBitStream);
            }
        }
    }

    // Tail literals carry no token.
    let tail = literals.remaining();
    if tail > 0 {
        dst.extend_from_slice(literals.fetch_sequence(tail)?);
    }
    if dst.len() > out_limit {
        return Err(Error::CorruptedBitStream);
    }
    Ok(())
}

/// Appends `len` bytes read `offs` positions behind the end of `dst`.
///
/// A match may overlap its own destination; copying in chunks of at
/// most `offs` bytes keeps the read cursor trailing the write cursor,
/// which replicates the run exactly as the encoder measured it.
#[inline]
fn copy_match(dst: &mut Vec<u8>, offs: usize, len: usize) -> Result<(), Error> {
    if len == 0 {
        // A literals-only token; nothing to copy.
        return Ok(());
    }
    if offs == 0 || offs > dst.len() {
        return Err(Error::CorruptedBitStream);
    }
    let start = dst.len() - offs;
    if offs == 1 {
        let b = dst[start];
        dst.resize(dst.len() + len, b);
    } else if len <= offs {
        dst.extend_from_within(start..start + len);
    } else {
        // Everything from `start` on is periodic in `offs`, so the
        // copyable span doubles with each pass.
        let mut remaining = len;
        while remaining > 0 {
            let chunk = remaining.min(dst.len() - start);
            dst.extend_from_within(start..start + chunk);
            remaining -= chunk;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::compress::StructuralEncoder;
    use crate::block::StreamPack;

    fn decode_pack(pack: &StreamPack) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        let streams: [&[u8]; STREAM_COUNT] =
            core::array::from_fn(|i| pack.get(StreamId::ALL[i]));
        decompress(streams, &mut out, usize::MAX)?;
        Ok(out)
    }

    fn inverse(data: &[u8]) {
        let mut enc = StructuralEncoder::new();
        enc.encode(data);
        assert_eq!(decode_pack(&enc.pack).unwrap(), data);
    }

    #[test]
    fn all_literal_inputs() {
        inverse(b"");
        inverse(b"x");
        inverse(b"no repeats here!");
        inverse(&[0xAB; 32]); // exactly MIN_OFFSET, run too close to match
    }

    #[test]
    fn repeating_inputs() {
        inverse(&[b'a'; 48]);
        inverse(&b"The quick brown fox jumps over the lazy dog ".repeat(10));
        inverse(&[0u8; 100_000]);
        let mut mixed = Vec::new();
        for i in 0..50_000u32 {
            mixed.push((i % 10) as u8 + b'0');
            if i % 1000 == 0 {
                mixed.extend_from_slice(b"an uncommonly long separator string");
            }
        }
        inverse(&mixed);
    }

    #[test]
    fn noisy_input() {
        let noise: Vec<u8> = (0..10_000u32)
            .map(|i| (i as u8).wrapping_mul(0xA).wrapping_add(33) ^ 0xA2)
            .collect();
        inverse(&noise);
    }

    #[test]
    fn overlapping_copy_offset_one() {
        // token: reuse-flag shape is not possible with last_offs == 0,
        // so feed the copy helper directly.
        let mut dst = b"abcX".to_vec();
        copy_match(&mut dst, 1, 100).unwrap();
        assert_eq!(dst.len(), 104);
        assert!(dst[4..].iter().all(|&b| b == b'X'));
    }

    #[test]
    fn overlapping_copy_offset_two() {
        let mut dst = b"AB".to_vec();
        copy_match(&mut dst, 2, 8).unwrap();
        assert_eq!(&dst[..], b"ABABABABAB");
    }

    /// Deterministic byte soup for match-shape tests.
    fn lcg_bytes(len: usize, mut state: u32) -> Vec<u8> {
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                (state >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn distant_match_takes_the_24_bit_path() {
        let mut data = lcg_bytes(70_000, 0xfeed);
        let head = data[..100].to_vec();
        data.extend_from_slice(&head);

        let mut enc = StructuralEncoder::new();
        enc.encode(&data);
        assert!(
            !enc.pack.get(StreamId::Offset24).is_empty(),
            "the 70000-distance repeat should use a 24-bit offset"
        );
        assert_eq!(decode_pack(&enc.pack).unwrap(), data);
    }

    #[test]
    fn repeated_distance_reuses_the_last_offset() {
        // Five copies of the same 40-byte unit, each followed by 5
        // unique bytes: every match sits at distance 45, so only the
        // first one should spend offset bytes.
        let unit: Vec<u8> = b"0123456789".repeat(4);
        let mut data = Vec::new();
        for k in 0..5u8 {
            data.extend_from_slice(&unit);
            data.extend_from_slice(&[200 + k, 210 + k, 220 + k, 230 + k, 240 + k]);
        }

        let mut enc = StructuralEncoder::new();
        enc.encode(&data);
        assert_eq!(enc.pack.get(StreamId::Offset16).len(), 2);
        assert!(enc.pack.get(StreamId::Offset24).is_empty());
        assert_eq!(decode_pack(&enc.pack).unwrap(), data);
    }

    #[test]
    fn bad_offsets_are_rejected() {
        let mut dst = b"abc".to_vec();
        assert_eq!(copy_match(&mut dst, 0, 5), Err(Error::CorruptedBitStream));
        assert_eq!(copy_match(&mut dst, 4, 5), Err(Error::CorruptedBitStream));
    }

    #[test]
    fn truncated_literal_stream_errors() {
        // One token asking for 3 literals, but only 2 in the stream.
        let tokens = [0b1000_0011u8]; // reuse flag, match 0, lit 3
        let lits = b"ab";
        let streams: [&[u8]; STREAM_COUNT] = [&tokens, &[], &[], &[], &[], lits];
        let mut out = Vec::new();
        assert_eq!(
            decompress(streams, &mut out, usize::MAX),
            Err(Error::OutOfInputData)
        );
    }
}
