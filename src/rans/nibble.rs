//! Scalar nibble-granular rANS back-end.
//!
//! Each source byte is split into two 4-bit symbols over a 16-symbol
//! table. The flat nibble stream is encoded right to left, so the
//! decoder recovers the low nibble first and recombines
//! `(hi << 4) | lo` while walking forward.

use crate::error::Error;
use crate::rans::table::{append_table, build_dense, decode_table, encode_entries, nibble_freqs};
use crate::rans::{
    decode_update, enc_freq, enc_start, encode_update, entry_symbol, needs_renorm, AnsScratch,
    DenseTable, ANS_L, ANS_M,
};
use crate::reader::ByteReader;

/// Appends the encoded form of `src` (bit stream, then table) to `dst`.
pub(crate) fn encode(src: &[u8], dst: &mut Vec<u8>, scratch: &mut AnsScratch) {
    let freqs = nibble_freqs(src);
    let mut entries = [0u32; 16];
    encode_entries(&freqs, &mut entries);

    let words = &mut scratch.words;
    words.clear();
    let mut state = ANS_L;
    let mut put = |state: &mut u32, nib: u8| {
        let e = entries[nib as usize];
        let freq = enc_freq(e);
        if needs_renorm(*state, freq) {
            words.push(*state as u16);
            *state >>= 16;
        }
        *state = encode_update(*state, freq, enc_start(e));
    };
    for &b in src.iter().rev() {
        put(&mut state, b >> 4);
        put(&mut state, b & 0x0f);
    }

    dst.extend_from_slice(&state.to_le_bytes());
    for &w in words.iter().rev() {
        dst.extend_from_slice(&w.to_le_bytes());
    }
    append_table(dst, &freqs);
}

/// Decodes `len` bytes from the block `src`, appending them to `dst`.
pub(crate) fn decode(
    src: &[u8],
    len: usize,
    dst: &mut Vec<u8>,
    dense: &mut DenseTable,
) -> Result<(), Error> {
    let mut freqs = [0u16; 16];
    let table_len = decode_table(src, &mut freqs)?;
    build_dense(&freqs, dense)?;

    let mut bits = ByteReader::new(&src[..src.len() - table_len]);
    let mut state = bits.fetch32_le()?;
    let mut step = |state: &mut u32, bits: &mut ByteReader| -> Result<u8, Error> {
        let entry = dense[(*state & (ANS_M - 1)) as usize];
        *state = decode_update(*state, entry);
        if *state < ANS_L {
            *state = (*state << 16) | u32::from(bits.fetch16_le()?);
        }
        Ok(entry_symbol(entry))
    };
    dst.reserve(len);
    for _ in 0..len {
        let lo = step(&mut state, &mut bits)?;
        let hi = step(&mut state, &mut bits)?;
        dst.push((hi << 4) | lo);
    }
    if state != ANS_L {
        return Err(Error::CorruptedBitStream);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let mut wire = Vec::new();
        encode(data, &mut wire, &mut AnsScratch::default());
        let mut dense: Box<DenseTable> = vec![0u32; crate::rans::DENSE_TABLE_SIZE]
            .into_boxed_slice()
            .try_into()
            .unwrap();
        let mut out = Vec::new();
        decode(&wire, data.len(), &mut out, &mut dense).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn roundtrips() {
        roundtrip(b"");
        roundtrip(b"\x00");
        roundtrip(b"nibbles have sixteen symbols at most");
        roundtrip(&[0x11; 300]);
        roundtrip(&(0..=255u8).cycle().take(5000).collect::<Vec<_>>());
    }

    #[test]
    fn ascii_text_compresses() {
        // ASCII keeps the high nibbles in a narrow range, which is the
        // case this back-end exists for.
        let data = b"the quick brown fox jumps over the lazy dog ".repeat(40);
        let mut wire = Vec::new();
        encode(&data, &mut wire, &mut AnsScratch::default());
        assert!(wire.len() < data.len());
    }
}
