//! Scalar byte-granular rANS back-end.
//!
//! A single state walks the input right to left; the decoder walks the
//! bit stream left to right, so renormalization words are laid out in
//! reverse emission order behind the little-endian 32-bit final state.

use crate::error::Error;
use crate::rans::table::{append_table, build_dense, byte_freqs, decode_table, encode_entries};
use crate::rans::{
    decode_update, enc_freq, enc_start, encode_update, entry_symbol, needs_renorm, AnsScratch,
    DenseTable, ANS_L, ANS_M,
};
use crate::reader::ByteReader;

/// Appends the encoded form of `src` (bit stream, then table) to `dst`.
pub(crate) fn encode(src: &[u8], dst: &mut Vec<u8>, scratch: &mut AnsScratch) {
    let freqs = byte_freqs(src);
    let mut entries = [0u32; 256];
    encode_entries(&freqs, &mut entries);

    let words = &mut scratch.words;
    words.clear();
    let mut state = ANS_L;
    for &b in src.iter().rev() {
        let e = entries[b as usize];
        let freq = enc_freq(e);
        if needs_renorm(state, freq) {
            words.push(state as u16);
            state >>= 16;
        }
        state = encode_update(state, freq, enc_start(e));
    }

    dst.extend_from_slice(&state.to_le_bytes());
    for &w in words.iter().rev() {
        dst.extend_from_slice(&w.to_le_bytes());
    }
    append_table(dst, &freqs);
}

/// Decodes `len` bytes from the block `src` (bit stream followed by its
/// table), appending them to `dst`.
pub(crate) fn decode(
    src: &[u8],
    len: usize,
    dst: &mut Vec<u8>,
    dense: &mut DenseTable,
) -> Result<(), Error> {
    let mut freqs = [0u16; 256];
    let table_len = decode_table(src, &mut freqs)?;
    build_dense(&freqs, dense)?;

    let mut bits = ByteReader::new(&src[..src.len() - table_len]);
    let mut state = bits.fetch32_le()?;
    dst.reserve(len);
    for _ in 0..len {
        let entry = dense[(state & (ANS_M - 1)) as usize];
        state = decode_update(state, entry);
        dst.push(entry_symbol(entry));
        if state < ANS_L {
            state = (state << 16) | u32::from(bits.fetch16_le()?);
        }
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
        let mut scratch = AnsScratch::default();
        let mut wire = Vec::new();
        encode(data, &mut wire, &mut scratch);

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
        roundtrip(b"x");
        roundtrip(b"hello entropy coding");
        roundtrip(&[b'a'; 48]);
        roundtrip(&(0..=255u8).collect::<Vec<_>>());
        let noisy: Vec<u8> = (0..65_537u32)
            .map(|i| (i as u8).wrapping_mul(0xA5).wrapping_add((i >> 9) as u8))
            .collect();
        roundtrip(&noisy);
    }

    #[test]
    fn skewed_input_compresses() {
        let mut data = vec![b'e'; 10_000];
        for i in (0..data.len()).step_by(97) {
            data[i] = b'q';
        }
        let mut wire = Vec::new();
        encode(&data, &mut wire, &mut AnsScratch::default());
        assert!(wire.len() < data.len() / 4);
    }

    #[test]
    fn truncated_stream_errors() {
        let mut dense: Box<DenseTable> = vec![0u32; crate::rans::DENSE_TABLE_SIZE]
            .into_boxed_slice()
            .try_into()
            .unwrap();
        let mut out = Vec::new();
        assert_eq!(
            decode(&[], 10, &mut out, &mut dense),
            Err(Error::WrongSourceSize)
        );

        let data = b"some reasonably long input string";
        let mut wire = Vec::new();
        encode(data, &mut wire, &mut AnsScratch::default());
        let mut freqs = [0u16; 256];
        let table_len = decode_table(&wire, &mut freqs).unwrap();
        // Keep the table but cut the bit stream below the 4-byte state.
        let mut corrupt = wire[..3].to_vec();
        corrupt.extend_from_slice(&wire[wire.len() - table_len..]);
        assert_eq!(
            decode(&corrupt, data.len(), &mut out, &mut dense),
            Err(Error::OutOfInputData)
        );
    }
}
