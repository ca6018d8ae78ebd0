//! 32-way interleaved byte-granular rANS back-end.
//!
//! The input is cut into 32-byte chunks; lane `k` codes the byte at
//! offset `k` of every chunk. Lanes 0..16 renormalize into a forward
//! buffer (big-endian words), lanes 16..32 into a reverse buffer
//! (little-endian words). The wire is the bytewise-reversed forward
//! buffer followed by the reverse buffer, so the decoder consumes the
//! two halves from the opposite ends of the block toward the middle.

use crate::error::Error;
use crate::rans::table::{append_table, build_dense, byte_freqs, decode_table, encode_entries};
use crate::rans::{
    decode_update, enc_freq, enc_start, encode_update, entry_symbol, needs_renorm, AnsScratch,
    DenseTable, ANS_L, ANS_M,
};

const LANES: usize = 32;
const HALF: usize = 16;
/// Flushed lane states on each side of the block.
const STATE_BYTES: usize = HALF * 4;

/// Appends the encoded form of `src` (bit stream, then table) to `dst`.
pub(crate) fn encode(src: &[u8], dst: &mut Vec<u8>, scratch: &mut AnsScratch) {
    let freqs = byte_freqs(src);
    let mut entries = [0u32; 256];
    encode_entries(&freqs, &mut entries);

    let fwd = &mut scratch.fwd;
    let rev = &mut scratch.rev;
    fwd.clear();
    rev.clear();
    let mut states = [ANS_L; LANES];

    let encode_chunk = |states: &mut [u32; LANES],
                            fwd: &mut Vec<u8>,
                            rev: &mut Vec<u8>,
                            base: usize,
                            avail: usize| {
        for lane in (0..HALF).rev() {
            if lane < avail {
                let e = entries[src[base + lane] as usize];
                let freq = enc_freq(e);
                if needs_renorm(states[lane], freq) {
                    fwd.extend_from_slice(&(states[lane] as u16).to_be_bytes());
                    states[lane] >>= 16;
                }
                states[lane] = encode_update(states[lane], freq, enc_start(e));
            }
        }
        for lane in (HALF..LANES).rev() {
            if lane < avail {
                let e = entries[src[base + lane] as usize];
                let freq = enc_freq(e);
                if needs_renorm(states[lane], freq) {
                    rev.extend_from_slice(&(states[lane] as u16).to_le_bytes());
                    states[lane] >>= 16;
                }
                states[lane] = encode_update(states[lane], freq, enc_start(e));
            }
        }
    };

    // The final partial chunk first, then full chunks right to left.
    let mut base = src.len() - src.len() % LANES;
    if base < src.len() {
        encode_chunk(&mut states, fwd, rev, base, src.len() - base);
    }
    while base > 0 {
        base -= LANES;
        encode_chunk(&mut states, fwd, rev, base, LANES);
    }

    for lane in (0..HALF).rev() {
        fwd.extend_from_slice(&states[lane].to_be_bytes());
    }
    for lane in (HALF..LANES).rev() {
        rev.extend_from_slice(&states[lane].to_le_bytes());
    }

    dst.extend(fwd.iter().rev());
    dst.extend_from_slice(rev);
    append_table(dst, &freqs);
}

/// Decodes `len` bytes from the block `src`, appending them to `dst`.
pub(crate) fn decode(
    src: &[u8],
    len: usize,
    dst: &mut Vec<u8>,
    dense: &mut DenseTable,
) -> Result<(), Error> {
    let mut freqs = [0u16; 256];
    let table_len = decode_table(src, &mut freqs)?;
    build_dense(&freqs, dense)?;

    let bits = &src[..src.len() - table_len];
    if bits.len() < 2 * STATE_BYTES {
        return Err(Error::OutOfInputData);
    }

    let mut states = [0u32; LANES];
    let mut fwd_pos = 0;
    let mut rev_pos = bits.len();
    for state in states.iter_mut().take(HALF) {
        *state = u32::from_le_bytes(bits[fwd_pos..fwd_pos + 4].try_into().unwrap());
        fwd_pos += 4;
    }
    for state in states.iter_mut().skip(HALF) {
        rev_pos -= 4;
        *state = u32::from_le_bytes(bits[rev_pos..rev_pos + 4].try_into().unwrap());
    }

    dst.reserve(len);
    let mut written = 0;
    while written < len {
        let batch = (len - written).min(LANES);
        for lane in 0..batch.min(HALF) {
            let entry = dense[(states[lane] & (ANS_M - 1)) as usize];
            states[lane] = decode_update(states[lane], entry);
            dst.push(entry_symbol(entry));
            if states[lane] < ANS_L {
                if fwd_pos + 2 > rev_pos {
                    return Err(Error::OutOfInputData);
                }
                let w = u16::from_le_bytes(bits[fwd_pos..fwd_pos + 2].try_into().unwrap());
                fwd_pos += 2;
                states[lane] = (states[lane] << 16) | u32::from(w);
            }
        }
        for lane in HALF..batch {
            let entry = dense[(states[lane] & (ANS_M - 1)) as usize];
            states[lane] = decode_update(states[lane], entry);
            dst.push(entry_symbol(entry));
            if states[lane] < ANS_L {
                if rev_pos < fwd_pos + 2 {
                    return Err(Error::OutOfInputData);
                }
                rev_pos -= 2;
                let w = u16::from_le_bytes(bits[rev_pos..rev_pos + 2].try_into().unwrap());
                states[lane] = (states[lane] << 16) | u32::from(w);
            }
        }
        written += batch;
    }

    if states.iter().any(|&s| s != ANS_L) {
        return Err(Error::CorruptedBitStream);
    }
    Ok(())
}
