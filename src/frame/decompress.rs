//! Frame decoding.
//!
//! The command stream is parsed from the last byte of the frame
//! backward while data bytes are consumed from the front; see
//! [`crate::frame`] for the layout.

use crate::block::{decompress as block_decompress, STREAM_COUNT};
use crate::error::Error;
use crate::frame::{
    read_control_var_uint, EntropyMode, CMD_COPY_RAW, CMD_DECODE_ANS1, CMD_DECODE_ANS32,
    CMD_DECODE_ANS_NIBBLE, CMD_DECODE_IGUANA, CMD_MASK, LAST_COMMAND_MARKER,
};
use crate::rans::{ans1, ans32, nibble, DenseTable, DENSE_TABLE_SIZE};

/// Where a block stream lives after materialization: a range of the
/// frame itself, or the decoder-owned buffer it was entropy-decoded
/// into.
#[derive(Clone, Copy)]
enum StreamLoc {
    Raw(usize, usize),
    Owned,
}

/// A reusable frame decoder. Buffers keep their capacity between
/// calls; instances are not safe for concurrent use.
pub struct Decoder {
    stream_bufs: [Vec<u8>; STREAM_COUNT],
    dense: Box<DenseTable>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Decoder {
            stream_bufs: Default::default(),
            dense: vec![0u32; DENSE_TABLE_SIZE]
                .into_boxed_slice()
                .try_into()
                .expect("dense table size"),
        }
    }

    /// Decompresses a frame into a fresh buffer.
    pub fn decompress(&mut self, src: &[u8]) -> Result<Vec<u8>, Error> {
        let mut dst = Vec::new();
        self.decompress_to(&mut dst, src)?;
        Ok(dst)
    }

    /// Decompresses a frame, appending to `dst`. On error the appended
    /// bytes are undefined and must be discarded by the caller.
    pub fn decompress_to(&mut self, dst: &mut Vec<u8>, src: &[u8]) -> Result<(), Error> {
        let mut cursor = src.len();
        let declared = read_control_var_uint(src, &mut cursor)?;
        if declared == 0 {
            return Ok(());
        }
        let total = usize::try_from(declared)
            .ok()
            .filter(|&t| t <= isize::MAX as usize)
            .ok_or(Error::InsufficientTargetCapacity)?;
        let base = dst.len();
        dst.try_reserve(total)
            .map_err(|_| Error::InsufficientTargetCapacity)?;

        let mut data_pos = 0usize;
        loop {
            if cursor == 0 {
                // The command stream ran out before its marked command.
                return Err(Error::OutOfInputData);
            }
            cursor -= 1;
            let cmd = src[cursor];
            match cmd & CMD_MASK {
                CMD_COPY_RAW => {
                    let n = read_len(src, &mut cursor)?;
                    if n > base + total - dst.len() {
                        return Err(Error::CorruptedBitStream);
                    }
                    let bytes = take_data(src, &mut data_pos, n)?;
                    dst.extend_from_slice(bytes);
                }
                CMD_DECODE_IGUANA => {
                    self.decode_iguana_block(dst, src, &mut cursor, &mut data_pos, base + total)?
                }
                id @ (CMD_DECODE_ANS32 | CMD_DECODE_ANS1 | CMD_DECODE_ANS_NIBBLE) => {
                    let ulen = read_len(src, &mut cursor)?;
                    let clen = read_len(src, &mut cursor)?;
                    if ulen > base + total - dst.len() {
                        return Err(Error::CorruptedBitStream);
                    }
                    let block = take_data(src, &mut data_pos, clen)?;
                    match id {
                        CMD_DECODE_ANS32 => ans32::decode(block, ulen, dst, &mut self.dense)?,
                        CMD_DECODE_ANS1 => ans1::decode(block, ulen, dst, &mut self.dense)?,
                        _ => nibble::decode(block, ulen, dst, &mut self.dense)?,
                    }
                }
                other => return Err(Error::UnrecognizedCommand(other)),
            }
            if cmd & LAST_COMMAND_MARKER != 0 {
                break;
            }
        }

        if dst.len() - base != total {
            return Err(Error::CorruptedBitStream);
        }
        Ok(())
    }

    fn decode_iguana_block(
        &mut self,
        dst: &mut Vec<u8>,
        src: &[u8],
        cursor: &mut usize,
        data_pos: &mut usize,
        out_limit: usize,
    ) -> Result<(), Error> {
        let hdr = read_control_var_uint(src, cursor)?;
        if hdr >> (4 * STREAM_COUNT) != 0 {
            return Err(Error::CorruptedBitStream);
        }
        // A well-formed stream never outgrows the output it describes
        // by more than the VarUint expansion factor.
        let stream_cap = (out_limit - dst.len()).saturating_mul(4) + 64;

        let Decoder { stream_bufs, dense } = self;
        let mut locs = [StreamLoc::Owned; STREAM_COUNT];
        for i in 0..STREAM_COUNT {
            let ulen = read_len(src, cursor)?;
            let mode = EntropyMode::from_nibble(((hdr >> (4 * i)) & 0x0f) as u8)
                .ok_or(Error::CorruptedBitStream)?;
            if mode == EntropyMode::None {
                let start = *data_pos;
                take_data(src, data_pos, ulen)?;
                locs[i] = StreamLoc::Raw(start, ulen);
            } else {
                if ulen > stream_cap {
                    return Err(Error::CorruptedBitStream);
                }
                let clen = read_len(src, cursor)?;
                let block = take_data(src, data_pos, clen)?;
                let buf = &mut stream_bufs[i];
                buf.clear();
                match mode {
                    EntropyMode::Ans32 => ans32::decode(block, ulen, buf, dense)?,
                    EntropyMode::Ans1 => ans1::decode(block, ulen, buf, dense)?,
                    EntropyMode::AnsNibble => nibble::decode(block, ulen, buf, dense)?,
                    EntropyMode::None => unreachable!(),
                }
                locs[i] = StreamLoc::Owned;
            }
        }

        let streams: [&[u8]; STREAM_COUNT] = core::array::from_fn(|i| match locs[i] {
            StreamLoc::Raw(start, len) => &src[start..start + len],
            StreamLoc::Owned => stream_bufs[i].as_slice(),
        });
        block_decompress::decompress(streams, dst, out_limit)
    }
}

/// Reads the trailing size field of a frame without decoding it.
pub fn decompressed_size(src: &[u8]) -> Result<usize, Error> {
    let mut cursor = src.len();
    let declared = read_control_var_uint(src, &mut cursor)?;
    usize::try_from(declared)
        .ok()
        .filter(|&t| t <= isize::MAX as usize)
        .ok_or(Error::InsufficientTargetCapacity)
}

fn read_len(src: &[u8], cursor: &mut usize) -> Result<usize, Error> {
    let v = read_control_var_uint(src, cursor)?;
    usize::try_from(v).map_err(|_| Error::CorruptedBitStream)
}

fn take_data<'a>(src: &'a [u8], data_pos: &mut usize, n: usize) -> Result<&'a [u8], Error> {
    let end = data_pos.checked_add(n).ok_or(Error::OutOfInputData)?;
    let bytes = src.get(*data_pos..end).ok_or(Error::OutOfInputData)?;
    *data_pos = end;
    Ok(bytes)
}
