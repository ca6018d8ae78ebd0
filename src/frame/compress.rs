//! Frame encoding.
//!
//! The encoder owns every growable buffer it needs (structural streams,
//! match-finder arena, entropy scratch) and resets them at the top of
//! each call, so a long-lived instance stops allocating once warm.

use log::{debug, trace};

use crate::block::compress::StructuralEncoder;
use crate::block::{StreamId, STREAM_COUNT};
use crate::error::Error;
use crate::frame::{
    append_control_var_uint, control_var_uint_cost, EncodingMode, EncodingRequest, EntropyMode,
    CMD_COPY_RAW, CMD_DECODE_IGUANA, LAST_COMMAND_MARKER,
};
use crate::rans::{ans1, ans32, nibble, AnsScratch};

/// A reusable frame encoder. Not safe for concurrent use; distinct
/// instances share nothing.
pub struct Encoder {
    block: StructuralEncoder,
    scratch: AnsScratch,
    /// Control bytes in append order; written to the frame reversed.
    ctrl: Vec<u8>,
    /// Offset in `ctrl` of the most recent command byte.
    last_cmd_offset: usize,
    /// Entropy-coded candidate for the stream under consideration.
    ans_buf: Vec<u8>,
    /// Staged data bytes of the Iguana block under construction.
    stage: Vec<u8>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Encoder {
            block: StructuralEncoder::new(),
            scratch: AnsScratch::default(),
            ctrl: Vec::new(),
            last_cmd_offset: 0,
            ans_buf: Vec::new(),
            stage: Vec::new(),
        }
    }

    /// Inserts every position covered by a match into the hash chain
    /// instead of the leading 32. Better ratio on some inputs, slower
    /// on long matches.
    pub fn set_optimal_matching(&mut self, enabled: bool) {
        self.block.optimal_matching = enabled;
    }

    /// Appends one Iguana-encoded, ANS32-entropy-coded frame for `src`
    /// to `dst`. `threshold` gates the entropy coder per stream.
    pub fn compress_into(
        &mut self,
        src: &[u8],
        dst: &mut Vec<u8>,
        threshold: f32,
    ) -> Result<(), Error> {
        self.compress_composite(dst, &[EncodingRequest::iguana(src, threshold)])
    }

    /// Appends one frame holding every request's payload in order. The
    /// leading control value is the sum of all payload sizes.
    pub fn compress_composite(
        &mut self,
        dst: &mut Vec<u8>,
        requests: &[EncodingRequest],
    ) -> Result<(), Error> {
        self.ctrl.clear();
        let total: u64 = requests.iter().map(|r| r.src.len() as u64).sum();
        append_control_var_uint(&mut self.ctrl, total);

        for req in requests {
            if req.src.is_empty() {
                continue;
            }
            match req.encoding {
                EncodingMode::Raw => self.encode_stored(dst, req),
                EncodingMode::Iguana => self.encode_iguana(dst, req),
            }
        }
        if total > 0 {
            self.ctrl[self.last_cmd_offset] |= LAST_COMMAND_MARKER;
        }
        dst.extend(self.ctrl.iter().rev());
        Ok(())
    }

    fn push_command(&mut self, cmd: u8) {
        self.last_cmd_offset = self.ctrl.len();
        self.ctrl.push(cmd);
    }

    /// Emits `src` as a standalone block: entropy-coded wholesale when
    /// a back-end beats the threshold, raw otherwise.
    fn encode_stored(&mut self, dst: &mut Vec<u8>, req: &EncodingRequest) {
        let n = req.src.len();
        let (modes, mode_count) = candidate_modes(req);
        for &mode in &modes[..mode_count] {
            self.ans_buf.clear();
            entropy_encode(mode, req.src, &mut self.ans_buf, &mut self.scratch);
            if accepts(self.ans_buf.len(), n, req.threshold) {
                self.push_command(mode.command());
                append_control_var_uint(&mut self.ctrl, n as u64);
                append_control_var_uint(&mut self.ctrl, self.ans_buf.len() as u64);
                dst.extend_from_slice(&self.ans_buf);
                return;
            }
            trace!(
                "{mode} on {n}-byte payload yields {} bytes, over threshold {}",
                self.ans_buf.len(),
                req.threshold
            );
        }
        self.push_command(CMD_COPY_RAW);
        append_control_var_uint(&mut self.ctrl, n as u64);
        dst.extend_from_slice(req.src);
    }

    /// Runs the structural encoder and emits its six streams, each
    /// entropy-coded when profitable. Falls back to a raw copy when the
    /// whole block cannot beat one.
    fn encode_iguana(&mut self, dst: &mut Vec<u8>, req: &EncodingRequest) {
        self.block.encode(req.src);

        let pack = &self.block.pack;
        let stage = &mut self.stage;
        let ans_buf = &mut self.ans_buf;
        let scratch = &mut self.scratch;
        stage.clear();

        let (modes, mode_count) = candidate_modes(req);
        let mut hdr: u64 = 0;
        let mut ulens = [0usize; STREAM_COUNT];
        let mut clens: [Option<usize>; STREAM_COUNT] = [None; STREAM_COUNT];
        for (i, &id) in StreamId::ALL.iter().enumerate() {
            let stream = pack.get(id);
            ulens[i] = stream.len();
            let mut chosen = EntropyMode::None;
            if !stream.is_empty() {
                for &mode in &modes[..mode_count] {
                    ans_buf.clear();
                    entropy_encode(mode, stream, ans_buf, scratch);
                    if accepts(ans_buf.len(), stream.len(), req.threshold) {
                        chosen = mode;
                        break;
                    }
                    trace!(
                        "stream {i}: {mode} yields {} of {} bytes, keeping raw",
                        ans_buf.len(),
                        stream.len()
                    );
                }
            }
            if chosen == EntropyMode::None {
                stage.extend_from_slice(stream);
            } else {
                hdr |= u64::from(chosen as u8) << (4 * i);
                clens[i] = Some(ans_buf.len());
                stage.extend_from_slice(ans_buf);
            }
        }

        // Container bytes this block will cost against a plain copy.
        let mut iguana_total = stage.len() + 1 + control_var_uint_cost(hdr);
        for i in 0..STREAM_COUNT {
            iguana_total += control_var_uint_cost(ulens[i] as u64);
            if let Some(clen) = clens[i] {
                iguana_total += control_var_uint_cost(clen as u64);
            }
        }
        let raw_total = req.src.len() + 1 + control_var_uint_cost(req.src.len() as u64);
        if iguana_total >= raw_total {
            debug!(
                "iguana block of {iguana_total} bytes loses to raw copy of {raw_total}; storing"
            );
            self.push_command(CMD_COPY_RAW);
            append_control_var_uint(&mut self.ctrl, req.src.len() as u64);
            dst.extend_from_slice(req.src);
            return;
        }

        self.push_command(CMD_DECODE_IGUANA);
        append_control_var_uint(&mut self.ctrl, hdr);
        for i in 0..STREAM_COUNT {
            append_control_var_uint(&mut self.ctrl, ulens[i] as u64);
            if let Some(clen) = clens[i] {
                append_control_var_uint(&mut self.ctrl, clen as u64);
            }
        }
        dst.extend_from_slice(&self.stage);
    }
}

/// Back-ends to try for a request: the primary one, then, with the
/// secondary resolver, the remaining ones in fixed order.
fn candidate_modes(req: &EncodingRequest) -> ([EntropyMode; 4], usize) {
    let mut modes = [EntropyMode::None; 4];
    let mut count = 0;
    if req.entropy != EntropyMode::None {
        modes[0] = req.entropy;
        count = 1;
        if req.enable_secondary_resolver {
            for mode in [EntropyMode::Ans32, EntropyMode::Ans1, EntropyMode::AnsNibble] {
                if mode != req.entropy {
                    modes[count] = mode;
                    count += 1;
                }
            }
        }
    }
    (modes, count)
}

fn entropy_encode(mode: EntropyMode, src: &[u8], dst: &mut Vec<u8>, scratch: &mut AnsScratch) {
    match mode {
        EntropyMode::Ans32 => ans32::encode(src, dst, scratch),
        EntropyMode::Ans1 => ans1::encode(src, dst, scratch),
        EntropyMode::AnsNibble => nibble::encode(src, dst, scratch),
        EntropyMode::None => unreachable!("entropy dispatch on None"),
    }
}

/// A stream stays raw once `compressed / uncompressed` reaches the
/// threshold.
#[inline]
fn accepts(compressed: usize, uncompressed: usize, threshold: f32) -> bool {
    (compressed as f64) < f64::from(threshold) * uncompressed as f64
}
