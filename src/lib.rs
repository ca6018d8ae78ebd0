/*! Pure Rust implementation of the Iguana compression codec.

Iguana is a Lizard-family LZ77 codec: the structural encoder splits its
output into six parallel byte streams (tokens, two offset widths, two
length streams, literals), and each stream is further squeezed by a
pluggable rANS entropy coder when that pays off. Frames are
self-describing; decompression needs no parameters.

# Examples
```
let input: &[u8] = b"Sphinx of black quartz, judge my vow. Sphinx of black quartz!";
let compressed = iguana::compress(input).unwrap();
let restored = iguana::decompress(&compressed).unwrap();
assert_eq!(restored, input);
```

Reusable [`Encoder`] and [`Decoder`] instances retain their internal
buffers across calls; prefer them over the free functions in hot loops.
Instances are not safe for concurrent use, but distinct instances share
nothing.
*/

mod block;
mod error;
mod frame;
mod rans;
mod reader;

pub use error::Error;
pub use frame::{
    decompressed_size, Decoder, Encoder, EncodingMode, EncodingRequest, EntropyMode,
    DEFAULT_ANS_THRESHOLD,
};

/// Compresses `src` into a fresh frame with the default threshold.
pub fn compress(src: &[u8]) -> Result<Vec<u8>, Error> {
    compress_with(src, DEFAULT_ANS_THRESHOLD)
}

/// Compresses `src` into a fresh frame; `threshold` gates the entropy
/// coder per stream.
pub fn compress_with(src: &[u8], threshold: f32) -> Result<Vec<u8>, Error> {
    let mut dst = Vec::with_capacity(src.len() / 2 + 64);
    Encoder::new().compress_into(src, &mut dst, threshold)?;
    Ok(dst)
}

/// Decompresses a frame into a fresh buffer.
pub fn decompress(src: &[u8]) -> Result<Vec<u8>, Error> {
    Decoder::new().decompress(src)
}
