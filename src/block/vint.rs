//! Base-254 variable-length unsigned integers.
//!
//! The two highest byte values act as width markers: a leading `254`
//! announces two digit bytes, a leading `255` announces three. Digits
//! are little-endian base-254, so the representable range is
//! `0 ..= 254^3 - 1`.

use crate::error::Error;

/// Largest value representable as a VarUint.
pub const VAR_UINT_MAX: u32 = 254 * 254 * 254 - 1;

/// Appends `v` to `output`.
///
/// # Panics
/// Panics if `v` exceeds [`VAR_UINT_MAX`]; the encoder keeps its length
/// fields in range, so an overflow here is a programmer bug.
#[inline]
pub fn append_var_uint(output: &mut Vec<u8>, v: u32) {
    if v < 254 {
        output.push(v as u8);
    } else if v < 254 * 254 {
        output.push(254);
        output.push((v % 254) as u8);
        output.push((v / 254) as u8);
    } else if v <= VAR_UINT_MAX {
        output.push(255);
        output.push((v % 254) as u8);
        output.push(((v / 254) % 254) as u8);
        output.push((v / (254 * 254)) as u8);
    } else {
        panic!("value {v} out of VarUint range");
    }
}

/// Reads a VarUint at `*pos`, advancing the cursor on success.
#[inline]
pub fn read_var_uint(buf: &[u8], pos: &mut usize) -> Result<u32, Error> {
    let first = *buf.get(*pos).ok_or(Error::OutOfInputData)?;
    match first {
        254 => {
            let ext = buf.get(*pos + 1..*pos + 3).ok_or(Error::OutOfInputData)?;
            *pos += 3;
            Ok(u32::from(ext[1]) * 254 + u32::from(ext[0]))
        }
        255 => {
            let ext = buf.get(*pos + 1..*pos + 4).ok_or(Error::OutOfInputData)?;
            *pos += 4;
            Ok((u32::from(ext[2]) * 254 + u32::from(ext[1])) * 254 + u32::from(ext[0]))
        }
        _ => {
            *pos += 1;
            Ok(u32::from(first))
        }
    }
}

/// Encoded size in bytes of the VarUint for `v`.
#[inline]
pub fn var_uint_cost(v: u32) -> u32 {
    if v < 254 {
        1
    } else if v < 254 * 254 {
        3
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(v: u32) {
        let mut buf = Vec::new();
        append_var_uint(&mut buf, v);
        assert_eq!(buf.len() as u32, var_uint_cost(v));
        let mut pos = 0;
        assert_eq!(read_var_uint(&buf, &mut pos).unwrap(), v);
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn widths() {
        for v in [
            0,
            1,
            253,
            254,
            255,
            1000,
            254 * 254 - 1,
            254 * 254,
            1 << 20,
            VAR_UINT_MAX,
        ] {
            roundtrip(v);
        }
    }

    #[test]
    fn truncated_input() {
        let mut pos = 0;
        assert_eq!(read_var_uint(&[254, 7], &mut pos), Err(Error::OutOfInputData));
        assert_eq!(pos, 0);
        assert_eq!(read_var_uint(&[255, 1, 2], &mut pos), Err(Error::OutOfInputData));
    }

    #[test]
    #[should_panic(expected = "out of VarUint range")]
    fn overflow_panics() {
        append_var_uint(&mut Vec::new(), VAR_UINT_MAX + 1);
    }
}
