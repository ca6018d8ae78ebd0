use core::fmt;

/// An error produced while encoding or decoding an Iguana frame.
///
/// Decoders never panic on malformed input; every read from an external
/// buffer is bounds-checked and surfaces one of these variants instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The bit stream contradicts itself (bad offset, bad table sum,
    /// stream lengths that do not add up).
    CorruptedBitStream,
    /// A serialized block is shorter than its fixed-size header demands.
    WrongSourceSize,
    /// A read would pass the end (or, for backward parsing, the start)
    /// of the input buffer.
    OutOfInputData,
    /// The frame declares an uncompressed size the target cannot hold.
    InsufficientTargetCapacity,
    /// The command stream contains an unknown command id.
    UnrecognizedCommand(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::CorruptedBitStream => f.write_str("corrupted bit stream"),
            Error::WrongSourceSize => f.write_str("wrong source buffer size"),
            Error::OutOfInputData => f.write_str("out of input data"),
            Error::InsufficientTargetCapacity => {
                f.write_str("insufficient target capacity for the decompressed data")
            }
            Error::UnrecognizedCommand(cmd) => {
                write!(f, "unrecognized command {:#04x} in the control stream", cmd)
            }
        }
    }
}

impl std::error::Error for Error {}
