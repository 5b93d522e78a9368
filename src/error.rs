use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("access violation: 0x{0:X}")]
    AccessViolation(u32),

    #[error("end of data at 0x{0:X}")]
    EndOfData(u32),

    #[error("short write: wrote {written} of {requested} bytes")]
    ShortWrite { written: usize, requested: usize },

    #[error("invalid checksum: header says 0x{expected:04X}, data sums to 0x{actual:04X}")]
    InvalidChecksum { expected: u16, actual: u16 },

    #[error("range 0x{start:06X}-0x{end:06X} overlaps an existing mapping")]
    RangeOverlap { start: u32, end: u32 },

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(Unsupported),

    #[error("no cartridge loaded")]
    NoCartridge,

    #[error(transparent)]
    Executor(#[from] anyhow::Error),
}

/// Reasons a VDP port operation is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    /// Data port written while the code register selects a read.
    ReadMode { code: u16 },
    /// Data port write to CRAM/VSRAM.
    Target { code: u16 },
    /// Register-select write beyond the register file.
    Register { index: u8 },
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unsupported::ReadMode { code } => {
                write!(f, "data write with read code 0x{:02X}", code)
            }
            Unsupported::Target { code } => write!(f, "write target code 0x{:02X}", code),
            Unsupported::Register { index } => write!(f, "register {}", index),
        }
    }
}
