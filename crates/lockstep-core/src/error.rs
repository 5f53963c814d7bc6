use std::fmt;

use thiserror::Error;

use crate::cartridge::header::NES_HEADER_LEN;

/// Which bus an unmapped access was issued on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressSpace {
    /// The CPU-visible 64 KiB address space.
    Cpu,
    /// The 16 KiB graphics address space seen by the PPU.
    Ppu,
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("CPU"),
            Self::Ppu => f.write_str("PPU"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Provided buffer is shorter than the 16-byte header.
    #[error("header expected {NES_HEADER_LEN} bytes, got {actual}")]
    TooShort { actual: usize },
    /// Magic number ("NES<EOF>") is missing.
    #[error("missing NES magic bytes")]
    InvalidMagic,
    /// A ROM section (trainer/PRG/CHR) is shorter than advertised.
    #[error("{section} section expected {expected} bytes, got {actual}")]
    SectionTooShort {
        section: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The header names a mapper this core does not implement.
    #[error("mapper {0} is not supported")]
    UnsupportedMapper(u16),
    /// The image is smaller than the mapper's minimum bank layout.
    #[error("{mapper} needs at least {minimum} bytes of PRG ROM, image has {actual}")]
    RomTooSmall {
        mapper: &'static str,
        minimum: usize,
        actual: usize,
    },
    /// A `.pal` file is neither 64 nor 512 RGB triplets long.
    #[error("palette file must be 192 or 1536 bytes, got {actual}")]
    InvalidPalette { actual: usize },
    /// An access reached neither chip memory nor any mapped range.
    #[error("{space} address {addr:#06X} is not mapped")]
    AddressOutOfRange { space: AddressSpace, addr: u16 },
    /// A snapshot could not be applied; no state was modified.
    #[error("snapshot restore failed: {0}")]
    RestoreFailed(#[from] RestoreError),
    /// Wrapper for I/O errors raised while reading ROMs from disk.
    #[error("i/o error while reading cartridge: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "savestate-postcard")]
    #[error("postcard encoding failed: {0}")]
    Postcard(#[from] postcard::Error),
}

/// Reasons a snapshot restore is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestoreError {
    #[error("snapshot truncated: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("{0} unexpected bytes after the snapshot")]
    TrailingBytes(usize),
    #[error("graphics memory is {actual} bytes, snapshot was taken with {expected}")]
    ChrSizeMismatch { expected: usize, actual: usize },
    #[error("{field} holds {actual} bytes, expected {expected}")]
    FieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("snapshot belongs to mapper {actual}, cartridge uses mapper {expected}")]
    MapperMismatch { expected: u16, actual: u16 },
    #[error("{field} value {value} is out of range")]
    InvalidValue { field: &'static str, value: i64 },
}

impl Error {
    pub(crate) fn unmapped(space: AddressSpace, addr: u16) -> Self {
        Self::AddressOutOfRange { space, addr }
    }
}
