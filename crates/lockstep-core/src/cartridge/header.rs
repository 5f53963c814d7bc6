//! iNES header parsing.
//!
//! The first 16 bytes of every `.nes` image describe how much PRG/CHR data
//! follows, which mapper the board uses and how the nametables are mirrored.
//! Only the fields this core acts on are decoded; NES 2.0 images are accepted
//! and contribute their extended mapper bits, the remaining NES 2.0 metadata
//! is ignored.

use bitflags::bitflags;

use super::Mirroring;
use crate::error::Error;

const NES_MAGIC: &[u8; 4] = b"NES\x1A";

/// Size of the fixed iNES header in bytes.
pub const NES_HEADER_LEN: usize = 16;
/// Unit size of the PRG ROM count in byte 4.
pub const PRG_ROM_UNIT: usize = 16 * 1024;
/// Unit size of the CHR ROM count in byte 5.
pub const CHR_ROM_UNIT: usize = 8 * 1024;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags6: u8 {
        const MIRRORING        = 0b0000_0001;
        const BATTERY          = 0b0000_0010;
        const TRAINER          = 0b0000_0100;
        const FOUR_SCREEN      = 0b0000_1000;
        const MAPPER_LOW_MASK  = 0b1111_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags7: u8 {
        const VS_UNISYSTEM     = 0b0000_0001;
        const PLAYCHOICE_10    = 0b0000_0010;
        const NES2_DETECTION   = 0b0000_1100;
        const MAPPER_HIGH_MASK = 0b1111_0000;
    }
}

/// Decoded cartridge header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// Mapper ID (0 == NROM, 2 == UxROM, ...).
    pub mapper: u16,
    /// How the PPU nametables are mirrored.
    pub mirroring: Mirroring,
    /// Battery bit: the board keeps PRG RAM contents when powered off.
    pub battery_backed_ram: bool,
    /// Whether the 512 byte trainer block sits between the header and PRG data.
    pub trainer_present: bool,
    /// Amount of PRG ROM in bytes.
    pub prg_rom_size: usize,
    /// Amount of CHR ROM in bytes. Zero means the board uses CHR RAM.
    pub chr_rom_size: usize,
}

impl Header {
    /// Parse a header from the first [`NES_HEADER_LEN`] bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let Some(raw) = bytes.get(..NES_HEADER_LEN) else {
            return Err(Error::TooShort {
                actual: bytes.len(),
            });
        };

        if &raw[0..4] != NES_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let flags6 = Flags6::from_bits_retain(raw[6]);
        let flags7 = Flags7::from_bits_retain(raw[7]);
        let nes2 = (flags7.bits() & Flags7::NES2_DETECTION.bits()) == 0b0000_1000;
        let extended_mapper = if nes2 { raw[8] & 0x0F } else { 0 };

        Ok(Self {
            mapper: combine_mapper(flags6, flags7, extended_mapper),
            mirroring: resolve_mirroring(flags6),
            battery_backed_ram: flags6.contains(Flags6::BATTERY),
            trainer_present: flags6.contains(Flags6::TRAINER),
            prg_rom_size: raw[4] as usize * PRG_ROM_UNIT,
            chr_rom_size: raw[5] as usize * CHR_ROM_UNIT,
        })
    }
}

fn combine_mapper(flags6: Flags6, flags7: Flags7, extended: u8) -> u16 {
    let low = (flags6.bits() & Flags6::MAPPER_LOW_MASK.bits()) >> 4;
    let high = flags7.bits() & Flags7::MAPPER_HIGH_MASK.bits();
    (u16::from(extended) << 8) | u16::from(high | low)
}

fn resolve_mirroring(flags6: Flags6) -> Mirroring {
    if flags6.contains(Flags6::FOUR_SCREEN) {
        Mirroring::FourScreen
    } else if flags6.contains(Flags6::MIRRORING) {
        Mirroring::Vertical
    } else {
        Mirroring::Horizontal
    }
}
