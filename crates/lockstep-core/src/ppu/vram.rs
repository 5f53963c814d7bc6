//! Graphics-space memory owned by the PPU and the `$0000-$3FFF` routing table.
//!
//! ```text
//! $0000-$1FFF  pattern tables  -> built-in graphics memory (CHR ROM copy or RAM)
//! $2000-$3EFF  nametables      -> 2 KiB CIRAM, folded by the cartridge mirroring
//! $3F00-$3FFF  palette         -> 32 entries, backdrop mirrors aliased
//! ```
//!
//! Every access is offered to the cartridge first; its answer wins.

use crate::{
    cartridge::MapperAccess,
    error::{AddressSpace, Error},
    mem_block::ppu::{Ciram, PaletteRam},
    memory::ppu as ppu_mem,
    ppu::pattern_bus::PpuBus,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Vram {
    pub(crate) chr: Box<[u8]>,
    pub(crate) ciram: Ciram,
    pub(crate) palette_ram: PaletteRam,
}

impl Vram {
    /// Empty `chr` selects 8 KiB of zeroed built-in graphics RAM.
    pub(crate) fn new(chr: Box<[u8]>) -> Self {
        let chr = if chr.is_empty() {
            vec![0; ppu_mem::CHR_RAM_SIZE].into_boxed_slice()
        } else {
            chr
        };
        Self {
            chr,
            ciram: Ciram::new(),
            palette_ram: PaletteRam::new(),
        }
    }

    pub(crate) fn read(&self, bus: &mut impl PpuBus, addr: u16) -> Result<u8, Error> {
        if let MapperAccess::Handled(value) = bus.read(addr) {
            return Ok(value);
        }
        match addr {
            ppu_mem::PATTERN_START..=ppu_mem::PATTERN_END => Ok(self.pattern(addr)),
            ppu_mem::NAMETABLE_BASE..=ppu_mem::NAMETABLE_MIRROR_END => {
                Ok(self.ciram[nametable_index(bus, addr)])
            }
            ppu_mem::PALETTE_BASE..=ppu_mem::PALETTE_END => Ok(self.palette_ram[palette_index(addr)]),
            _ => Err(Error::unmapped(AddressSpace::Ppu, addr)),
        }
    }

    pub(crate) fn write(&mut self, bus: &mut impl PpuBus, addr: u16, value: u8) -> Result<(), Error> {
        if bus.write(addr, value).is_handled() {
            return Ok(());
        }
        match addr {
            ppu_mem::PATTERN_START..=ppu_mem::PATTERN_END => {
                if let Some(byte) = self.chr.get_mut(usize::from(addr)) {
                    *byte = value;
                }
            }
            ppu_mem::NAMETABLE_BASE..=ppu_mem::NAMETABLE_MIRROR_END => {
                self.ciram[nametable_index(bus, addr)] = value;
            }
            ppu_mem::PALETTE_BASE..=ppu_mem::PALETTE_END => {
                self.palette_ram[palette_index(addr)] = value;
            }
            _ => return Err(Error::unmapped(AddressSpace::Ppu, addr)),
        }
        Ok(())
    }

    /// Read issued by the rendering pipeline. Render addresses never leave
    /// `$0000-$2FFF`, so the unmapped case cannot occur.
    #[inline]
    pub(crate) fn fetch(&self, bus: &mut impl PpuBus, addr: u16) -> u8 {
        self.read(bus, addr).unwrap_or(0)
    }

    /// Palette RAM entry for a `(palette row, pixel)` pair, `row` in 0..=7.
    #[inline]
    pub(crate) fn palette_entry(&self, row: u8, pixel: u8) -> u8 {
        let offset = (u16::from(row & 0x07) << 2) | u16::from(pixel & 0x03);
        self.palette_ram[palette_index(ppu_mem::PALETTE_BASE | offset)]
    }

    #[inline]
    fn pattern(&self, addr: u16) -> u8 {
        self.chr.get(usize::from(addr)).copied().unwrap_or(0)
    }
}

/// Pattern read used while the sprite pipeline is borrowed mutably.
#[inline]
pub(crate) fn fetch_pattern(chr: &[u8], bus: &mut impl PpuBus, addr: u16) -> u8 {
    match bus.read(addr) {
        MapperAccess::Handled(value) => value,
        MapperAccess::NotHandled => chr.get(usize::from(addr)).copied().unwrap_or(0),
    }
}

#[inline]
fn nametable_index(bus: &impl PpuBus, addr: u16) -> usize {
    usize::from(bus.mirroring().fold(addr & ppu_mem::NAMETABLE_SPAN_MASK))
}

/// Maps `$3F00-$3FFF` onto the 32 palette entries. Entries `$10/$14/$18/$1C`
/// alias the backdrop entries `$00/$04/$08/$0C`.
#[inline]
pub(crate) fn palette_index(addr: u16) -> usize {
    let index = addr & (ppu_mem::PALETTE_ENTRIES - 1);
    let index = if index & 0x13 == 0x10 {
        index - 0x10
    } else {
        index
    };
    usize::from(index)
}
