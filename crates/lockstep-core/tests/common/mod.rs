#![allow(dead_code)]

use anyhow::{Context, Result};
use lockstep_core::Bus;

pub const PRG_BANK: usize = 16 * 1024;
pub const CHR_BANK: usize = 8 * 1024;
pub const HEADER_LEN: usize = 16;

/// CPU cycles covering one full frame of PPU dots, rounded up.
pub const FRAME_CPU_CYCLES: u32 = (341u32 * 262).div_ceil(3);

/// In-memory iNES image builder.
#[derive(Debug, Clone)]
pub struct RomBuilder {
    mapper: u8,
    prg_banks: u8,
    chr_banks: u8,
    chr_fill: u8,
    vertical: bool,
}

impl RomBuilder {
    pub fn nrom() -> Self {
        Self {
            mapper: 0,
            prg_banks: 1,
            chr_banks: 1,
            chr_fill: 0,
            vertical: false,
        }
    }

    pub fn uxrom(prg_banks: u8) -> Self {
        Self {
            mapper: 2,
            prg_banks,
            chr_banks: 0,
            chr_fill: 0,
            vertical: false,
        }
    }

    pub fn vertical(mut self) -> Self {
        self.vertical = true;
        self
    }

    pub fn chr(mut self, banks: u8, fill: u8) -> Self {
        self.chr_banks = banks;
        self.chr_fill = fill;
        self
    }

    /// PRG bytes follow `offset % 251` so every bank reads differently.
    pub fn build(&self) -> Vec<u8> {
        let flags6 = (self.mapper << 4) | u8::from(self.vertical);
        let mut rom = vec![b'N', b'E', b'S', 0x1A, self.prg_banks, self.chr_banks, flags6];
        rom.resize(HEADER_LEN, 0);
        rom.extend((0..usize::from(self.prg_banks) * PRG_BANK).map(|offset| (offset % 251) as u8));
        rom.extend(std::iter::repeat_n(
            self.chr_fill,
            usize::from(self.chr_banks) * CHR_BANK,
        ));
        rom
    }

    pub fn bus(&self) -> Result<Bus> {
        Bus::from_rom_bytes(&self.build()).context("building console from image")
    }
}

/// Points the PPU data port at `addr` through `$2006`.
pub fn set_ppu_addr(bus: &mut Bus, addr: u16) -> Result<()> {
    bus.cpu_write(0x2006, (addr >> 8) as u8)?;
    bus.cpu_write(0x2006, addr as u8)?;
    Ok(())
}

/// Runs the console until the next completed frame.
pub fn run_frame(bus: &mut Bus) {
    bus.consume_frame_ready();
    while !bus.consume_frame_ready() {
        bus.clock(1);
    }
}
