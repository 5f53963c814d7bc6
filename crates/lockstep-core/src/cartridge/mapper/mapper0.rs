//! Mapper 0 (NROM).
//!
//! No banking at all: 16 KiB of PRG ROM is mirrored across `$8000-$FFFF`,
//! 32 KiB fills it linearly. Writes into ROM space are accepted and dropped.
//! Pattern memory is the PPU's own.

use std::borrow::Cow;

use super::{Mapper, MapperAccess, MapperState, mismatch};
use crate::{cartridge::Mirroring, error::Error, memory::cpu as cpu_mem};

const MIN_PRG_ROM: usize = 16 * 1024;

#[derive(Debug, Clone)]
pub struct Mapper0 {
    prg_rom: Box<[u8]>,
    mirroring: Mirroring,
}

impl Mapper0 {
    pub fn new(prg_rom: Box<[u8]>, mirroring: Mirroring) -> Result<Self, Error> {
        if prg_rom.len() < MIN_PRG_ROM {
            return Err(Error::RomTooSmall {
                mapper: "NROM",
                minimum: MIN_PRG_ROM,
                actual: prg_rom.len(),
            });
        }
        Ok(Self { prg_rom, mirroring })
    }
}

impl Mapper for Mapper0 {
    fn cpu_read(&self, addr: u16) -> MapperAccess {
        if addr < cpu_mem::PRG_ROM_START {
            return MapperAccess::NotHandled;
        }
        let idx = (addr - cpu_mem::PRG_ROM_START) as usize % self.prg_rom.len();
        MapperAccess::Handled(self.prg_rom[idx])
    }

    fn cpu_write(&mut self, addr: u16, _data: u8) -> MapperAccess<()> {
        if addr < cpu_mem::PRG_ROM_START {
            return MapperAccess::NotHandled;
        }
        MapperAccess::Handled(())
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_id(&self) -> u16 {
        0
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("NROM")
    }

    fn save_state(&self) -> MapperState {
        MapperState::Nrom
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), Error> {
        match state {
            MapperState::Nrom => Ok(()),
            other => Err(mismatch(&*self, other)),
        }
    }
}
