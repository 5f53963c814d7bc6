use std::borrow::Cow;

use bytes::BufMut;
use tracing::trace;

use super::{Mapper, MapperAccess, MapperState, mismatch};
use crate::{
    cartridge::Mirroring,
    error::{Error, RestoreError},
    memory::cpu as cpu_mem,
    state::{SnapshotReader, check_len},
};

// Mapper 2: UxROM, 16 KiB switchable PRG banking.
//
// | Area | Address range     | Behaviour                                  |
// |------|-------------------|--------------------------------------------|
// | CPU  | `$8000-$BFFF`     | 16 KiB switchable PRG-ROM bank             |
// | CPU  | `$C000-$FFFF`     | 16 KiB fixed PRG-ROM bank (last)           |
// | CPU  | `$8000-$FFFF` (W) | Bank select, low 4 bits of the value       |
// | PPU  | `$0000-$1FFF`     | Declined, PPU built-in graphics memory     |
// | PPU  | `$2000-$3EFF`     | Mirroring from the iNES header             |

const PRG_BANK_SIZE: usize = 16 * 1024;

/// CPU `$C000`: boundary between the switchable 16 KiB window (`$8000-$BFFF`)
/// and the fixed 16 KiB window mapped to the last PRG bank.
const UXROM_FIXED_WINDOW_START: u16 = 0xC000;

const BANK_SELECT_MASK: u8 = 0x0F;

#[derive(Debug, Clone)]
pub struct Mapper2 {
    prg_rom: Box<[u8]>,
    selected_bank: u8,
    /// Byte offset of the last 16 KiB bank, fixed at `$C000`.
    last_bank_offset: usize,
    mirroring: Mirroring,
}

/// Snapshot of [`Mapper2`]: bank byte, last-bank offset (4-byte signed),
/// then the PRG image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Mapper2State {
    pub selected_bank: u8,
    pub last_bank_offset: i32,
    pub prg_rom: Vec<u8>,
}

impl Mapper2State {
    pub(crate) fn encode(&self, out: &mut impl BufMut) {
        out.put_u8(self.selected_bank);
        out.put_i32_le(self.last_bank_offset);
        out.put_slice(&self.prg_rom);
    }

    pub(crate) fn decode(
        reader: &mut SnapshotReader<'_>,
        prg_len: usize,
    ) -> Result<Self, RestoreError> {
        Ok(Self {
            selected_bank: reader.u8()?,
            last_bank_offset: reader.i32()?,
            prg_rom: reader.bytes(prg_len)?,
        })
    }
}

impl Mapper2 {
    /// Registers a PRG image. The last-bank offset is computed once here.
    pub fn new(prg_rom: Box<[u8]>, mirroring: Mirroring) -> Result<Self, Error> {
        if prg_rom.len() < PRG_BANK_SIZE {
            return Err(Error::RomTooSmall {
                mapper: "UxROM",
                minimum: PRG_BANK_SIZE,
                actual: prg_rom.len(),
            });
        }
        let last_bank_offset = prg_rom.len() - PRG_BANK_SIZE;
        Ok(Self {
            prg_rom,
            selected_bank: 0,
            last_bank_offset,
            mirroring,
        })
    }

    pub fn selected_bank(&self) -> u8 {
        self.selected_bank
    }

    /// Resolves a CPU address in `$8000-$FFFF` to a byte offset in the PRG image.
    ///
    /// A selection past the end of the image wraps around it.
    pub fn prg_offset(&self, addr: u16) -> usize {
        let within = (addr as usize) & (PRG_BANK_SIZE - 1);
        if addr < UXROM_FIXED_WINDOW_START {
            (self.selected_bank as usize * PRG_BANK_SIZE + within) % self.prg_rom.len()
        } else {
            self.last_bank_offset + within
        }
    }
}

impl Mapper for Mapper2 {
    fn cpu_read(&self, addr: u16) -> MapperAccess {
        if addr < cpu_mem::PRG_ROM_START {
            return MapperAccess::NotHandled;
        }
        MapperAccess::Handled(self.prg_rom[self.prg_offset(addr)])
    }

    fn cpu_write(&mut self, addr: u16, data: u8) -> MapperAccess<()> {
        if addr < cpu_mem::PRG_ROM_START {
            return MapperAccess::NotHandled;
        }
        self.selected_bank = data & BANK_SELECT_MASK;
        trace!(bank = self.selected_bank, "uxrom bank switch");
        MapperAccess::Handled(())
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_id(&self) -> u16 {
        2
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("UxROM")
    }

    fn save_state(&self) -> MapperState {
        MapperState::UxRom(Mapper2State {
            selected_bank: self.selected_bank,
            last_bank_offset: self.last_bank_offset as i32,
            prg_rom: self.prg_rom.to_vec(),
        })
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), Error> {
        let MapperState::UxRom(state) = state else {
            return Err(mismatch(&*self, state));
        };
        check_len("UxROM PRG ROM", self.prg_rom.len(), state.prg_rom.len())?;
        let last_bank_offset = usize::try_from(state.last_bank_offset)
            .ok()
            .filter(|offset| offset + PRG_BANK_SIZE <= self.prg_rom.len())
            .ok_or(RestoreError::InvalidValue {
                field: "UxROM last bank offset",
                value: i64::from(state.last_bank_offset),
            })?;

        self.selected_bank = state.selected_bank & BANK_SELECT_MASK;
        self.last_bank_offset = last_bank_offset;
        self.prg_rom.copy_from_slice(&state.prg_rom);
        Ok(())
    }
}
