//! CPU-visible PPU register state and internal VRAM address latches.
//!
//! Everything the `$2000-$2007` ports touch besides graphics memory: the
//! three flag registers, sprite memory and the `v/t/x/w` scroll latches.

mod flags;
mod vram_addr;
mod vram_registers;

pub(crate) use flags::{Control, Mask, Status};
pub use vram_addr::VramAddr;
pub(crate) use vram_registers::VramRegisters;

use crate::mem_block::ppu::OamRam;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct Registers {
    pub(crate) control: Control,
    pub(crate) mask: Mask,
    pub(crate) status: Status,
    /// `$2003`; `$2004` accesses index sprite memory through it.
    pub(crate) oam_addr: u8,
    pub(crate) oam: OamRam,
    pub(crate) vram: VramRegisters,
    /// Value returned by the next non-palette `$2007` read.
    pub(crate) vram_buffer: u8,
}

impl Registers {
    /// Power-on state: every register and sprite byte zero.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Updates control, also syncing the nametable bits into `t`.
    ///
    /// Returns `true` when NMI generation was just switched on while the
    /// vertical blank flag is already set; real hardware raises an NMI
    /// immediately in that case.
    pub(crate) fn write_control(&mut self, value: u8) -> bool {
        let was_enabled = self.control.nmi_enabled();
        self.control = Control::from_bits_retain(value);
        self.vram.t.set_nametable(self.control.nametable_index());
        !was_enabled
            && self.control.nmi_enabled()
            && self.status.contains(Status::VERTICAL_BLANK)
    }

    /// Returns the status snapshot, then clears VBlank and the write toggle.
    pub(crate) fn read_status(&mut self) -> u8 {
        let snapshot = self.status.bits();
        self.status.remove(Status::VERTICAL_BLANK);
        self.vram.reset_latch();
        snapshot
    }

    pub(crate) fn write_oam_data(&mut self, value: u8) {
        self.oam[self.oam_addr as usize] = value;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    pub(crate) fn read_oam_data(&self) -> u8 {
        self.oam[self.oam_addr as usize]
    }
}
