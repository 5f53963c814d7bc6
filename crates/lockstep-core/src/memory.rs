//! Shared definitions for the console memory map.
//!
//! Address constants for both buses live here so the routing tables in
//! [`crate::bus`] and [`crate::ppu`] read as ranges instead of magic numbers.

/// CPU memory map details.
pub mod cpu {
    /// First byte of the console work RAM.
    pub const INTERNAL_RAM_START: u16 = 0x0000;
    /// Last mirrored work RAM address visible to the CPU (`$1FFF`).
    pub const INTERNAL_RAM_MIRROR_END: u16 = 0x1FFF;
    /// Size of the work RAM block (2 KiB mirrored through `$1FFF`).
    pub const INTERNAL_RAM_SIZE: usize = 0x0800;
    /// Mask applied to mirror work RAM accesses within `$0000-$1FFF`.
    pub const INTERNAL_RAM_MASK: u16 = (INTERNAL_RAM_SIZE as u16) - 1;

    /// First CPU address mapped to the PPU register mirror.
    pub const PPU_REGISTER_BASE: u16 = 0x2000;
    /// Last CPU address mirrored to the PPU register set.
    pub const PPU_REGISTER_END: u16 = 0x3FFF;

    /// First address of the APU / controller I/O window.
    pub const IO_REGISTER_BASE: u16 = 0x4000;
    /// Last address of the I/O window, test-mode registers included.
    pub const IO_REGISTER_END: u16 = 0x401F;
    /// OAM DMA trigger (`$4014`).
    pub const OAM_DMA: u16 = 0x4014;

    /// First address handled by the cartridge expansion / PRG window.
    pub const CARTRIDGE_SPACE_BASE: u16 = 0x4020;
    /// PRG RAM window start address (`$6000`).
    pub const PRG_RAM_START: u16 = 0x6000;
    /// PRG RAM window end address (inclusive).
    pub const PRG_RAM_END: u16 = 0x7FFF;
    /// PRG ROM window start address (`$8000`).
    pub const PRG_ROM_START: u16 = 0x8000;
    /// Final CPU-visible address (`$FFFF`).
    pub const CPU_ADDR_END: u16 = 0xFFFF;

    /// Number of bytes moved by one OAM DMA transfer.
    pub const OAM_DMA_LEN: usize = 0x100;
}

/// PPU register layout and VRAM mirror rules.
pub mod ppu {
    /// Mask for decoding register mirrors (`addr & 0x0007`).
    pub const REGISTER_SELECT_MASK: u16 = 0x0007;

    /// Size of the internal nametable RAM (CIRAM). Four logical nametables
    /// fold onto these two physical 1 KiB banks.
    pub const CIRAM_SIZE: usize = 0x0800;
    /// Size of one physical nametable bank.
    pub const NAMETABLE_SIZE: u16 = 0x0400;

    /// Pattern table window (`$0000-$1FFF`).
    pub const PATTERN_START: u16 = 0x0000;
    /// Last address of the pattern table window.
    pub const PATTERN_END: u16 = 0x1FFF;
    /// Pattern table base address for table 0.
    pub const PATTERN_TABLE_0: u16 = 0x0000;
    /// Pattern table base address for table 1.
    pub const PATTERN_TABLE_1: u16 = 0x1000;
    /// Built-in graphics memory used when the image carries no CHR ROM.
    pub const CHR_RAM_SIZE: usize = 0x2000;

    /// Base address of nametable 0.
    pub const NAMETABLE_BASE: u16 = 0x2000;
    /// Last nametable address before the palette window (`$3EFF`).
    pub const NAMETABLE_MIRROR_END: u16 = 0x3EFF;
    /// Logical nametable span folded by [`crate::cartridge::Mirroring`].
    pub const NAMETABLE_SPAN_MASK: u16 = 0x0FFF;
    /// Attribute table offset inside a nametable.
    pub const ATTRIBUTE_TABLE_OFFSET: u16 = 0x03C0;

    /// Palette RAM base address (`$3F00`).
    pub const PALETTE_BASE: u16 = 0x3F00;
    /// Last palette mirror address (`$3FFF`).
    pub const PALETTE_END: u16 = 0x3FFF;
    /// Logical palette entries (32 bytes mirrored every 32 bytes).
    pub const PALETTE_ENTRIES: u16 = 0x20;
    /// Palette backing store. Only the first 32 bytes are addressable; the
    /// rest exists so snapshots keep their fixed layout.
    pub const PALETTE_RAM_SIZE: usize = 0x80;

    /// Sprite attribute memory (OAM) byte count.
    pub const OAM_RAM_SIZE: usize = 0x100;

    /// CPU-visible PPU register identifiers.
    #[repr(u16)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Register {
        /// `$2000` - PPUCTRL
        Control = 0x2000,
        /// `$2001` - PPUMASK
        Mask = 0x2001,
        /// `$2002` - PPUSTATUS
        Status = 0x2002,
        /// `$2003` - OAMADDR
        OamAddr = 0x2003,
        /// `$2004` - OAMDATA
        OamData = 0x2004,
        /// `$2005` - PPUSCROLL
        Scroll = 0x2005,
        /// `$2006` - PPUADDR
        Addr = 0x2006,
        /// `$2007` - PPUDATA
        Data = 0x2007,
    }

    impl Register {
        /// Raw address backing the register.
        pub const fn addr(self) -> u16 {
            self as u16
        }

        /// Resolves the canonical register for a CPU address in `$2000-$3FFF`.
        pub const fn from_cpu_addr(addr: u16) -> Self {
            match addr & REGISTER_SELECT_MASK {
                0 => Self::Control,
                1 => Self::Mask,
                2 => Self::Status,
                3 => Self::OamAddr,
                4 => Self::OamData,
                5 => Self::Scroll,
                6 => Self::Addr,
                _ => Self::Data,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ppu::Register;

    #[test]
    fn register_decoding_repeats_every_eight_bytes() {
        assert_eq!(Register::from_cpu_addr(0x2000), Register::Control);
        assert_eq!(Register::from_cpu_addr(0x2002), Register::Status);
        assert_eq!(Register::from_cpu_addr(0x3FFA), Register::Status);
        assert_eq!(Register::from_cpu_addr(0x3FFF), Register::Data);
        assert_eq!(Register::Addr.addr(), 0x2006);
    }
}
