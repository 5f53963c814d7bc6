//! Bit views of the three single-byte PPU registers.

use bitflags::bitflags;

use crate::memory::ppu as ppu_mem;

bitflags! {
    /// `$2000`, write-only.
    ///
    /// ```text
    /// 7  bit  0
    /// VPHB SINN
    /// |||| ||++- base nametable, copied into t bits 10-11
    /// |||| |+--- $2007 stride: 0 = +1 (across), 1 = +32 (down)
    /// |||| +---- 8x8 sprite pattern table
    /// |||+------ background pattern table
    /// ||+------- sprite height: 0 = 8, 1 = 16
    /// |+-------- EXT pin direction, ignored
    /// +--------- NMI at the start of vertical blank
    /// ```
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct Control: u8 {
        const NAMETABLE = 0x03;
        const INCREMENT_32 = 0x04;
        const SPRITE_TABLE = 0x08;
        const BACKGROUND_TABLE = 0x10;
        const SPRITE_SIZE_16 = 0x20;
        const EXT_OUTPUT = 0x40;
        const GENERATE_NMI = 0x80;
    }
}

bitflags! {
    /// `$2001`, write-only. Grayscale and emphasis are latched but have no
    /// effect on the output.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct Mask: u8 {
        const GRAYSCALE = 0x01;
        const SHOW_BACKGROUND_LEFT = 0x02;
        const SHOW_SPRITES_LEFT = 0x04;
        const SHOW_BACKGROUND = 0x08;
        const SHOW_SPRITES = 0x10;
        const EMPHASIZE_RED = 0x20;
        const EMPHASIZE_GREEN = 0x40;
        const EMPHASIZE_BLUE = 0x80;
    }
}

bitflags! {
    /// `$2002`, read-only. The low five bits are never driven.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct Status: u8 {
        const SPRITE_OVERFLOW = 0x20;
        const SPRITE_ZERO_HIT = 0x40;
        const VERTICAL_BLANK = 0x80;
    }
}

impl Control {
    pub(crate) fn nametable_index(self) -> u8 {
        (self & Self::NAMETABLE).bits()
    }

    pub(crate) fn vram_increment(self) -> u16 {
        if self.contains(Self::INCREMENT_32) { 32 } else { 1 }
    }

    /// Pattern table used by 8x8 sprites. 8x16 sprites pick their table
    /// from the tile index instead.
    pub(crate) fn sprite_pattern_table(self) -> u16 {
        table_base(self.contains(Self::SPRITE_TABLE))
    }

    pub(crate) fn background_pattern_table(self) -> u16 {
        table_base(self.contains(Self::BACKGROUND_TABLE))
    }

    pub(crate) fn sprite_height(self) -> i32 {
        if self.contains(Self::SPRITE_SIZE_16) { 16 } else { 8 }
    }

    pub(crate) fn nmi_enabled(self) -> bool {
        self.contains(Self::GENERATE_NMI)
    }
}

impl Mask {
    pub(crate) fn show_background(self) -> bool {
        self.contains(Self::SHOW_BACKGROUND)
    }

    pub(crate) fn show_sprites(self) -> bool {
        self.contains(Self::SHOW_SPRITES)
    }

    /// Either layer enabled; fetches and scroll updates run only then.
    pub(crate) fn rendering_enabled(self) -> bool {
        self.intersects(Self::SHOW_BACKGROUND | Self::SHOW_SPRITES)
    }

    /// Neither layer is clipped in the leftmost 8 pixels.
    pub(crate) fn left_column_unclipped(self) -> bool {
        self.contains(Self::SHOW_BACKGROUND_LEFT | Self::SHOW_SPRITES_LEFT)
    }
}

fn table_base(high: bool) -> u16 {
    if high {
        ppu_mem::PATTERN_TABLE_1
    } else {
        ppu_mem::PATTERN_TABLE_0
    }
}
