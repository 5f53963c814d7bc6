#[cfg(feature = "savestate-serde")]
use serde::{Deserialize, Serialize};

use bytes::BufMut;

use crate::{
    error::RestoreError,
    mem_block::ppu::{Ciram, OamRam, PaletteRam},
    memory::ppu as ppu_mem,
    ppu::sprite_pipeline::MAX_SPRITES_PER_LINE,
    state::SnapshotReader,
};

/// Encoded size of everything after the graphics memory.
pub const PPU_STATE_FIXED_LEN: usize = ppu_mem::PALETTE_RAM_SIZE
    + ppu_mem::CIRAM_SIZE
    + ppu_mem::OAM_RAM_SIZE
    + 1 // oam_addr
    + 4 // dot
    + 4 // scanline
    + 8 // total_cycles
    + 1 // read_buffer
    + 3 // mask, control, status
    + 1 // nmi latch
    + 2 * 2 // t, v
    + 1 // fine_x
    + 1 // write toggle
    + 4 // staging bytes
    + 4 * 2 // shifters
    + 2 * MAX_SPRITES_PER_LINE;

/// Background fetch bytes waiting for the next shifter reload.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileLatchState {
    pub tile_id: u8,
    pub attribute: u8,
    pub pattern_low: u8,
    pub pattern_high: u8,
}

/// Raw background shifters.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BgShifterState {
    pub pattern_low: u16,
    pub pattern_high: u16,
    pub attribute_low: u16,
    pub attribute_high: u16,
}

/// Complete PPU snapshot, field order matching the binary layout.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PpuState {
    pub chr: Vec<u8>,
    pub palette_ram: PaletteRam,
    pub ciram: Ciram,
    pub oam: OamRam,
    pub oam_addr: u8,
    pub dot: i32,
    pub scanline: i32,
    pub total_cycles: u64,
    pub read_buffer: u8,
    pub mask: u8,
    pub control: u8,
    pub status: u8,
    pub nmi_pending: bool,
    pub t: u16,
    pub v: u16,
    pub fine_x: u8,
    pub write_toggle: bool,
    pub tile_latch: TileLatchState,
    pub bg_shifters: BgShifterState,
    pub sprite_pattern_low: [u8; MAX_SPRITES_PER_LINE],
    pub sprite_pattern_high: [u8; MAX_SPRITES_PER_LINE],
}

impl PpuState {
    /// Encoded length for a PPU owning `chr_len` bytes of graphics memory.
    pub const fn encoded_len(chr_len: usize) -> usize {
        chr_len + PPU_STATE_FIXED_LEN
    }

    /// Appends the little-endian binary layout to `out`.
    pub fn encode(&self, out: &mut impl BufMut) {
        out.put_slice(&self.chr);
        out.put_slice(&self.palette_ram);
        out.put_slice(&self.ciram);
        out.put_slice(&self.oam);
        out.put_u8(self.oam_addr);
        out.put_i32_le(self.dot);
        out.put_i32_le(self.scanline);
        out.put_u64_le(self.total_cycles);
        out.put_u8(self.read_buffer);
        out.put_u8(self.mask);
        out.put_u8(self.control);
        out.put_u8(self.status);
        out.put_u8(u8::from(self.nmi_pending));
        out.put_u16_le(self.t);
        out.put_u16_le(self.v);
        out.put_u8(self.fine_x);
        out.put_u8(u8::from(self.write_toggle));
        out.put_u8(self.tile_latch.tile_id);
        out.put_u8(self.tile_latch.attribute);
        out.put_u8(self.tile_latch.pattern_low);
        out.put_u8(self.tile_latch.pattern_high);
        out.put_u16_le(self.bg_shifters.pattern_low);
        out.put_u16_le(self.bg_shifters.pattern_high);
        out.put_u16_le(self.bg_shifters.attribute_low);
        out.put_u16_le(self.bg_shifters.attribute_high);
        out.put_slice(&self.sprite_pattern_low);
        out.put_slice(&self.sprite_pattern_high);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::encoded_len(self.chr.len()));
        self.encode(&mut out);
        out
    }

    /// Decodes a snapshot taken from a PPU with `chr_len` bytes of graphics
    /// memory. Field ranges are checked here so a decoded state is always
    /// safe to apply.
    pub(crate) fn decode(
        reader: &mut SnapshotReader<'_>,
        chr_len: usize,
    ) -> Result<Self, RestoreError> {
        let chr = reader.bytes(chr_len)?;
        let mut palette_ram = PaletteRam::new();
        palette_ram.copy_from_slice(&reader.bytes(ppu_mem::PALETTE_RAM_SIZE)?);
        let mut ciram = Ciram::new();
        ciram.copy_from_slice(&reader.bytes(ppu_mem::CIRAM_SIZE)?);
        let mut oam = OamRam::new();
        oam.copy_from_slice(&reader.bytes(ppu_mem::OAM_RAM_SIZE)?);

        let state = Self {
            chr,
            palette_ram,
            ciram,
            oam,
            oam_addr: reader.u8()?,
            dot: reader.i32()?,
            scanline: reader.i32()?,
            total_cycles: reader.u64()?,
            read_buffer: reader.u8()?,
            mask: reader.u8()?,
            control: reader.u8()?,
            status: reader.u8()?,
            nmi_pending: reader.bool()?,
            t: reader.u16()?,
            v: reader.u16()?,
            fine_x: reader.u8()?,
            write_toggle: reader.bool()?,
            tile_latch: TileLatchState {
                tile_id: reader.u8()?,
                attribute: reader.u8()?,
                pattern_low: reader.u8()?,
                pattern_high: reader.u8()?,
            },
            bg_shifters: BgShifterState {
                pattern_low: reader.u16()?,
                pattern_high: reader.u16()?,
                attribute_low: reader.u16()?,
                attribute_high: reader.u16()?,
            },
            sprite_pattern_low: reader.array()?,
            sprite_pattern_high: reader.array()?,
        };
        state.validate()?;
        Ok(state)
    }

    /// Checks every field whose range is narrower than its encoding.
    pub(crate) fn validate(&self) -> Result<(), RestoreError> {
        let invalid = |field: &'static str, value: i64| RestoreError::InvalidValue { field, value };

        if !(-1..=340).contains(&self.dot) {
            return Err(invalid("dot", self.dot.into()));
        }
        if !(-1..=260).contains(&self.scanline) {
            return Err(invalid("scanline", self.scanline.into()));
        }
        if self.t > 0x7FFF {
            return Err(invalid("t", self.t.into()));
        }
        if self.v > 0x7FFF {
            return Err(invalid("v", self.v.into()));
        }
        if self.fine_x > 7 {
            return Err(invalid("fine_x", self.fine_x.into()));
        }
        if self.tile_latch.attribute > 3 {
            return Err(invalid("attribute", self.tile_latch.attribute.into()));
        }
        Ok(())
    }
}
