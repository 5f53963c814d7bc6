//! Picture Processing Unit (PPU) core.
//!
//! The PPU advances one dot per [`Ppu::clock`] call over a fixed grid of
//! 341 dots by 262 scanlines (`-1` pre-render, `0..=239` visible, `240`
//! post-render, `241..=260` vertical blank). Every side effect is a function
//! of the `(scanline, dot)` pair and the register state:
//!
//! ```text
//! dot      0   1 ......... 256 257 ...... 320 321 ... 336 337 338 339 340
//! fetch        tile cycles (NT, AT, lo, hi)    prefetch two tiles   NT  NT
//! scroll                   +Y  copy X
//! sprites                      evaluate                                load
//! pixel        composite (visible lines)
//! ```
//!
//! Cartridge access goes through a [`PpuBus`] passed into each call, so the
//! PPU never stores a reference to its owner.

pub mod buffer;
pub mod palette;
pub mod pattern_bus;
pub mod savestate;

mod background_pipeline;
mod registers;
mod sprite;
mod sprite_pipeline;
mod vram;

use core::fmt;

use tracing::{trace, warn};

use crate::{
    error::{Error, RestoreError},
    memory::ppu::{self as ppu_mem, Register as PpuRegister},
    ppu::{
        background_pipeline::{BgPipeline, TileLatch},
        buffer::FrameBuffer,
        palette::{Color, Palette},
        registers::{Control, Mask, Registers, Status},
        savestate::{BgShifterState, PpuState, TileLatchState},
        sprite_pipeline::SpritePipeline,
        vram::Vram,
    },
    state::{SaveState, SnapshotReader},
};

pub use pattern_bus::{DetachedBus, PatternBus, PpuBus};
pub use registers::VramAddr;

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;

/// Dots per scanline, including the idle dot 0.
pub const DOTS_PER_SCANLINE: i32 = 341;
/// Scanlines per frame, pre-render line included.
pub const SCANLINES_PER_FRAME: i32 = 262;

const PRERENDER_SCANLINE: i32 = -1;
const VISIBLE_SCANLINES: i32 = SCREEN_HEIGHT as i32;
const VBLANK_START_SCANLINE: i32 = 241;
const LAST_SCANLINE: i32 = 260;

#[derive(Clone)]
pub struct Ppu {
    /// CPU visible registers, OAM and the `v/t/x/w` latches.
    registers: Registers,
    /// Pattern tables, nametable RAM and palette RAM.
    vram: Vram,
    /// Current dot within the scanline (0..=340).
    dot: i32,
    /// Current scanline (-1..=260).
    scanline: i32,
    /// Dots executed since power-on.
    total_cycles: u64,
    /// Pending vertical blank interrupt.
    nmi_pending: bool,
    bg: BgPipeline,
    sprites: SpritePipeline,
    framebuffer: FrameBuffer,
    palette: Palette,
}

impl fmt::Debug for Ppu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ppu")
            .field("registers", &self.registers)
            .field("dot", &self.dot)
            .field("scanline", &self.scanline)
            .field("total_cycles", &self.total_cycles)
            .field("nmi_pending", &self.nmi_pending)
            .finish_non_exhaustive()
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new(Box::default())
    }
}

impl Ppu {
    /// Creates a PPU in its power-on state. `chr` becomes the built-in
    /// graphics memory; an empty image selects 8 KiB of CHR RAM.
    pub fn new(chr: Box<[u8]>) -> Self {
        Self {
            registers: Registers::new(),
            vram: Vram::new(chr),
            dot: 0,
            scanline: PRERENDER_SCANLINE,
            total_cycles: 0,
            nmi_pending: false,
            bg: BgPipeline::default(),
            sprites: SpritePipeline::default(),
            framebuffer: FrameBuffer::new(),
            palette: Palette::default(),
        }
    }

    /// Restores the power-on state. Graphics memory and the selected system
    /// palette are kept.
    pub fn reset(&mut self) {
        self.registers = Registers::new();
        self.vram.ciram.fill(0);
        self.vram.palette_ram.fill(0);
        self.dot = 0;
        self.scanline = PRERENDER_SCANLINE;
        self.total_cycles = 0;
        self.nmi_pending = false;
        self.bg = BgPipeline::default();
        self.sprites = SpritePipeline::default();
        self.framebuffer.clear();
    }

    pub fn dot(&self) -> i32 {
        self.dot
    }

    pub fn scanline(&self) -> i32 {
        self.scanline
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Output image. Only consistent between a completed frame and the next
    /// visible dot.
    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    /// Built-in graphics memory.
    pub fn chr(&self) -> &[u8] {
        &self.vram.chr
    }

    /// Primary sprite memory.
    pub fn oam(&self) -> &[u8] {
        &self.registers.oam
    }

    /// Current (`v`) and temporary (`t`) scroll addresses.
    pub fn scroll_addresses(&self) -> (VramAddr, VramAddr) {
        (self.registers.vram.v, self.registers.vram.t)
    }

    /// Color a `(palette row, pixel)` pair resolves to. Rows 0..=3 are the
    /// background palettes, 4..=7 the sprite palettes.
    pub fn palette_color(&self, row: u8, pixel: u8) -> Color {
        self.palette.color(self.vram.palette_entry(row, pixel))
    }

    /// Returns whether a vertical blank interrupt is pending.
    pub fn poll_interrupt(&self) -> bool {
        self.nmi_pending
    }

    /// Returns and clears the pending vertical blank interrupt.
    pub fn consume_interrupt(&mut self) -> bool {
        core::mem::take(&mut self.nmi_pending)
    }

    /// Handles CPU writes to the mirrored PPU register space (`$2000-$3FFF`).
    pub fn cpu_write(&mut self, addr: u16, value: u8, bus: &mut impl PpuBus) -> Result<(), Error> {
        match PpuRegister::from_cpu_addr(addr) {
            PpuRegister::Control => self.write_control(value),
            PpuRegister::Mask => self.write_mask(value),
            PpuRegister::Status => {}
            PpuRegister::OamAddr => self.write_oam_addr(value),
            PpuRegister::OamData => self.write_oam_data(value),
            PpuRegister::Scroll => self.write_scroll(value),
            PpuRegister::Addr => self.write_addr(value),
            PpuRegister::Data => self.write_data(value, bus)?,
        }
        Ok(())
    }

    /// Handles CPU reads from the mirrored PPU register space (`$2000-$3FFF`).
    /// Write-only registers read as 0.
    pub fn cpu_read(&mut self, addr: u16, bus: &mut impl PpuBus) -> Result<u8, Error> {
        Ok(match PpuRegister::from_cpu_addr(addr) {
            PpuRegister::Status => self.read_status(),
            PpuRegister::OamData => self.read_oam_data(),
            PpuRegister::Data => self.read_data(bus)?,
            _ => 0,
        })
    }

    /// `$2000`. Switching NMI generation on while vertical blank is already
    /// flagged raises the interrupt immediately.
    pub fn write_control(&mut self, value: u8) {
        if self.registers.write_control(value) {
            self.nmi_pending = true;
        }
    }

    /// `$2001`.
    pub fn write_mask(&mut self, value: u8) {
        self.registers.mask = Mask::from_bits_retain(value);
    }

    /// `$2002`. Returns the flags as they were before the read clears
    /// vertical blank and the write toggle.
    pub fn read_status(&mut self) -> u8 {
        self.registers.read_status()
    }

    /// `$2003`.
    pub fn write_oam_addr(&mut self, value: u8) {
        self.registers.oam_addr = value;
    }

    /// `$2004` write; the OAM address advances.
    pub fn write_oam_data(&mut self, value: u8) {
        self.registers.write_oam_data(value);
    }

    /// `$2004` read; the OAM address does not move.
    pub fn read_oam_data(&self) -> u8 {
        self.registers.read_oam_data()
    }

    /// Bulk sprite memory upload starting at the current OAM address and
    /// wrapping at 256.
    pub fn write_oam_dma(&mut self, data: &[u8]) {
        for &byte in data {
            self.registers.write_oam_data(byte);
        }
    }

    /// `$2005`.
    pub fn write_scroll(&mut self, value: u8) {
        self.registers.vram.write_scroll(value);
    }

    /// `$2006`.
    pub fn write_addr(&mut self, value: u8) {
        self.registers.vram.write_addr(value);
    }

    /// `$2007` read. Returns the buffered byte and refills the buffer, except
    /// for palette addresses which answer immediately.
    pub fn read_data(&mut self, bus: &mut impl PpuBus) -> Result<u8, Error> {
        let addr = self.registers.vram.v.raw();
        let data = self.vram.read(bus, addr)?;
        self.increment_vram_addr();

        if (ppu_mem::PALETTE_BASE..=ppu_mem::PALETTE_END).contains(&addr) {
            return Ok(data);
        }
        Ok(core::mem::replace(&mut self.registers.vram_buffer, data))
    }

    /// `$2007` write.
    pub fn write_data(&mut self, value: u8, bus: &mut impl PpuBus) -> Result<(), Error> {
        let addr = self.registers.vram.v.raw();
        self.vram.write(bus, addr, value)?;
        self.increment_vram_addr();
        Ok(())
    }

    fn increment_vram_addr(&mut self) {
        let step = self.registers.control.vram_increment();
        self.registers.vram.v.increment(step);
    }

    /// Advances the PPU by one dot. Returns `true` on the dot that completes
    /// a frame.
    pub fn clock(&mut self, bus: &mut impl PpuBus) -> bool {
        self.total_cycles = self.total_cycles.wrapping_add(1);

        if self.scanline < VISIBLE_SCANLINES {
            self.render_dot(bus);
        }

        if self.scanline == VBLANK_START_SCANLINE && self.dot == 1 {
            self.registers.status.insert(Status::VERTICAL_BLANK);
            if self.registers.control.nmi_enabled() {
                self.nmi_pending = true;
            }
        }

        if (0..VISIBLE_SCANLINES).contains(&self.scanline) && (1..=256).contains(&self.dot) {
            self.compose_pixel();
        }

        self.advance()
    }

    /// Fetch, scroll and sprite work for the pre-render and visible lines.
    fn render_dot(&mut self, bus: &mut impl PpuBus) {
        let dot = self.dot;
        let rendering = self.registers.mask.rendering_enabled();

        if self.scanline == PRERENDER_SCANLINE && dot == 1 {
            self.registers.status.remove(
                Status::VERTICAL_BLANK | Status::SPRITE_ZERO_HIT | Status::SPRITE_OVERFLOW,
            );
            self.sprites.reset_evaluation();
            self.sprites.clear_patterns();
        }

        if (2..=257).contains(&dot) || (321..=337).contains(&dot) {
            self.update_shifters();
            self.fetch_background(bus, rendering);
        }

        if dot == 256 && rendering {
            self.registers.vram.v.increment_y();
        }

        if dot == 257 {
            self.bg.reload();
            if rendering {
                let t = self.registers.vram.t;
                self.registers.vram.v.copy_horizontal(t);
            }
        }

        if dot == 338 || dot == 340 {
            let addr = self.registers.vram.v.tile_addr();
            self.bg.next.tile_id = self.vram.fetch(bus, addr);
        }

        if self.scanline == PRERENDER_SCANLINE && (280..=304).contains(&dot) && rendering {
            let t = self.registers.vram.t;
            self.registers.vram.v.copy_vertical(t);
        }

        if self.scanline >= 0 {
            if dot == 257 {
                self.evaluate_sprites();
            }
            if dot == 340 {
                self.load_sprite_patterns(bus);
            }
        }
    }

    /// One step of the 8-dot tile fetch cycle.
    fn fetch_background(&mut self, bus: &mut impl PpuBus, rendering: bool) {
        let v = self.registers.vram.v;
        match (self.dot - 1) % 8 {
            0 => {
                self.bg.reload();
                self.bg.next.tile_id = self.vram.fetch(bus, v.tile_addr());
            }
            2 => {
                let mut attribute = self.vram.fetch(bus, v.attribute_addr());
                if v.coarse_y() & 0x02 != 0 {
                    attribute >>= 4;
                }
                if v.coarse_x() & 0x02 != 0 {
                    attribute >>= 2;
                }
                self.bg.next.attribute = attribute & 0x03;
            }
            4 => {
                let addr = self.background_pattern_addr(v);
                self.bg.next.pattern_low = self.vram.fetch(bus, addr);
            }
            6 => {
                let addr = self.background_pattern_addr(v) + 8;
                self.bg.next.pattern_high = self.vram.fetch(bus, addr);
            }
            7 if rendering => self.registers.vram.v.increment_x(),
            _ => {}
        }
    }

    fn background_pattern_addr(&self, v: VramAddr) -> u16 {
        self.registers.control.background_pattern_table()
            + u16::from(self.bg.next.tile_id) * 16
            + u16::from(v.fine_y())
    }

    fn update_shifters(&mut self) {
        let mask = self.registers.mask;
        if mask.show_background() {
            self.bg.shift();
        }
        if mask.show_sprites() && self.dot < 258 {
            self.sprites.shift();
        }
    }

    fn evaluate_sprites(&mut self) {
        let height = self.registers.control.sprite_height();
        if self
            .sprites
            .evaluate(&self.registers.oam, self.scanline, height)
        {
            self.registers.status.insert(Status::SPRITE_OVERFLOW);
        }
    }

    fn load_sprite_patterns(&mut self, bus: &mut impl PpuBus) {
        let control = self.registers.control;
        let chr = &self.vram.chr;
        self.sprites.load_patterns(
            self.scanline,
            control.sprite_height(),
            control.sprite_pattern_table(),
            |addr| vram::fetch_pattern(chr, bus, addr),
        );
    }

    /// Picks the background or sprite pixel for the current dot and stores
    /// its color.
    fn compose_pixel(&mut self) {
        let mask = self.registers.mask;
        let (bg_palette, bg_pixel) = if mask.show_background() {
            self.bg.sample(self.registers.vram.x)
        } else {
            (0, 0)
        };
        let sprite = if mask.show_sprites() {
            self.sprites.sample()
        } else {
            None
        };

        let (row, pixel) = match sprite {
            Some(sprite) if bg_pixel == 0 => (sprite.palette, sprite.color),
            Some(sprite) => {
                if sprite.sprite_zero && self.sprites.sprite_zero_possible() {
                    self.detect_sprite_zero_hit(mask);
                }
                if sprite.behind_background {
                    (bg_palette, bg_pixel)
                } else {
                    (sprite.palette, sprite.color)
                }
            }
            None if bg_pixel != 0 => (bg_palette, bg_pixel),
            None => (0, 0),
        };

        let color = self.palette.color(self.vram.palette_entry(row, pixel));
        self.framebuffer
            .write(self.dot - 1, self.scanline, color.packed());
    }

    /// Sprite 0 overlapped an opaque background pixel. The leftmost 8 dots
    /// only count when neither layer is clipped there.
    fn detect_sprite_zero_hit(&mut self, mask: Mask) {
        if !(mask.show_background() && mask.show_sprites()) {
            return;
        }
        let first_dot = if mask.left_column_unclipped() { 1 } else { 9 };
        if (first_dot..=258).contains(&self.dot) {
            self.registers.status.insert(Status::SPRITE_ZERO_HIT);
        }
    }

    fn advance(&mut self) -> bool {
        self.dot += 1;
        if self.dot < DOTS_PER_SCANLINE {
            return false;
        }

        self.dot = 0;
        self.scanline += 1;
        if self.scanline <= LAST_SCANLINE {
            return false;
        }

        self.scanline = PRERENDER_SCANLINE;
        self.registers.status.remove(Status::VERTICAL_BLANK);
        self.nmi_pending = false;
        trace!(total_cycles = self.total_cycles, "frame complete");
        true
    }

    /// Encodes the PPU snapshot in its binary layout.
    pub fn serialize(&self) -> Vec<u8> {
        self.save_state().to_bytes()
    }

    /// Restores a snapshot produced by [`Ppu::serialize`]. The graphics
    /// memory size must match; nothing changes when the snapshot is rejected.
    pub fn deserialize(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let mut reader = SnapshotReader::new(bytes);
        let state = PpuState::decode(&mut reader, self.vram.chr.len())
            .and_then(|state| reader.finish().map(|()| state))
            .inspect_err(|err| warn!(%err, "rejected PPU snapshot"))?;
        self.load_state(&state)
    }
}

impl Ppu {
    /// Checks that `state` can be applied to this PPU without touching it.
    pub(crate) fn check_state(&self, state: &PpuState) -> Result<(), RestoreError> {
        if state.chr.len() != self.vram.chr.len() {
            return Err(RestoreError::ChrSizeMismatch {
                expected: state.chr.len(),
                actual: self.vram.chr.len(),
            });
        }
        state.validate()
    }
}

impl SaveState for Ppu {
    type State = PpuState;

    fn save_state(&self) -> PpuState {
        let regs = &self.registers;
        let [pattern_low, pattern_high, attribute_low, attribute_high] = self.bg.shifters();
        let (sprite_pattern_low, sprite_pattern_high) = self.sprites.patterns();
        let TileLatch {
            tile_id,
            attribute,
            pattern_low: latch_low,
            pattern_high: latch_high,
        } = self.bg.next;

        PpuState {
            chr: self.vram.chr.to_vec(),
            palette_ram: self.vram.palette_ram.clone(),
            ciram: self.vram.ciram.clone(),
            oam: regs.oam.clone(),
            oam_addr: regs.oam_addr,
            dot: self.dot,
            scanline: self.scanline,
            total_cycles: self.total_cycles,
            read_buffer: regs.vram_buffer,
            mask: regs.mask.bits(),
            control: regs.control.bits(),
            status: regs.status.bits(),
            nmi_pending: self.nmi_pending,
            t: regs.vram.t.raw(),
            v: regs.vram.v.raw(),
            fine_x: regs.vram.x,
            write_toggle: regs.vram.w,
            tile_latch: TileLatchState {
                tile_id,
                attribute,
                pattern_low: latch_low,
                pattern_high: latch_high,
            },
            bg_shifters: BgShifterState {
                pattern_low,
                pattern_high,
                attribute_low,
                attribute_high,
            },
            sprite_pattern_low,
            sprite_pattern_high,
        }
    }

    fn load_state(&mut self, state: &PpuState) -> Result<(), Error> {
        self.check_state(state)
            .inspect_err(|err| warn!(%err, "rejected PPU snapshot"))?;

        self.vram.chr.copy_from_slice(&state.chr);
        self.vram.palette_ram = state.palette_ram.clone();
        self.vram.ciram = state.ciram.clone();

        let regs = &mut self.registers;
        regs.oam = state.oam.clone();
        regs.oam_addr = state.oam_addr;
        regs.vram_buffer = state.read_buffer;
        regs.mask = Mask::from_bits_retain(state.mask);
        regs.control = Control::from_bits_retain(state.control);
        regs.status = Status::from_bits_retain(state.status);
        regs.vram.t.set_raw(state.t);
        regs.vram.v.set_raw(state.v);
        regs.vram.x = state.fine_x;
        regs.vram.w = state.write_toggle;

        self.dot = state.dot;
        self.scanline = state.scanline;
        self.total_cycles = state.total_cycles;
        self.nmi_pending = state.nmi_pending;

        self.bg.next = TileLatch {
            tile_id: state.tile_latch.tile_id,
            attribute: state.tile_latch.attribute,
            pattern_low: state.tile_latch.pattern_low,
            pattern_high: state.tile_latch.pattern_high,
        };
        let shifters = &state.bg_shifters;
        self.bg.set_shifters([
            shifters.pattern_low,
            shifters.pattern_high,
            shifters.attribute_low,
            shifters.attribute_high,
        ]);

        self.sprites.reset_evaluation();
        self.sprites
            .set_patterns(state.sprite_pattern_low, state.sprite_pattern_high);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::Mirroring;

    const FRAME_DOTS: usize = (DOTS_PER_SCANLINE * SCANLINES_PER_FRAME) as usize;

    fn bus() -> DetachedBus {
        DetachedBus::new(Mirroring::Horizontal)
    }

    fn set_addr(ppu: &mut Ppu, addr: u16) {
        ppu.write_addr((addr >> 8) as u8);
        ppu.write_addr(addr as u8);
    }

    fn run_until(ppu: &mut Ppu, bus: &mut DetachedBus, scanline: i32, dot: i32) {
        while ppu.scanline() != scanline || ppu.dot() != dot {
            ppu.clock(bus);
        }
    }

    #[test]
    fn one_frame_is_exactly_341_by_262_dots() {
        let mut ppu = Ppu::default();
        let mut bus = bus();
        let mut frames = 0;
        for _ in 0..FRAME_DOTS {
            if ppu.clock(&mut bus) {
                frames += 1;
            }
        }
        assert_eq!(frames, 1);
        assert_eq!((ppu.dot(), ppu.scanline()), (0, -1));
        assert_eq!(ppu.total_cycles(), FRAME_DOTS as u64);
    }

    #[test]
    fn frame_signal_arrives_on_last_dot() {
        let mut ppu = Ppu::default();
        let mut bus = bus();
        for _ in 0..FRAME_DOTS - 1 {
            assert!(!ppu.clock(&mut bus));
        }
        assert_eq!((ppu.dot(), ppu.scanline()), (340, 260));
        assert!(ppu.clock(&mut bus));
    }

    #[test]
    fn vblank_sets_flag_and_latches_nmi() {
        let mut ppu = Ppu::default();
        let mut bus = bus();
        ppu.write_control(Control::GENERATE_NMI.bits());
        run_until(&mut ppu, &mut bus, 241, 2);
        assert!(ppu.poll_interrupt());
        assert!(ppu.consume_interrupt());
        assert!(!ppu.poll_interrupt());
        assert_ne!(ppu.read_status() & Status::VERTICAL_BLANK.bits(), 0);
    }

    #[test]
    fn vblank_without_nmi_enable_only_sets_flag() {
        let mut ppu = Ppu::default();
        let mut bus = bus();
        run_until(&mut ppu, &mut bus, 241, 2);
        assert!(!ppu.poll_interrupt());
        assert!(ppu.registers.status.contains(Status::VERTICAL_BLANK));
    }

    #[test]
    fn status_read_returns_value_before_clearing() {
        let mut ppu = Ppu::default();
        ppu.registers.status = Status::VERTICAL_BLANK | Status::SPRITE_ZERO_HIT;
        ppu.write_scroll(0x10);
        assert!(ppu.registers.vram.w);

        let value = ppu.read_status();
        assert_eq!(value, 0xC0);
        assert!(!ppu.registers.vram.w);
        assert!(!ppu.registers.status.contains(Status::VERTICAL_BLANK));
        assert!(ppu.registers.status.contains(Status::SPRITE_ZERO_HIT));
        assert_eq!(ppu.read_status(), 0x40);
    }

    #[test]
    fn enabling_nmi_during_vblank_fires_immediately() {
        let mut ppu = Ppu::default();
        ppu.registers.status.insert(Status::VERTICAL_BLANK);
        ppu.write_control(0x80);
        assert!(ppu.poll_interrupt());

        // Rewriting with NMI already on is not an edge.
        ppu.consume_interrupt();
        ppu.write_control(0x80);
        assert!(!ppu.poll_interrupt());
    }

    #[test]
    fn control_write_updates_temporary_nametable() {
        let mut ppu = Ppu::default();
        ppu.write_control(0b10);
        assert_eq!(ppu.scroll_addresses().1.nametable(), 0b10);
    }

    #[test]
    fn data_reads_are_buffered_one_behind() {
        let mut ppu = Ppu::default();
        let mut bus = bus();
        set_addr(&mut ppu, 0x2000);
        ppu.write_data(0x12, &mut bus).expect("write");
        ppu.write_data(0x34, &mut bus).expect("write");

        set_addr(&mut ppu, 0x2000);
        assert_eq!(ppu.read_data(&mut bus).expect("read"), 0x00);
        assert_eq!(ppu.read_data(&mut bus).expect("read"), 0x12);
        assert_eq!(ppu.read_data(&mut bus).expect("read"), 0x34);
    }

    #[test]
    fn palette_reads_bypass_buffer_and_alias_backdrop() {
        let mut ppu = Ppu::default();
        let mut bus = bus();
        set_addr(&mut ppu, 0x3F10);
        ppu.write_data(0x2C, &mut bus).expect("write");

        set_addr(&mut ppu, 0x3F00);
        assert_eq!(ppu.read_data(&mut bus).expect("read"), 0x2C);
        assert_eq!(ppu.registers.vram_buffer, 0);
    }

    #[test]
    fn increment_32_walks_down_a_column() {
        let mut ppu = Ppu::default();
        let mut bus = bus();
        ppu.write_control(Control::INCREMENT_32.bits());
        set_addr(&mut ppu, 0x2000);
        ppu.write_data(1, &mut bus).expect("write");
        ppu.write_data(2, &mut bus).expect("write");
        assert_eq!(ppu.scroll_addresses().0.raw(), 0x2040);
        assert_eq!(ppu.vram.ciram[0x20], 2);
    }

    #[test]
    fn data_port_beyond_palette_is_fatal() {
        let mut ppu = Ppu::default();
        let mut bus = bus();
        set_addr(&mut ppu, 0x3FFF);
        ppu.write_data(0, &mut bus).expect("last palette byte");
        let err = ppu.write_data(0, &mut bus).expect_err("$4000");
        assert!(matches!(err, Error::AddressOutOfRange { addr: 0x4000, .. }));
    }

    #[test]
    fn oam_dma_wraps_from_current_address() {
        let mut ppu = Ppu::default();
        ppu.write_oam_addr(0xFE);
        let data: Vec<u8> = (0..=255).collect();
        ppu.write_oam_dma(&data);
        assert_eq!(ppu.oam()[0xFE], 0);
        assert_eq!(ppu.oam()[0xFF], 1);
        assert_eq!(ppu.oam()[0x00], 2);
        assert_eq!(ppu.registers.oam_addr, 0xFE);
    }

    #[test]
    fn oam_data_read_does_not_advance() {
        let mut ppu = Ppu::default();
        ppu.write_oam_addr(0x10);
        ppu.write_oam_data(0xAB);
        ppu.write_oam_addr(0x10);
        assert_eq!(ppu.read_oam_data(), 0xAB);
        assert_eq!(ppu.read_oam_data(), 0xAB);
    }

    #[test]
    fn register_ports_decode_mirrors() {
        let mut ppu = Ppu::default();
        let mut bus = bus();
        ppu.cpu_write(0x3FF8, 0x80, &mut bus).expect("control mirror");
        assert!(ppu.registers.control.nmi_enabled());
        assert_eq!(ppu.cpu_read(0x2000, &mut bus).expect("write-only"), 0);
    }

    #[test]
    fn ninth_sprite_on_a_line_sets_overflow() {
        let mut ppu = Ppu::default();
        let mut bus = bus();
        for i in 0..9u8 {
            ppu.write_oam_addr(i * 4);
            for byte in [20, 1, 0, i * 8] {
                ppu.write_oam_data(byte);
            }
        }
        run_until(&mut ppu, &mut bus, 19, 258);
        assert!(!ppu.registers.status.contains(Status::SPRITE_OVERFLOW));
        run_until(&mut ppu, &mut bus, 20, 258);
        assert!(ppu.registers.status.contains(Status::SPRITE_OVERFLOW));

        run_until(&mut ppu, &mut bus, -1, 2);
        assert!(!ppu.registers.status.contains(Status::SPRITE_OVERFLOW));
    }

    /// Solid tile 1 in pattern table 0 and a solid sprite 0 over it.
    fn sprite_zero_scene(mask: u8) -> (Ppu, DetachedBus) {
        let mut chr = vec![0u8; 0x2000];
        chr[0x10..0x18].fill(0xFF);
        let mut ppu = Ppu::new(chr.into_boxed_slice());
        let mut bus = bus();

        set_addr(&mut ppu, 0x2000);
        for _ in 0..32 * 30 {
            ppu.write_data(1, &mut bus).expect("nametable");
        }
        ppu.write_oam_addr(0);
        for byte in [30, 1, 0, 40] {
            ppu.write_oam_data(byte);
        }
        ppu.write_mask(mask);
        (ppu, bus)
    }

    #[test]
    fn sprite_zero_hit_needs_both_layers() {
        let both = Mask::SHOW_BACKGROUND | Mask::SHOW_SPRITES;
        let (mut ppu, mut bus) = sprite_zero_scene(both.bits());
        run_until(&mut ppu, &mut bus, 31, 40);
        assert!(!ppu.registers.status.contains(Status::SPRITE_ZERO_HIT));
        run_until(&mut ppu, &mut bus, 31, 50);
        assert!(ppu.registers.status.contains(Status::SPRITE_ZERO_HIT));

        let (mut ppu, mut bus) = sprite_zero_scene(Mask::SHOW_SPRITES.bits());
        run_until(&mut ppu, &mut bus, 40, 0);
        assert!(!ppu.registers.status.contains(Status::SPRITE_ZERO_HIT));
    }

    fn write_palette(ppu: &mut Ppu, bus: &mut DetachedBus, addr: u16, colors: &[u8]) {
        set_addr(ppu, addr);
        for &color in colors {
            ppu.write_data(color, bus).expect("palette");
        }
        set_addr(ppu, 0);
    }

    fn run_frame(ppu: &mut Ppu, bus: &mut DetachedBus) {
        while !ppu.clock(bus) {}
    }

    #[test]
    fn clipped_left_column_suppresses_sprite_zero_hit() {
        let layers = Mask::SHOW_BACKGROUND | Mask::SHOW_SPRITES;
        for (mask, expect_hit) in [
            (layers, false),
            (layers | Mask::SHOW_BACKGROUND_LEFT | Mask::SHOW_SPRITES_LEFT, true),
        ] {
            let (mut ppu, mut bus) = sprite_zero_scene(mask.bits());
            ppu.write_oam_addr(3);
            ppu.write_oam_data(0);
            run_until(&mut ppu, &mut bus, 40, 0);
            assert_eq!(
                ppu.registers.status.contains(Status::SPRITE_ZERO_HIT),
                expect_hit,
                "mask {mask:?}"
            );
        }
    }

    #[test]
    fn priority_bit_picks_between_opaque_pixels() {
        for (attribute, expected) in [(0x20, 0x16), (0x00, 0x02)] {
            let mask = Mask::SHOW_BACKGROUND | Mask::SHOW_SPRITES;
            let (mut ppu, mut bus) = sprite_zero_scene(mask.bits());
            ppu.write_oam_addr(2);
            ppu.write_oam_data(attribute);
            write_palette(&mut ppu, &mut bus, 0x3F00, &[0x0F, 0x16]);
            write_palette(&mut ppu, &mut bus, 0x3F10, &[0x0F, 0x02]);
            run_frame(&mut ppu, &mut bus);

            let color = ppu.palette().color(expected).packed();
            assert_eq!(ppu.frame_buffer().pixel(44, 33), Some(color));
            // Outside the sprite the background shows either way.
            let background = ppu.palette().color(0x16).packed();
            assert_eq!(ppu.frame_buffer().pixel(20, 33), Some(background));
        }
    }

    #[test]
    fn tall_sprites_draw_both_tiles() {
        // Tile 2 has only its first row set, tile 3 only its last.
        let mut chr = vec![0u8; 0x2000];
        chr[0x20] = 0xFF;
        chr[0x37] = 0xFF;
        let mut ppu = Ppu::new(chr.into_boxed_slice());
        let mut bus = bus();
        write_palette(&mut ppu, &mut bus, 0x3F00, &[0x0F]);
        write_palette(&mut ppu, &mut bus, 0x3F10, &[0x0F, 0x30]);
        ppu.write_oam_addr(0);
        for byte in [30, 0x02, 0x00, 40] {
            ppu.write_oam_data(byte);
        }
        ppu.write_control(Control::SPRITE_SIZE_16.bits());
        ppu.write_mask(Mask::SHOW_SPRITES.bits());
        run_frame(&mut ppu, &mut bus);

        let sprite = ppu.palette().color(0x30).packed();
        let backdrop = ppu.palette().color(0x0F).packed();
        let frame = ppu.frame_buffer();
        assert_eq!(frame.pixel(40, 31), Some(sprite));
        assert_eq!(frame.pixel(47, 31), Some(sprite));
        assert_eq!(frame.pixel(40, 32), Some(backdrop));
        assert_eq!(frame.pixel(40, 45), Some(backdrop));
        assert_eq!(frame.pixel(40, 46), Some(sprite));
        assert_eq!(frame.pixel(40, 47), Some(backdrop));
    }

    #[test]
    fn background_pixels_use_the_tile_palette() {
        let (mut ppu, mut bus) = sprite_zero_scene(Mask::SHOW_BACKGROUND.bits());
        set_addr(&mut ppu, 0x3F00);
        for byte in [0x0F, 0x16, 0x27, 0x30] {
            ppu.write_data(byte, &mut bus).expect("palette");
        }
        set_addr(&mut ppu, 0);
        let mut frame = false;
        while !frame {
            frame = ppu.clock(&mut bus);
        }

        let expected = ppu.palette().color(0x16).packed();
        assert_eq!(ppu.frame_buffer().pixel(0, 0), Some(expected));
        assert_eq!(ppu.frame_buffer().pixel(255, 239), Some(expected));
    }

    #[test]
    fn snapshot_round_trips_fresh_and_mid_frame() {
        let mut ppu = Ppu::default();
        let mut bus = bus();
        let fresh = ppu.serialize();
        let mut copy = Ppu::default();
        copy.deserialize(&fresh).expect("fresh snapshot");
        assert_eq!(copy.save_state(), ppu.save_state());

        ppu.write_mask(0x1E);
        ppu.write_scroll(0x35);
        for _ in 0..50_000 {
            ppu.clock(&mut bus);
        }
        assert_ne!(ppu.dot(), 0);
        let mid = ppu.serialize();
        copy.deserialize(&mid).expect("mid-frame snapshot");
        assert_eq!(copy.serialize(), mid);
        assert_eq!((copy.dot(), copy.scanline()), (ppu.dot(), ppu.scanline()));
    }

    #[test]
    fn snapshot_with_other_chr_size_is_rejected_untouched() {
        let mut ppu = Ppu::new(vec![0; 0x4000].into_boxed_slice());
        let before = ppu.serialize();
        let foreign = Ppu::default().serialize();

        let err = ppu.deserialize(&foreign).expect_err("size mismatch");
        assert!(matches!(err, Error::RestoreFailed(RestoreError::Truncated { .. })));
        assert_eq!(ppu.serialize(), before);

        let err = ppu
            .load_state(&Ppu::default().save_state())
            .expect_err("size mismatch");
        assert!(matches!(
            err,
            Error::RestoreFailed(RestoreError::ChrSizeMismatch {
                expected: 0x2000,
                actual: 0x4000
            })
        ));
    }

    #[test]
    fn reset_keeps_graphics_memory() {
        let mut chr = vec![0u8; 0x2000];
        chr[5] = 0x77;
        let mut ppu = Ppu::new(chr.into_boxed_slice());
        let mut bus = bus();
        set_addr(&mut ppu, 0x2001);
        ppu.write_data(9, &mut bus).expect("write");
        ppu.clock(&mut bus);
        ppu.reset();
        assert_eq!(ppu.chr()[5], 0x77);
        assert_eq!(ppu.vram.ciram[1], 0);
        assert_eq!((ppu.dot(), ppu.scanline(), ppu.total_cycles()), (0, -1, 0));
    }
}
