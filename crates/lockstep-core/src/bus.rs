//! System bus: arbitrates the CPU address space between work RAM, the PPU
//! register window, the I/O window and the cartridge.
//!
//! ```text
//! $0000-$1FFF  work RAM (2 KiB, mirrored)
//! $2000-$3FFF  PPU registers (mirrored every 8 bytes)
//! $4014        OAM DMA (write)
//! $4000-$401F  attached I/O device
//! $4020-$7FFF  open cartridge space: reads 0, writes dropped
//! $8000-$FFFF  must be decoded by the mapper
//! ```
//!
//! Every access is offered to the mapper before the table above is
//! consulted, and the mapper's answer is never cached.

use std::fmt::Debug;

use dyn_clone::DynClone;
use tracing::{debug, trace, warn};

use crate::{
    cartridge::{Cartridge, MapperAccess, load_cartridge},
    error::{AddressSpace, Error},
    mem_block::cpu as cpu_ram,
    memory::cpu as cpu_mem,
    ppu::{Ppu, buffer::FrameBuffer, palette::Palette, pattern_bus::PatternBus},
    state::{SaveState, SnapshotReader},
};

pub mod savestate;

use savestate::BusState;

/// PPU dots per CPU cycle.
pub const PPU_DOTS_PER_CPU_CYCLE: u64 = 3;

/// Device behind the `$4000-$401F` window (audio, controllers, test ports).
pub trait IoDevice: DynClone + Debug {
    fn read(&mut self, addr: u16) -> u8;

    fn write(&mut self, addr: u16, value: u8);
}

dyn_clone::clone_trait_object!(IoDevice);

#[derive(Debug, Clone)]
pub struct Bus {
    ram: cpu_ram::Ram,
    ppu: Ppu,
    cartridge: Cartridge,
    io: Option<Box<dyn IoDevice>>,
    /// CPU cycles reported through [`Bus::clock`].
    cycles: u64,
    frame_ready: bool,
}

impl Bus {
    /// Builds a console around `cartridge`. The PPU's graphics memory starts
    /// as a copy of the CHR image, or 8 KiB of RAM when there is none.
    pub fn new(cartridge: Cartridge) -> Self {
        let ppu = Ppu::new(cartridge.chr_rom().into());
        Self {
            ram: cpu_ram::Ram::new(),
            ppu,
            cartridge,
            io: None,
            cycles: 0,
            frame_ready: false,
        }
    }

    /// Parses an iNES image and builds a console around it.
    pub fn from_rom_bytes(bytes: &[u8]) -> Result<Self, Error> {
        load_cartridge(bytes).map(Self::new)
    }

    /// Power-cycles RAM, the PPU and the bus latches. The cartridge keeps its
    /// bank selection.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.ppu.reset();
        self.cycles = 0;
        self.frame_ready = false;
    }

    pub fn cpu_read(&mut self, addr: u16) -> Result<u8, Error> {
        if let MapperAccess::Handled(value) = self.cartridge.cpu_read(addr) {
            return Ok(value);
        }
        match addr {
            cpu_mem::INTERNAL_RAM_START..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                Ok(self.ram[usize::from(addr & cpu_mem::INTERNAL_RAM_MASK)])
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                let mut pattern = PatternBus::new(self.cartridge.mapper_mut());
                self.ppu.cpu_read(addr, &mut pattern)
            }
            cpu_mem::IO_REGISTER_BASE..=cpu_mem::IO_REGISTER_END => {
                Ok(self.io.as_mut().map_or(0, |io| io.read(addr)))
            }
            cpu_mem::CARTRIDGE_SPACE_BASE..=cpu_mem::PRG_RAM_END => Ok(0),
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => {
                Err(Error::unmapped(AddressSpace::Cpu, addr))
            }
        }
    }

    pub fn cpu_write(&mut self, addr: u16, value: u8) -> Result<(), Error> {
        if self.cartridge.cpu_write(addr, value).is_handled() {
            return Ok(());
        }
        match addr {
            cpu_mem::INTERNAL_RAM_START..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram[usize::from(addr & cpu_mem::INTERNAL_RAM_MASK)] = value;
                Ok(())
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                let mut pattern = PatternBus::new(self.cartridge.mapper_mut());
                self.ppu.cpu_write(addr, value, &mut pattern)
            }
            cpu_mem::OAM_DMA => self.oam_dma(value),
            cpu_mem::IO_REGISTER_BASE..=cpu_mem::IO_REGISTER_END => {
                if let Some(io) = self.io.as_mut() {
                    io.write(addr, value);
                }
                Ok(())
            }
            cpu_mem::CARTRIDGE_SPACE_BASE..=cpu_mem::PRG_RAM_END => {
                trace!(addr = format_args!("{addr:#06X}"), value, "dropped write");
                Ok(())
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => {
                Err(Error::unmapped(AddressSpace::Cpu, addr))
            }
        }
    }

    /// Fetches program bytes straight from the cartridge, bypassing every
    /// console-side range.
    pub fn read_program_memory(&self, addr: u16) -> Result<u8, Error> {
        self.cartridge
            .cpu_read(addr)
            .handled()
            .ok_or(Error::unmapped(AddressSpace::Cpu, addr))
    }

    /// Copies page `page << 8` into sprite memory, starting at the current OAM
    /// address.
    fn oam_dma(&mut self, page: u8) -> Result<(), Error> {
        let base = u16::from(page) << 8;
        let mut data = [0u8; cpu_mem::OAM_DMA_LEN];
        for (offset, byte) in (0u16..).zip(data.iter_mut()) {
            *byte = self.cpu_read(base | offset)?;
        }
        self.ppu.write_oam_dma(&data);
        debug!(page = format_args!("{page:#04X}"), "OAM DMA");
        Ok(())
    }

    /// Advances the PPU by `cpu_cycles * 3` dots. A completed frame latches
    /// the frame-ready flag until [`Bus::consume_frame_ready`].
    pub fn clock(&mut self, cpu_cycles: u32) {
        self.cycles += u64::from(cpu_cycles);
        let mut pattern = PatternBus::new(self.cartridge.mapper_mut());
        for _ in 0..u64::from(cpu_cycles) * PPU_DOTS_PER_CPU_CYCLE {
            if self.ppu.clock(&mut pattern) {
                self.frame_ready = true;
            }
        }
    }

    /// NMI line as driven by the PPU. Non-destructive.
    pub fn poll_interrupt(&self) -> bool {
        self.ppu.poll_interrupt()
    }

    /// Returns and clears the pending NMI.
    pub fn consume_interrupt(&mut self) -> bool {
        self.ppu.consume_interrupt()
    }

    pub fn poll_frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// Returns and clears the frame-ready latch.
    pub fn consume_frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        self.ppu.frame_buffer()
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// CPU cycles accumulated through [`Bus::clock`].
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.ppu.set_palette(palette);
    }

    pub fn attach_io(&mut self, device: Box<dyn IoDevice>) {
        self.io = Some(device);
    }

    pub fn detach_io(&mut self) -> Option<Box<dyn IoDevice>> {
        self.io.take()
    }

    /// Encodes the whole-console snapshot.
    pub fn serialize(&self) -> Vec<u8> {
        self.save_state().to_bytes()
    }

    /// Restores a snapshot produced by [`Bus::serialize`] on a console built
    /// from the same cartridge. Nothing changes when it is rejected.
    pub fn deserialize(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let mapper = self.cartridge.save_state();
        let mut reader = SnapshotReader::new(bytes);
        let state = BusState::decode(&mut reader, self.ppu.chr().len(), &mapper)
            .and_then(|state| reader.finish().map(|()| state))
            .inspect_err(|err| warn!(%err, "rejected console snapshot"))?;
        self.load_state(&state)
    }
}

impl SaveState for Bus {
    type State = BusState;

    fn save_state(&self) -> BusState {
        BusState {
            ram: self.ram.clone(),
            cycles: self.cycles,
            frame_ready: self.frame_ready,
            ppu: self.ppu.save_state(),
            mapper: self.cartridge.save_state(),
        }
    }

    fn load_state(&mut self, state: &BusState) -> Result<(), Error> {
        self.ppu
            .check_state(&state.ppu)
            .inspect_err(|err| warn!(%err, "rejected console snapshot"))?;
        self.cartridge
            .load_state(&state.mapper)
            .inspect_err(|err| warn!(%err, "rejected console snapshot"))?;
        self.ppu.load_state(&state.ppu)?;

        self.ram = state.ram.clone();
        self.cycles = state.cycles;
        self.frame_ready = state.frame_ready;
        debug!(
            cycles = state.cycles,
            scanline = state.ppu.scanline,
            dot = state.ppu.dot,
            "console snapshot restored"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::{
        cartridge::{Mapper, MapperState, Mirroring, header::Header},
        error::RestoreError,
        memory::ppu as ppu_mem,
        ppu::{DOTS_PER_SCANLINE, SCANLINES_PER_FRAME},
    };

    fn ines(prg_banks: u8, chr_banks: u8, flags6: u8) -> Vec<u8> {
        let mut rom = vec![b'N', b'E', b'S', 0x1A, prg_banks, chr_banks, flags6];
        rom.resize(16, 0);
        for bank in 0..prg_banks {
            rom.extend(std::iter::repeat_n(bank, 16 * 1024));
        }
        rom.extend(std::iter::repeat_n(0xC5, usize::from(chr_banks) * 8 * 1024));
        rom
    }

    fn nrom_bus() -> Bus {
        Bus::from_rom_bytes(&ines(1, 1, 0)).expect("nrom image")
    }

    /// Board that decodes nothing, exposing the console-side fallbacks.
    #[derive(Debug, Clone)]
    struct OpenBoard;

    impl Mapper for OpenBoard {
        fn cpu_read(&self, _addr: u16) -> MapperAccess {
            MapperAccess::NotHandled
        }

        fn cpu_write(&mut self, _addr: u16, _data: u8) -> MapperAccess<()> {
            MapperAccess::NotHandled
        }

        fn mirroring(&self) -> Mirroring {
            Mirroring::Vertical
        }

        fn mapper_id(&self) -> u16 {
            0
        }

        fn name(&self) -> Cow<'static, str> {
            Cow::Borrowed("open")
        }

        fn save_state(&self) -> MapperState {
            MapperState::Nrom
        }

        fn load_state(&mut self, _state: &MapperState) -> Result<(), Error> {
            Ok(())
        }
    }

    fn open_bus() -> Bus {
        let header = Header::parse(&ines(0, 0, 0)).expect("header");
        Bus::new(Cartridge::new(header, Box::new(OpenBoard), Box::default()))
    }

    #[derive(Debug, Clone, Default)]
    struct Recorder {
        writes: Vec<(u16, u8)>,
    }

    impl IoDevice for Recorder {
        fn read(&mut self, addr: u16) -> u8 {
            (addr & 0xFF) as u8
        }

        fn write(&mut self, addr: u16, value: u8) {
            self.writes.push((addr, value));
        }
    }

    #[test]
    fn work_ram_mirrors_every_2k() {
        let mut bus = nrom_bus();
        bus.cpu_write(0x0001, 0x5A).expect("ram write");
        assert_eq!(bus.cpu_read(0x0801).expect("mirror"), 0x5A);
        assert_eq!(bus.cpu_read(0x1801).expect("mirror"), 0x5A);
        bus.cpu_write(0x1FFF, 0x11).expect("ram write");
        assert_eq!(bus.ram()[0x7FF], 0x11);
    }

    #[test]
    fn ppu_registers_repeat_every_eight_bytes() {
        let mut bus = nrom_bus();
        bus.cpu_write(0x3FFE, 0x21).expect("addr hi");
        bus.cpu_write(0x200E, 0x08).expect("addr lo");
        assert_eq!(bus.ppu().scroll_addresses().0.raw(), 0x2108);
    }

    #[test]
    fn nametable_round_trip_through_registers() {
        let mut bus = nrom_bus();
        bus.cpu_write(0x2006, 0x20).expect("addr hi");
        bus.cpu_write(0x2006, 0x00).expect("addr lo");
        bus.cpu_write(0x2007, 0x77).expect("data");
        bus.cpu_write(0x2006, 0x20).expect("addr hi");
        bus.cpu_write(0x2006, 0x00).expect("addr lo");
        bus.cpu_read(0x2007).expect("prime buffer");
        assert_eq!(bus.cpu_read(0x2007).expect("buffered"), 0x77);
    }

    #[test]
    fn prg_space_is_served_by_the_mapper() {
        let mut bus = Bus::from_rom_bytes(&ines(2, 0, 0x20)).expect("uxrom image");
        assert_eq!(bus.cpu_read(0x8000).expect("bank 0"), 0);
        assert_eq!(bus.cpu_read(0xC000).expect("fixed bank"), 1);
        bus.cpu_write(0x8000, 1).expect("bank select");
        assert_eq!(bus.cpu_read(0x8000).expect("bank 1"), 1);
        assert_eq!(bus.read_program_memory(0xFFFF).expect("program"), 1);
    }

    #[test]
    fn program_memory_reads_skip_console_ranges() {
        let bus = nrom_bus();
        let err = bus.read_program_memory(0x0000).expect_err("ram is not program");
        assert!(matches!(
            err,
            Error::AddressOutOfRange {
                space: AddressSpace::Cpu,
                addr: 0x0000
            }
        ));
    }

    #[test]
    fn undecoded_cartridge_space_falls_back() {
        let mut bus = open_bus();
        assert_eq!(bus.cpu_read(0x4020).expect("open space"), 0);
        assert_eq!(bus.cpu_read(0x7FFF).expect("open space"), 0);
        bus.cpu_write(0x6000, 0xFF).expect("dropped write");

        assert!(matches!(
            bus.cpu_read(0x8000),
            Err(Error::AddressOutOfRange {
                space: AddressSpace::Cpu,
                addr: 0x8000
            })
        ));
        assert!(bus.cpu_write(0xFFFF, 0).is_err());
    }

    #[test]
    fn io_window_reaches_attached_device() {
        let mut bus = nrom_bus();
        assert_eq!(bus.cpu_read(0x4016).expect("no device"), 0);

        bus.attach_io(Box::new(Recorder::default()));
        assert_eq!(bus.cpu_read(0x4016).expect("device"), 0x16);
        bus.cpu_write(0x4000, 0x3F).expect("device write");
        assert!(bus.detach_io().is_some());
        assert_eq!(bus.cpu_read(0x4017).expect("detached"), 0);
    }

    #[test]
    fn oam_dma_copies_a_ram_page() {
        let mut bus = nrom_bus();
        for i in 0..=0xFFu16 {
            bus.cpu_write(0x0200 | i, i as u8).expect("ram write");
        }
        bus.cpu_write(0x2003, 0x10).expect("oam addr");
        bus.cpu_write(0x4014, 0x02).expect("dma");

        let oam = bus.ppu().oam();
        assert_eq!(oam[0x10], 0x00);
        assert_eq!(oam[0xFF], 0xEF);
        assert_eq!(oam[0x00], 0xF0);
    }

    #[test]
    fn one_frame_of_cpu_cycles_latches_frame_ready() {
        let mut bus = nrom_bus();
        let frame_dots = (DOTS_PER_SCANLINE * SCANLINES_PER_FRAME) as u64;
        let cycles = frame_dots / PPU_DOTS_PER_CPU_CYCLE;

        bus.clock(cycles as u32);
        assert!(!bus.poll_frame_ready());
        bus.clock(1);
        assert!(bus.poll_frame_ready());
        assert!(bus.consume_frame_ready());
        assert!(!bus.consume_frame_ready());
        assert_eq!(bus.cycles(), cycles + 1);
    }

    #[test]
    fn vblank_nmi_is_visible_through_the_bus() {
        let mut bus = nrom_bus();
        bus.cpu_write(0x2000, 0x80).expect("enable nmi");

        bus.clock(27_500);
        assert!(!bus.poll_interrupt());
        bus.clock(10);
        assert!(bus.poll_interrupt());
        assert!(bus.consume_interrupt());
        assert!(!bus.poll_interrupt());
    }

    #[test]
    fn snapshot_round_trip_restores_console() {
        let mut bus = Bus::from_rom_bytes(&ines(2, 0, 0x20)).expect("uxrom image");
        bus.cpu_write(0x0042, 0x99).expect("ram");
        bus.cpu_write(0x8000, 1).expect("bank select");
        bus.clock(1_000);
        let saved = bus.serialize();
        let expected = bus.save_state();

        bus.cpu_write(0x0042, 0x00).expect("ram");
        bus.cpu_write(0x8000, 0).expect("bank select");
        bus.clock(5_000);

        bus.deserialize(&saved).expect("restore");
        assert_eq!(bus.save_state(), expected);
        assert_eq!(bus.cpu_read(0x0042).expect("ram"), 0x99);
        assert_eq!(bus.cpu_read(0x8000).expect("bank 1"), 1);
    }

    #[test]
    fn rejected_snapshot_leaves_console_untouched() {
        let mut bus = nrom_bus();
        bus.clock(100);
        let mut bytes = bus.serialize();
        let before = bus.save_state();

        let err = bus.deserialize(&bytes[..bytes.len() - 1]).expect_err("truncated");
        assert!(matches!(
            err,
            Error::RestoreFailed(RestoreError::Truncated { .. })
        ));

        bytes.push(0);
        let err = bus.deserialize(&bytes).expect_err("trailing");
        assert!(matches!(
            err,
            Error::RestoreFailed(RestoreError::TrailingBytes(1))
        ));
        assert_eq!(bus.save_state(), before);
    }

    #[test]
    fn snapshot_with_bad_ppu_counter_is_rejected_before_mapper() {
        let mut bus = Bus::from_rom_bytes(&ines(2, 0, 0x20)).expect("uxrom image");
        let mut state = bus.save_state();
        state.ppu.scanline = 300;
        if let MapperState::UxRom(mapper) = &mut state.mapper {
            mapper.selected_bank = 1;
        }

        assert!(bus.load_state(&state).is_err());
        assert_eq!(bus.cpu_read(0x8000).expect("bank 0 kept"), 0);
    }

    #[test]
    fn missing_chr_gives_writable_graphics_ram() {
        let mut bus = Bus::from_rom_bytes(&ines(1, 0, 0)).expect("nrom image");
        assert_eq!(bus.ppu().chr().len(), ppu_mem::CHR_RAM_SIZE);
        bus.cpu_write(0x2006, 0x00).expect("addr hi");
        bus.cpu_write(0x2006, 0x10).expect("addr lo");
        bus.cpu_write(0x2007, 0xAB).expect("chr write");
        assert_eq!(bus.ppu().chr()[0x10], 0xAB);
    }

    #[test]
    fn reset_clears_ram_and_latches() {
        let mut bus = nrom_bus();
        bus.cpu_write(0x0000, 1).expect("ram");
        bus.clock(30_000);
        bus.reset();
        assert_eq!(bus.cpu_read(0x0000).expect("ram"), 0);
        assert_eq!(bus.cycles(), 0);
        assert!(!bus.poll_frame_ready());
        assert_eq!(bus.ppu().scanline(), -1);
    }
}
