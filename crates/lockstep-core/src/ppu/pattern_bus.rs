use crate::cartridge::{Mapper, MapperAccess, Mirroring};

/// Cartridge-side view the PPU needs while clocking or serving `$2007`.
///
/// The owner of the cartridge hands one of these to every PPU call, so the
/// PPU never keeps a reference back into the bus.
pub trait PpuBus {
    /// Offers a graphics-space read to the cartridge.
    fn read(&mut self, addr: u16) -> MapperAccess;

    /// Offers a graphics-space write to the cartridge.
    fn write(&mut self, addr: u16, value: u8) -> MapperAccess<()>;

    /// Nametable layout currently selected by the cartridge.
    fn mirroring(&self) -> Mirroring;
}

/// Temporary view that lets the PPU reach the mapper without storing a raw
/// pointer. The bus creates one per PPU call, so the borrow stays explicit.
#[derive(Debug)]
pub struct PatternBus<'a> {
    mapper: &'a mut dyn Mapper,
}

impl<'a> PatternBus<'a> {
    pub fn new(mapper: &'a mut dyn Mapper) -> Self {
        Self { mapper }
    }
}

impl PpuBus for PatternBus<'_> {
    #[inline]
    fn read(&mut self, addr: u16) -> MapperAccess {
        self.mapper.ppu_read(addr)
    }

    #[inline]
    fn write(&mut self, addr: u16, value: u8) -> MapperAccess<()> {
        self.mapper.ppu_write(addr, value)
    }

    #[inline]
    fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }
}

/// Bus with no cartridge behind it: every access falls back to the PPU's own
/// memory and nametables fold with a fixed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetachedBus {
    mirroring: Mirroring,
}

impl DetachedBus {
    pub fn new(mirroring: Mirroring) -> Self {
        Self { mirroring }
    }
}

impl Default for DetachedBus {
    fn default() -> Self {
        Self::new(Mirroring::Horizontal)
    }
}

impl PpuBus for DetachedBus {
    fn read(&mut self, _addr: u16) -> MapperAccess {
        MapperAccess::NotHandled
    }

    fn write(&mut self, _addr: u16, _value: u8) -> MapperAccess<()> {
        MapperAccess::NotHandled
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
