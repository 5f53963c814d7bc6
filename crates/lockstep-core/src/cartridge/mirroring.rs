use crate::memory::ppu as ppu_mem;

/// Nametable layout selected by the cartridge.
///
/// The PPU sees four logical 1 KiB nametables (`$2000`, `$2400`, `$2800`,
/// `$2C00`) but only has two physical banks of CIRAM. Each variant decides
/// which bank every logical quadrant lands on:
///
/// ```text
///            $2000 $2400 $2800 $2C00
/// Horizontal   A     A     B     B
/// Vertical     A     B     A     B
/// OneScreenLo  A     A     A     A
/// OneScreenHi  B     B     B     B
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    /// Every quadrant maps onto the first physical bank.
    OneScreenLower,
    /// Every quadrant maps onto the second physical bank.
    OneScreenUpper,
    /// Boards with their own extra VRAM. No extra backing exists here, so the
    /// logical offset is simply wrapped into the 2 KiB of CIRAM.
    FourScreen,
}

impl Mirroring {
    /// Folds a logical nametable offset (`0x000-0xFFF`, relative to `$2000`)
    /// onto a physical CIRAM offset in `0x000-0x7FF`.
    ///
    /// Bits above the 4 KiB window are dropped first, so `$3000-$3EFF`
    /// aliases `$2000-$2EFF`.
    pub fn fold(self, offset: u16) -> u16 {
        let offset = offset & ppu_mem::NAMETABLE_SPAN_MASK;
        let quadrant = offset / ppu_mem::NAMETABLE_SIZE;
        let within = offset % ppu_mem::NAMETABLE_SIZE;
        let bank = match self {
            Self::Horizontal => quadrant >> 1,
            Self::Vertical => quadrant & 1,
            Self::OneScreenLower => 0,
            Self::OneScreenUpper => 1,
            Self::FourScreen => return offset & (ppu_mem::CIRAM_SIZE as u16 - 1),
        };
        bank * ppu_mem::NAMETABLE_SIZE + within
    }
}
