/// 16-bit left-shifting register used by the background pipeline.
///
/// Layout:
///   [ high 8 bits | low 8 bits ]
///
/// The high byte holds pixels that are currently "in flight" toward the screen,
/// the low byte is used to load the next 8 pixels (or repeated palette bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
struct Shift16(u16);

impl Shift16 {
    /// Replaces the low byte while the high byte keeps shifting out.
    #[inline]
    fn reload_low_byte(&mut self, byte: u8) {
        self.0 = (self.0 & 0xFF00) | u16::from(byte);
    }

    /// Returns the bit at position `15 - fine_x`.
    ///
    /// Fine X selects which of the in-flight bits is visible instead of
    /// delaying the shifts.
    #[inline]
    fn bit_with_fine_x(&self, fine_x: u8) -> u8 {
        let mux = 0x8000u16 >> (fine_x & 0b111);
        u8::from(self.0 & mux != 0)
    }

    #[inline]
    fn shift(&mut self) {
        self.0 <<= 1;
    }
}

/// Bytes fetched during the current 8-dot tile cycle, waiting to be loaded
/// into the shifters at the next tile boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct TileLatch {
    /// Nametable byte.
    pub(crate) tile_id: u8,
    /// 2-bit palette select already extracted from the attribute byte.
    pub(crate) attribute: u8,
    /// Pattern bitplane 0.
    pub(crate) pattern_low: u8,
    /// Pattern bitplane 1.
    pub(crate) pattern_high: u8,
}

/// Background pixel pipeline.
///
/// Four 16-bit shifters: two pattern bitplanes and two palette bits. On each
/// visible pixel the bit under fine X is sampled from all four, giving a
/// 2-bit pattern index and a 2-bit palette index. Every 8 dots the low bytes
/// are reloaded from [`TileLatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct BgPipeline {
    /// Background pattern bitplanes: [bitplane0, bitplane1].
    pattern: [Shift16; 2],
    /// Background palette bits: [palette_bit0, palette_bit1].
    palette: [Shift16; 2],
    /// Fetch staging for the next tile.
    pub(crate) next: TileLatch,
}

impl BgPipeline {
    /// Loads the staged tile into the low bytes of the shifters.
    ///
    /// Each palette bit is replicated across the low byte (`0x00` or `0xFF`)
    /// so it stays constant for the whole tile row.
    pub(crate) fn reload(&mut self) {
        self.pattern[0].reload_low_byte(self.next.pattern_low);
        self.pattern[1].reload_low_byte(self.next.pattern_high);

        for (bit, shifter) in self.palette.iter_mut().enumerate() {
            let set = (self.next.attribute >> bit) & 1 != 0;
            shifter.reload_low_byte(if set { 0xFF } else { 0x00 });
        }
    }

    /// Samples the current background pixel (respecting fine X scroll).
    ///
    /// Returns `(palette_bits, pattern_bits)`, both `0..=3`.
    pub(crate) fn sample(&self, fine_x: u8) -> (u8, u8) {
        let pattern_bit0 = self.pattern[0].bit_with_fine_x(fine_x);
        let pattern_bit1 = self.pattern[1].bit_with_fine_x(fine_x);
        let palette_bit0 = self.palette[0].bit_with_fine_x(fine_x);
        let palette_bit1 = self.palette[1].bit_with_fine_x(fine_x);

        (
            (palette_bit1 << 1) | palette_bit0,
            (pattern_bit1 << 1) | pattern_bit0,
        )
    }

    /// Advances all background shifters by one bit (one PPU dot).
    pub(crate) fn shift(&mut self) {
        for i in 0..=1 {
            self.pattern[i].shift();
            self.palette[i].shift();
        }
    }

    /// Raw shifter contents: pattern low, pattern high, attribute low,
    /// attribute high.
    pub(crate) fn shifters(&self) -> [u16; 4] {
        [
            self.pattern[0].0,
            self.pattern[1].0,
            self.palette[0].0,
            self.palette[1].0,
        ]
    }

    pub(crate) fn set_shifters(&mut self, raw: [u16; 4]) {
        self.pattern = [Shift16(raw[0]), Shift16(raw[1])];
        self.palette = [Shift16(raw[2]), Shift16(raw[3])];
    }
}
