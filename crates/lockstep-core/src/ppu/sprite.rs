use bitflags::bitflags;

bitflags! {
    /// Attribute bits stored in sprite byte 2.
    ///
    /// Bit layout:
    /// ```text
    /// 7 6 5 4 3 2 1 0
    /// V H P . . . p p
    /// ```
    /// - `V`: Vertical flip
    /// - `H`: Horizontal flip
    /// - `P`: Priority (behind background when set)
    /// - `p`: Sprite palette select (0..=3)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct SpriteAttributes: u8 {
        const PALETTE = 0b0000_0011;
        /// When set, sprite is drawn behind the background.
        const PRIORITY_BEHIND_BACKGROUND = 0b0010_0000;
        const FLIP_HORIZONTAL = 0b0100_0000;
        const FLIP_VERTICAL = 0b1000_0000;
    }
}

impl SpriteAttributes {
    pub(crate) fn palette(self) -> u8 {
        self.bits() & Self::PALETTE.bits()
    }
}

/// One sprite collected for the current scanline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SpriteEntry {
    pub(crate) y: u8,
    pub(crate) tile: u8,
    pub(crate) attributes: SpriteAttributes,
    /// Remaining X delay; counts down once per dot until the sprite starts
    /// shifting out pixels.
    pub(crate) x: u8,
    /// Came from OAM slot 0.
    pub(crate) sprite_zero: bool,
}

impl Default for SpriteEntry {
    fn default() -> Self {
        Self {
            y: 0,
            tile: 0,
            attributes: SpriteAttributes::empty(),
            x: 0,
            sprite_zero: false,
        }
    }
}

impl SpriteEntry {
    const BYTES_PER_SPRITE: usize = 4;

    /// Decodes a four-byte OAM record. `None` for the all-zero record,
    /// which marks an unused slot.
    pub(crate) fn from_oam(record: &[u8], index: usize) -> Option<Self> {
        let [y, tile, attributes, x] = <[u8; Self::BYTES_PER_SPRITE]>::try_from(record).ok()?;
        if y == 0 && tile == 0 && attributes == 0 && x == 0 {
            return None;
        }
        Some(Self {
            y,
            tile,
            attributes: SpriteAttributes::from_bits_retain(attributes),
            x,
            sprite_zero: index == 0,
        })
    }

    /// Iterates over the 64 records of primary OAM with their index.
    pub(crate) fn records(oam: &[u8]) -> impl Iterator<Item = (usize, &[u8])> {
        oam.chunks_exact(Self::BYTES_PER_SPRITE).enumerate()
    }

    /// Address of the low pattern plane for `row` (0-based, inside the sprite).
    ///
    /// 8x16 sprites ignore the control table bit: tile bit 0 picks the 4 KiB
    /// half and the even/odd tile pair covers the top and bottom halves.
    pub(crate) fn pattern_addr(&self, row: i32, height: i32, table_8x8: u16) -> u16 {
        let tile = u16::from(self.tile);
        let flip_v = self.attributes.contains(SpriteAttributes::FLIP_VERTICAL);

        if height == 8 {
            let line = if flip_v { 7 - row } else { row };
            return table_8x8 | (tile * 16) | (line & 0b111) as u16;
        }

        let half = (tile & 1) << 12;
        let top = (tile & 0xFE) * 16;
        let bottom = ((tile & 0xFE) + 1) * 16;
        if flip_v {
            let line = ((7 - row) & 0b111) as u16;
            if row < 8 {
                half | bottom | line
            } else {
                half | top | line
            }
        } else {
            let line = (row & 0b111) as u16;
            if row < 8 {
                half | top | line
            } else {
                half | bottom | line
            }
        }
    }
}

/// Reverses the bit order of a pattern byte with three masked swaps:
/// nibbles, then pairs, then single bits.
pub(crate) fn flip_horizontal(byte: u8) -> u8 {
    let byte = ((byte & 0xF0) >> 4) | ((byte & 0x0F) << 4);
    let byte = ((byte & 0xCC) >> 2) | ((byte & 0x33) << 2);
    ((byte & 0xAA) >> 1) | ((byte & 0x55) << 1)
}
