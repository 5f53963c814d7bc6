use super::sprite::{SpriteAttributes, SpriteEntry, flip_horizontal};

/// Sprites the PPU can draw on one scanline.
pub(crate) const MAX_SPRITES_PER_LINE: usize = 8;

/// Sprite pixel produced for a single dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub(crate) struct SpritePixel {
    /// Palette row, already offset into the sprite half (4..=7).
    pub(crate) palette: u8,
    /// Color index within the palette (1..=3).
    pub(crate) color: u8,
    /// Whether the sprite has background priority (is drawn behind).
    pub(crate) behind_background: bool,
    /// Whether this pixel came from OAM sprite 0.
    pub(crate) sprite_zero: bool,
}

/// Sprite evaluation results and pattern shifters for the current scanline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct SpritePipeline {
    entries: [SpriteEntry; MAX_SPRITES_PER_LINE],
    count: usize,
    pattern_low: [u8; MAX_SPRITES_PER_LINE],
    pattern_high: [u8; MAX_SPRITES_PER_LINE],
    /// Sprite 0 was collected by the last evaluation.
    sprite_zero_possible: bool,
}

impl SpritePipeline {
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn sprite_zero_possible(&self) -> bool {
        self.sprite_zero_possible
    }

    /// Zeroes every pattern shifter.
    pub(crate) fn clear_patterns(&mut self) {
        self.pattern_low = [0; MAX_SPRITES_PER_LINE];
        self.pattern_high = [0; MAX_SPRITES_PER_LINE];
    }

    /// Forgets the collected sprites. Used after a snapshot restore, since the
    /// evaluation results are not part of the snapshot.
    pub(crate) fn reset_evaluation(&mut self) {
        self.entries = [SpriteEntry::default(); MAX_SPRITES_PER_LINE];
        self.count = 0;
        self.sprite_zero_possible = false;
    }

    /// Scans OAM in index order and collects up to eight sprites for which
    /// `scanline - y` falls inside the sprite height.
    ///
    /// Returns `true` when a ninth in-range sprite exists (sprite overflow).
    pub(crate) fn evaluate(&mut self, oam: &[u8], scanline: i32, height: i32) -> bool {
        self.clear_patterns();
        self.count = 0;
        self.sprite_zero_possible = false;

        for (index, record) in SpriteEntry::records(oam) {
            let Some(sprite) = SpriteEntry::from_oam(record, index) else {
                continue;
            };
            let row = scanline - i32::from(sprite.y);
            if !(0..height).contains(&row) {
                continue;
            }
            if self.count == MAX_SPRITES_PER_LINE {
                return true;
            }
            self.sprite_zero_possible |= sprite.sprite_zero;
            self.entries[self.count] = sprite;
            self.count += 1;
        }
        false
    }

    /// Fetches both pattern planes for every collected sprite through `fetch`.
    /// Horizontally flipped sprites are stored bit-reversed so shifting left
    /// always walks the sprite from its left edge.
    pub(crate) fn load_patterns(
        &mut self,
        scanline: i32,
        height: i32,
        table_8x8: u16,
        mut fetch: impl FnMut(u16) -> u8,
    ) {
        for slot in 0..self.count {
            let sprite = self.entries[slot];
            let row = scanline - i32::from(sprite.y);
            let addr = sprite.pattern_addr(row, height, table_8x8);
            let mut low = fetch(addr);
            let mut high = fetch(addr.wrapping_add(8));
            if sprite.attributes.contains(SpriteAttributes::FLIP_HORIZONTAL) {
                low = flip_horizontal(low);
                high = flip_horizontal(high);
            }
            self.pattern_low[slot] = low;
            self.pattern_high[slot] = high;
        }
    }

    /// One dot of sprite shifting: sprites still waiting count their X delay
    /// down, the others shift their patterns left.
    pub(crate) fn shift(&mut self) {
        for slot in 0..self.count {
            let sprite = &mut self.entries[slot];
            if sprite.x > 0 {
                sprite.x -= 1;
            } else {
                self.pattern_low[slot] <<= 1;
                self.pattern_high[slot] <<= 1;
            }
        }
    }

    /// First opaque pixel among the sprites whose X delay has run out.
    pub(crate) fn sample(&self) -> Option<SpritePixel> {
        (0..self.count).find_map(|slot| {
            let sprite = &self.entries[slot];
            if sprite.x != 0 {
                return None;
            }
            let bit0 = (self.pattern_low[slot] >> 7) & 1;
            let bit1 = (self.pattern_high[slot] >> 7) & 1;
            let color = (bit1 << 1) | bit0;
            (color != 0).then(|| SpritePixel {
                palette: 4 + sprite.attributes.palette(),
                color,
                behind_background: sprite
                    .attributes
                    .contains(SpriteAttributes::PRIORITY_BEHIND_BACKGROUND),
                sprite_zero: sprite.sprite_zero,
            })
        })
    }

    pub(crate) fn patterns(&self) -> ([u8; MAX_SPRITES_PER_LINE], [u8; MAX_SPRITES_PER_LINE]) {
        (self.pattern_low, self.pattern_high)
    }

    pub(crate) fn set_patterns(
        &mut self,
        low: [u8; MAX_SPRITES_PER_LINE],
        high: [u8; MAX_SPRITES_PER_LINE],
    ) {
        self.pattern_low = low;
        self.pattern_high = high;
    }
}
