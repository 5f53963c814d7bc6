//! System palette: the 64 colors a 6-bit palette RAM entry can select.

use crate::error::Error;

/// Number of entries in the system palette.
pub const SYSTEM_COLORS: usize = 64;

/// Size of a plain `.pal` file (64 RGB triplets).
pub const PAL_FILE_LEN: usize = SYSTEM_COLORS * 3;
/// Size of a `.pal` file that also carries the seven emphasis variants.
pub const PAL_FILE_WITH_EMPHASIS_LEN: usize = PAL_FILE_LEN * 8;

/// 8-bit RGB triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packs the color as `0x00RRGGBB`, the framebuffer pixel format.
    #[inline]
    pub const fn packed(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

/// Built-in palette presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaletteKind {
    /// Measured 2C02 output, muted and close to a real NTSC television.
    #[default]
    Ntsc2C02,
    /// Brighter emulator-style table with stronger saturation.
    Saturated,
}

impl PaletteKind {
    pub const fn all() -> &'static [PaletteKind] {
        &[PaletteKind::Ntsc2C02, PaletteKind::Saturated]
    }

    pub const fn description(self) -> &'static str {
        match self {
            PaletteKind::Ntsc2C02 => "NTSC 2C02 (measured)",
            PaletteKind::Saturated => "Saturated (emulator classic)",
        }
    }

    pub fn palette(self) -> Palette {
        Palette::new(self)
    }

    const fn table(self) -> &'static [(u8, u8, u8); SYSTEM_COLORS] {
        match self {
            PaletteKind::Ntsc2C02 => &NTSC_2C02,
            PaletteKind::Saturated => &SATURATED,
        }
    }
}

/// Lookup table from 6-bit color index to RGB.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Palette {
    colors: [Color; SYSTEM_COLORS],
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(PaletteKind::default())
    }
}

impl Palette {
    pub fn new(kind: PaletteKind) -> Self {
        let mut colors = [Color::BLACK; SYSTEM_COLORS];
        for (slot, &(r, g, b)) in colors.iter_mut().zip(kind.table()) {
            *slot = Color::new(r, g, b);
        }
        Self { colors }
    }

    /// Parses a `.pal` file: 64 RGB triplets, optionally followed by the
    /// emphasis variants, which are ignored.
    pub fn from_pal_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != PAL_FILE_LEN && bytes.len() != PAL_FILE_WITH_EMPHASIS_LEN {
            return Err(Error::InvalidPalette {
                actual: bytes.len(),
            });
        }

        let mut colors = [Color::BLACK; SYSTEM_COLORS];
        for (slot, rgb) in colors.iter_mut().zip(bytes.chunks_exact(3)) {
            *slot = Color::new(rgb[0], rgb[1], rgb[2]);
        }
        Ok(Self { colors })
    }

    /// Color for a palette RAM value. Only the low six bits are used.
    #[inline]
    pub fn color(&self, index: u8) -> Color {
        self.colors[usize::from(index & 0x3F)]
    }

    pub fn as_colors(&self) -> &[Color; SYSTEM_COLORS] {
        &self.colors
    }
}

#[rustfmt::skip]
const NTSC_2C02: [(u8, u8, u8); SYSTEM_COLORS] = [
    (84, 84, 84), (0, 30, 116), (8, 16, 144), (48, 0, 136),
    (68, 0, 100), (92, 0, 48), (84, 4, 0), (60, 24, 0),
    (32, 42, 0), (8, 58, 0), (0, 64, 0), (0, 60, 0),
    (0, 50, 60), (0, 0, 0), (0, 0, 0), (0, 0, 0),
    (152, 150, 152), (8, 76, 196), (48, 50, 236), (92, 30, 228),
    (136, 20, 176), (160, 20, 100), (152, 34, 32), (120, 60, 0),
    (84, 90, 0), (40, 114, 0), (8, 124, 0), (0, 118, 40),
    (0, 102, 120), (0, 0, 0), (0, 0, 0), (0, 0, 0),
    (236, 238, 236), (76, 154, 236), (120, 124, 236), (176, 98, 236),
    (228, 84, 236), (236, 88, 180), (236, 106, 100), (212, 136, 32),
    (160, 170, 0), (116, 196, 0), (76, 208, 32), (56, 204, 108),
    (56, 180, 204), (60, 60, 60), (0, 0, 0), (0, 0, 0),
    (236, 238, 236), (168, 204, 236), (188, 188, 236), (212, 178, 236),
    (236, 174, 236), (236, 174, 212), (236, 180, 176), (228, 196, 144),
    (204, 210, 120), (180, 222, 120), (168, 226, 144), (152, 226, 180),
    (160, 214, 228), (160, 162, 160), (0, 0, 0), (0, 0, 0),
];

#[rustfmt::skip]
const SATURATED: [(u8, u8, u8); SYSTEM_COLORS] = [
    (0x75, 0x75, 0x75), (0x27, 0x1B, 0x8F), (0x00, 0x00, 0xAB), (0x47, 0x00, 0x9F),
    (0x8F, 0x00, 0x77), (0xAB, 0x00, 0x13), (0xA7, 0x00, 0x00), (0x7F, 0x0B, 0x00),
    (0x43, 0x2F, 0x00), (0x00, 0x47, 0x00), (0x00, 0x51, 0x00), (0x00, 0x3F, 0x17),
    (0x1B, 0x3F, 0x5F), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00),
    (0xBC, 0xBC, 0xBC), (0x00, 0x73, 0xEF), (0x23, 0x3B, 0xEF), (0x83, 0x00, 0xF3),
    (0xBF, 0x00, 0xBF), (0xE7, 0x00, 0x5B), (0xDB, 0x2B, 0x00), (0xCB, 0x4F, 0x0F),
    (0x8B, 0x73, 0x00), (0x00, 0x97, 0x00), (0x00, 0xAB, 0x00), (0x00, 0x93, 0x3B),
    (0x00, 0x83, 0x8B), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00),
    (0xFF, 0xFF, 0xFF), (0x3F, 0xBF, 0xFF), (0x5F, 0x97, 0xFF), (0xA7, 0x8B, 0xFD),
    (0xF7, 0x7B, 0xFF), (0xFF, 0x77, 0xB7), (0xFF, 0x77, 0x63), (0xFF, 0x9B, 0x3B),
    (0xF3, 0xBF, 0x3F), (0x83, 0xD3, 0x13), (0x4F, 0xDF, 0x4B), (0x58, 0xF8, 0x98),
    (0x00, 0xEB, 0xDB), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00),
    (0xFF, 0xFF, 0xFF), (0xAB, 0xE7, 0xFF), (0xC7, 0xD7, 0xFF), (0xD7, 0xCB, 0xFF),
    (0xFF, 0xC7, 0xFF), (0xFF, 0xC7, 0xDB), (0xFF, 0xBF, 0xB3), (0xFF, 0xDB, 0xAB),
    (0xFF, 0xE7, 0xA3), (0xE3, 0xFF, 0xA3), (0xAB, 0xF3, 0xBF), (0xB3, 0xFF, 0xCF),
    (0x9F, 0xFF, 0xF3), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_rgb_into_low_three_bytes() {
        assert_eq!(Color::new(0x12, 0x34, 0x56).packed(), 0x0012_3456);
    }

    #[test]
    fn color_lookup_ignores_upper_bits() {
        let palette = Palette::new(PaletteKind::Ntsc2C02);
        assert_eq!(palette.color(0x30), palette.color(0xF0));
        assert_eq!(palette.color(0x00), Color::new(84, 84, 84));
    }

    #[test]
    fn pal_file_round_trips_through_parser() {
        let source = Palette::new(PaletteKind::Saturated);
        let bytes: Vec<u8> = source
            .as_colors()
            .iter()
            .flat_map(|c| [c.r, c.g, c.b])
            .collect();
        assert_eq!(Palette::from_pal_bytes(&bytes).expect("valid .pal"), source);

        let mut extended = bytes.clone();
        extended.resize(PAL_FILE_WITH_EMPHASIS_LEN, 0xEE);
        assert_eq!(Palette::from_pal_bytes(&extended).expect("emphasis .pal"), source);
    }

    #[test]
    fn rejects_odd_sized_pal_files() {
        let err = Palette::from_pal_bytes(&[0; 100]).expect_err("too short");
        assert!(matches!(err, Error::InvalidPalette { actual: 100 }));
    }

    #[test]
    fn every_preset_has_a_description() {
        for kind in PaletteKind::all() {
            assert!(!kind.description().is_empty());
            assert_eq!(kind.palette(), Palette::new(*kind));
        }
    }
}
