//! Output framebuffer written by the PPU one dot at a time.
//!
//! Pixels are packed `0x00RRGGBB`, row-major with the origin at the top left.
//! The contents only form a consistent image between the end of one frame
//! and the first visible dot of the next.

use crate::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Number of pixels in one frame.
pub const PIXEL_COUNT: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pixels: Box<[u32]>,
}

impl core::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &SCREEN_WIDTH)
            .field("height", &SCREEN_HEIGHT)
            .finish_non_exhaustive()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: vec![0; PIXEL_COUNT].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        SCREEN_WIDTH
    }

    #[inline]
    pub fn height(&self) -> usize {
        SCREEN_HEIGHT
    }

    /// All pixels, row-major.
    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the visible area.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return None;
        }
        Some(self.pixels[y * SCREEN_WIDTH + x])
    }

    /// One scanline of pixels.
    pub fn row(&self, y: usize) -> Option<&[u32]> {
        let start = y.checked_mul(SCREEN_WIDTH)?;
        self.pixels.get(start..start + SCREEN_WIDTH)
    }

    /// Stores a pixel; coordinates outside the visible area are ignored.
    #[inline]
    pub(crate) fn write(&mut self, x: i32, y: i32, color: u32) {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return;
        };
        if x < SCREEN_WIDTH && y < SCREEN_HEIGHT {
            self.pixels[y * SCREEN_WIDTH + x] = color;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.pixels.fill(0);
    }
}
