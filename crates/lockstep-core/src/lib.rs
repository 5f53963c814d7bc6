//! Dot-accurate NES picture processing unit, together with the cartridge
//! mappers and the system bus it needs to run.
//!
//! A driving CPU owns a [`Bus`], issues reads and writes through
//! [`Bus::cpu_read`] / [`Bus::cpu_write`] and reports elapsed cycles with
//! [`Bus::clock`]. The bus runs the [`Ppu`] three dots per CPU cycle and
//! latches frame completion and the vblank NMI for the caller to poll.

pub mod bus;
pub mod cartridge;
pub mod error;
pub mod mem_block;
pub mod memory;
pub mod ppu;
pub mod state;

pub use bus::{Bus, IoDevice, savestate::BusState};
pub use cartridge::{Cartridge, Mirroring, load_cartridge, load_cartridge_from_file};
pub use error::Error;
pub use ppu::{
    Ppu,
    buffer::FrameBuffer,
    palette::{Palette, PaletteKind},
};
pub use state::SaveState;
