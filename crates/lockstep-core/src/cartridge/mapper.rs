//! Cartridge mapper interface.
//!
//! A mapper sits between the buses and the cartridge memory. Every access is
//! offered to it first; it answers with [`MapperAccess::Handled`] when the
//! address belongs to the board and [`MapperAccess::NotHandled`] otherwise,
//! letting the caller fall back to console memory. The answer is produced
//! fresh on every call since it may depend on the current bank selection.

use std::{borrow::Cow, fmt::Debug};

use bytes::BufMut;
use dyn_clone::DynClone;

use crate::{
    cartridge::Mirroring,
    error::{Error, RestoreError},
    state::SnapshotReader,
};

mod mapper0;
mod mapper2;

pub use mapper0::Mapper0;
pub use mapper2::{Mapper2, Mapper2State};

/// Result of offering an address to a mapper.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapperAccess<T = u8> {
    /// The board owns the address; the value is authoritative.
    Handled(T),
    /// The board declined; the caller falls back to its own memory map.
    NotHandled,
}

impl<T> MapperAccess<T> {
    /// Converts into an `Option`, dropping the "declined" case.
    #[inline]
    pub fn handled(self) -> Option<T> {
        match self {
            Self::Handled(value) => Some(value),
            Self::NotHandled => None,
        }
    }

    #[inline]
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled(_))
    }
}

/// Mapper-specific snapshot payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum MapperState {
    /// NROM has no mutable state.
    Nrom,
    UxRom(Mapper2State),
}

impl MapperState {
    /// iNES mapper number the snapshot was captured from.
    pub fn mapper_id(&self) -> u16 {
        match self {
            Self::Nrom => 0,
            Self::UxRom(_) => 2,
        }
    }

    pub(crate) fn encode(&self, out: &mut impl BufMut) {
        match self {
            Self::Nrom => {}
            Self::UxRom(state) => state.encode(out),
        }
    }

    /// Decodes a snapshot shaped like `self`, which supplies the variant and
    /// every buffer length.
    pub(crate) fn decode_like(
        &self,
        reader: &mut SnapshotReader<'_>,
    ) -> Result<MapperState, RestoreError> {
        match self {
            Self::Nrom => Ok(Self::Nrom),
            Self::UxRom(current) => {
                Mapper2State::decode(reader, current.prg_rom.len()).map(Self::UxRom)
            }
        }
    }
}

pub trait Mapper: DynClone + Debug {
    /// Offers a CPU read. Boards decline addresses they do not decode.
    fn cpu_read(&self, addr: u16) -> MapperAccess;

    /// Offers a CPU write. Boards decline addresses they do not decode.
    fn cpu_write(&mut self, addr: u16, data: u8) -> MapperAccess<()>;

    /// Offers a PPU read. Boards without CHR banking decline and let the PPU
    /// use its built-in graphics memory.
    fn ppu_read(&self, _addr: u16) -> MapperAccess {
        MapperAccess::NotHandled
    }

    fn ppu_write(&mut self, _addr: u16, _data: u8) -> MapperAccess<()> {
        MapperAccess::NotHandled
    }

    /// Nametable layout currently selected by the board.
    fn mirroring(&self) -> Mirroring;

    fn mapper_id(&self) -> u16;

    fn name(&self) -> Cow<'static, str>;

    /// Captures bank selection and any owned memory.
    fn save_state(&self) -> MapperState;

    /// Restores a snapshot produced by [`Mapper::save_state`] on the same board.
    fn load_state(&mut self, state: &MapperState) -> Result<(), Error>;
}

dyn_clone::clone_trait_object!(Mapper);

fn mismatch(mapper: &dyn Mapper, state: &MapperState) -> Error {
    RestoreError::MapperMismatch {
        expected: mapper.mapper_id(),
        actual: state.mapper_id(),
    }
    .into()
}
