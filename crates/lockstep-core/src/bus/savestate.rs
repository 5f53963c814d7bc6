#[cfg(feature = "savestate-serde")]
use serde::{Deserialize, Serialize};

use bytes::BufMut;

use crate::{
    cartridge::MapperState,
    error::RestoreError,
    mem_block::cpu as cpu_ram,
    memory::cpu as cpu_mem,
    ppu::savestate::PpuState,
    state::SnapshotReader,
};

#[cfg(feature = "savestate-postcard")]
use crate::error::Error;

/// Whole-console snapshot: work RAM, bus counters, the PPU and the mapper,
/// encoded in that order.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusState {
    pub ram: cpu_ram::Ram,
    pub cycles: u64,
    pub frame_ready: bool,
    pub ppu: PpuState,
    pub mapper: MapperState,
}

impl BusState {
    pub fn encode(&self, out: &mut impl BufMut) {
        out.put_slice(&self.ram);
        out.put_u64_le(self.cycles);
        out.put_u8(u8::from(self.frame_ready));
        self.ppu.encode(out);
        self.mapper.encode(out);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            cpu_mem::INTERNAL_RAM_SIZE + 9 + PpuState::encoded_len(self.ppu.chr.len()),
        );
        self.encode(&mut out);
        out
    }

    /// Decodes a snapshot for a console whose PPU owns `chr_len` bytes of
    /// graphics memory and whose mapper currently looks like `mapper`.
    pub(crate) fn decode(
        reader: &mut SnapshotReader<'_>,
        chr_len: usize,
        mapper: &MapperState,
    ) -> Result<Self, RestoreError> {
        let mut ram = cpu_ram::Ram::new();
        ram.copy_from_slice(&reader.bytes(cpu_mem::INTERNAL_RAM_SIZE)?);
        Ok(Self {
            ram,
            cycles: reader.u64()?,
            frame_ready: reader.bool()?,
            ppu: PpuState::decode(reader, chr_len)?,
            mapper: mapper.decode_like(reader)?,
        })
    }

    #[cfg(feature = "savestate-postcard")]
    pub fn to_postcard(&self) -> Result<Vec<u8>, Error> {
        Ok(postcard::to_stdvec(self)?)
    }

    #[cfg(feature = "savestate-postcard")]
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, Error> {
        Ok(postcard::from_bytes(bytes)?)
    }
}
