use std::{fs, path::Path};

use tracing::debug;

use crate::{
    cartridge::header::{Header, NES_HEADER_LEN},
    error::Error,
    state::SaveState,
};

pub const TRAINER_SIZE: usize = 512;

pub mod header;
pub mod mapper;
mod mirroring;

pub use mapper::{Mapper, Mapper0, Mapper2, MapperAccess, MapperState};
pub use mirroring::Mirroring;

/// A loaded cartridge: the parsed header, the board logic owning PRG memory,
/// and the CHR image handed to the PPU at power-on.
#[derive(Debug, Clone)]
pub struct Cartridge {
    header: Header,
    mapper: Box<dyn Mapper>,
    chr_rom: Box<[u8]>,
}

impl Cartridge {
    pub fn new(header: Header, mapper: Box<dyn Mapper>, chr_rom: Box<[u8]>) -> Self {
        Self {
            header,
            mapper,
            chr_rom,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn mapper(&self) -> &dyn Mapper {
        self.mapper.as_ref()
    }

    pub fn mapper_mut(&mut self) -> &mut dyn Mapper {
        self.mapper.as_mut()
    }

    /// CHR ROM contents; empty for boards that rely on CHR RAM.
    pub fn chr_rom(&self) -> &[u8] {
        &self.chr_rom
    }

    pub fn cpu_read(&self, addr: u16) -> MapperAccess {
        self.mapper.cpu_read(addr)
    }

    pub fn cpu_write(&mut self, addr: u16, data: u8) -> MapperAccess<()> {
        self.mapper.cpu_write(addr, data)
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }
}

impl SaveState for Cartridge {
    type State = MapperState;

    fn save_state(&self) -> MapperState {
        self.mapper.save_state()
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), Error> {
        self.mapper.load_state(state)
    }
}

/// Load a cartridge from an in-memory iNES image.
pub fn load_cartridge(bytes: &[u8]) -> Result<Cartridge, Error> {
    let header = Header::parse(bytes)?;
    let (prg_rom, chr_rom) = slice_sections(bytes, &header)?;

    let mapper: Box<dyn Mapper> = match header.mapper {
        0 => Box::new(Mapper0::new(prg_rom, header.mirroring)?),
        2 => Box::new(Mapper2::new(prg_rom, header.mirroring)?),
        other => return Err(Error::UnsupportedMapper(other)),
    };

    debug!(
        mapper = header.mapper,
        name = %mapper.name(),
        prg_rom = header.prg_rom_size,
        chr_rom = header.chr_rom_size,
        mirroring = ?header.mirroring,
        "cartridge loaded"
    );

    Ok(Cartridge::new(header, mapper, chr_rom))
}

/// Load a cartridge directly from disk.
pub fn load_cartridge_from_file<P>(path: P) -> Result<Cartridge, Error>
where
    P: AsRef<Path>,
{
    let bytes = fs::read(path)?;
    load_cartridge(&bytes)
}

fn slice_sections(bytes: &[u8], header: &Header) -> Result<(Box<[u8]>, Box<[u8]>), Error> {
    let mut cursor = NES_HEADER_LEN;
    if header.trainer_present {
        // Trainers patch PRG RAM, which neither supported board has.
        section(bytes, &mut cursor, TRAINER_SIZE, "trainer")?;
    }

    let prg_rom = section(bytes, &mut cursor, header.prg_rom_size, "PRG ROM")?;
    let chr_rom = section(bytes, &mut cursor, header.chr_rom_size, "CHR ROM")?;

    Ok((prg_rom.into(), chr_rom.into()))
}

fn section<'a>(
    bytes: &'a [u8],
    cursor: &mut usize,
    len: usize,
    name: &'static str,
) -> Result<&'a [u8], Error> {
    let too_short = || Error::SectionTooShort {
        section: name,
        expected: len,
        actual: bytes.len().saturating_sub(*cursor),
    };

    let end = cursor.checked_add(len).ok_or_else(too_short)?;
    let slice = bytes.get(*cursor..end).ok_or_else(too_short)?;

    *cursor = end;
    Ok(slice)
}
