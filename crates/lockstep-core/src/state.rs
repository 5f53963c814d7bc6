//! Save/load contract shared by the PPU, the mappers and the bus.
//!
//! Components expose a plain-data snapshot type through [`SaveState`]. The
//! binary layout is written with [`bytes::BufMut`] in a fixed field order
//! (little-endian, no header or version tag); [`SnapshotReader`] is the
//! bounds-checked counterpart used while decoding.

use bytes::Buf;

use crate::error::{Error, RestoreError};

/// Minimal save/load contract.
///
/// `load_state` validates the whole snapshot before touching `self`, so a
/// rejected snapshot leaves the component exactly as it was.
pub trait SaveState {
    type State;

    /// Capture the component state.
    fn save_state(&self) -> Self::State;

    /// Restore the component from a previously captured state.
    fn load_state(&mut self, state: &Self::State) -> Result<(), Error>;
}

/// Bounds-checked cursor over an encoded snapshot.
#[derive(Debug)]
pub(crate) struct SnapshotReader<'a> {
    buf: &'a [u8],
}

impl<'a> SnapshotReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn need(&self, len: usize) -> Result<(), RestoreError> {
        if self.buf.remaining() < len {
            return Err(RestoreError::Truncated {
                expected: len,
                actual: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub(crate) fn u8(&mut self) -> Result<u8, RestoreError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn bool(&mut self) -> Result<bool, RestoreError> {
        Ok(self.u8()? != 0)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, RestoreError> {
        self.need(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub(crate) fn i32(&mut self) -> Result<i32, RestoreError> {
        self.need(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub(crate) fn u64(&mut self) -> Result<u64, RestoreError> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<Vec<u8>, RestoreError> {
        self.need(len)?;
        let mut out = vec![0; len];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], RestoreError> {
        self.need(N)?;
        let mut out = [0; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Fails when bytes are left over after the last field.
    pub(crate) fn finish(self) -> Result<(), RestoreError> {
        match self.buf.remaining() {
            0 => Ok(()),
            extra => Err(RestoreError::TrailingBytes(extra)),
        }
    }
}

/// Checks that a snapshot field carries exactly `expected` bytes.
pub(crate) fn check_len(
    field: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), RestoreError> {
    if expected != actual {
        return Err(RestoreError::FieldLength {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_decodes_little_endian_fields() {
        let raw = [0x01, 0x34, 0x12, 0xFE, 0xFF, 0xFF, 0xFF, 0xAA];
        let mut reader = SnapshotReader::new(&raw);
        assert!(reader.bool().expect("bool"));
        assert_eq!(reader.u16().expect("u16"), 0x1234);
        assert_eq!(reader.i32().expect("i32"), -2);
        assert_eq!(reader.array::<1>().expect("array"), [0xAA]);
        reader.finish().expect("fully consumed");
    }

    #[test]
    fn reader_reports_truncation_without_consuming() {
        let raw = [0x00, 0x01];
        let mut reader = SnapshotReader::new(&raw);
        assert_eq!(
            reader.u64(),
            Err(RestoreError::Truncated {
                expected: 8,
                actual: 2
            })
        );
        assert_eq!(reader.u16().expect("still readable"), 0x0100);
    }

    #[test]
    fn reader_rejects_trailing_bytes() {
        let raw = [0x00, 0x01, 0x02];
        let mut reader = SnapshotReader::new(&raw);
        reader.u8().expect("u8");
        assert_eq!(reader.finish(), Err(RestoreError::TrailingBytes(2)));
    }
}
