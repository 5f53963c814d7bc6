use core::ops::{Deref, DerefMut};

#[cfg(any(feature = "boxed-memblock", target_arch = "wasm32"))]
type MemBlockStorage<T, const N: usize> = Box<[T; N]>;

#[cfg(not(any(feature = "boxed-memblock", target_arch = "wasm32")))]
type MemBlockStorage<T, const N: usize> = [T; N];

/// Fixed-size memory region. Stored inline by default, on the heap with the
/// `boxed-memblock` feature or on wasm32 where stack space is scarce.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemBlock<T, const N: usize>(MemBlockStorage<T, N>);

#[cfg(feature = "savestate-serde")]
impl<T, const N: usize> serde::Serialize for MemBlock<T, N>
where
    T: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.as_slice())
    }
}

#[cfg(feature = "savestate-serde")]
impl<'de, T, const N: usize> serde::Deserialize<'de> for MemBlock<T, N>
where
    T: Copy + Default + serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let items = Vec::<T>::deserialize(deserializer)?;
        if items.len() != N {
            return Err(serde::de::Error::invalid_length(
                items.len(),
                &"a sequence matching the block size",
            ));
        }
        let mut out = Self::new();
        out.copy_from_slice(&items);
        Ok(out)
    }
}

/// Convenience alias for a `MemBlock` of bytes.
pub type ByteBlock<const N: usize> = MemBlock<u8, N>;

pub mod cpu {
    use crate::memory::cpu as cpu_mem;

    /// Console work RAM.
    pub type Ram = super::ByteBlock<{ cpu_mem::INTERNAL_RAM_SIZE }>;
}

pub mod ppu {
    use crate::memory::ppu as ppu_mem;

    /// Character Internal RAM (CIRAM), the 2 KiB nametable store.
    pub type Ciram = super::ByteBlock<{ ppu_mem::CIRAM_SIZE }>;
    pub type PaletteRam = super::ByteBlock<{ ppu_mem::PALETTE_RAM_SIZE }>;
    pub type OamRam = super::ByteBlock<{ ppu_mem::OAM_RAM_SIZE }>;
}

impl<T, const N: usize> MemBlock<T, N> {
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.0[..]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.0[..]
    }
}

impl<T: Copy + Default, const N: usize> MemBlock<T, N> {
    pub fn new() -> Self {
        Self::filled(T::default())
    }
}

impl<T: Copy, const N: usize> MemBlock<T, N> {
    /// Create a `MemBlock` where every element is initialized to `value`.
    #[inline]
    pub fn filled(value: T) -> Self {
        #[cfg(any(feature = "boxed-memblock", target_arch = "wasm32"))]
        {
            Self(Box::new([value; N]))
        }
        #[cfg(not(any(feature = "boxed-memblock", target_arch = "wasm32")))]
        {
            Self([value; N])
        }
    }
}

impl<T: Copy + Default, const N: usize> Default for MemBlock<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Deref for MemBlock<T, N> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T, const N: usize> DerefMut for MemBlock<T, N> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}
