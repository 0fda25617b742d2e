//! Fixed-width encoding for hash index keys and values.

use std::fmt;

use crate::common::{PageId, Rid};

/// A type stored in a fixed number of bytes inside an index page.
///
/// `encode` writes exactly `SIZE` bytes; `decode` reads exactly `SIZE`
/// bytes. Integers are little-endian.
pub trait FixedCodec: Sized {
    const SIZE: usize;

    fn encode(&self, out: &mut [u8]);

    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_fixed_codec_for_int {
    ($($ty:ty),*) => {
        $(
            impl FixedCodec for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn encode(&self, out: &mut [u8]) {
                    out[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn decode(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_fixed_codec_for_int!(i32, u32, i64, u64);

impl FixedCodec for Rid {
    const SIZE: usize = 8;

    fn encode(&self, out: &mut [u8]) {
        self.page_id.0.encode(&mut out[..4]);
        self.slot.encode(&mut out[4..8]);
    }

    fn decode(bytes: &[u8]) -> Self {
        Rid::new(PageId::new(u32::decode(&bytes[..4])), u32::decode(&bytes[4..8]))
    }
}

/// An opaque `N`-byte index key, compared bytewise.
///
/// Used for keys built from serialized tuple columns. Common widths are
/// 4, 8, 16, 32 and 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenericKey<const N: usize>([u8; N]);

impl<const N: usize> GenericKey<N> {
    /// Build a key from raw bytes, truncating or zero-padding to `N`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = [0u8; N];
        let len = bytes.len().min(N);
        data[..len].copy_from_slice(&bytes[..len]);
        Self(data)
    }

    /// Build a key from an integer's little-endian bytes.
    pub fn from_i64(value: i64) -> Self {
        Self::from_bytes(&value.to_le_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> fmt::Debug for GenericKey<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenericKey<{}>(", N)?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

impl<const N: usize> FixedCodec for GenericKey<N> {
    const SIZE: usize = N;

    fn encode(&self, out: &mut [u8]) {
        out[..N].copy_from_slice(&self.0);
    }

    fn decode(bytes: &[u8]) -> Self {
        Self::from_bytes(&bytes[..N])
    }
}
