//! Index structures built on the buffer pool.

pub mod hash;

pub use hash::{
    Crc32Hasher, DefaultComparator, FixedCodec, GenericHashIndex, GenericKey, IntHashTable,
    KeyComparator, KeyHasher, LinearProbeHashTable,
};
