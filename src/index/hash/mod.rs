//! Linear probing hash index over buffer pool pages.
//!
//! - [`LinearProbeHashTable`] - The table: lookup, insert, remove, resize
//! - [`FixedCodec`] - Fixed-width key and value encoding
//! - [`KeyHasher`] / [`KeyComparator`] - Pluggable hashing and equality

mod block_page;
mod codec;
mod header_page;
mod hasher;
mod table;

pub use codec::{FixedCodec, GenericKey};
pub use hasher::{Crc32Hasher, DefaultComparator, KeyComparator, KeyHasher};
pub use table::{GenericHashIndex, IntHashTable, LinearProbeHashTable};
