//! Hash index block page.
//!
//! # Layout
//! ```text
//! +------------+-----------------+-----------------+---------------------+
//! | PageHeader | occupied bitmap | readable bitmap | (key, value) x cap  |
//! +------------+-----------------+-----------------+---------------------+
//! ```
//!
//! A slot is *occupied* once anything has ever been written to it and
//! *readable* while it holds a live entry. Occupied-but-not-readable is a
//! tombstone: probes continue past it, inserts may reuse it. Bit `i` of a
//! bitmap lives in byte `i / 8`, position `i % 8`.

use std::marker::PhantomData;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

use super::codec::FixedCodec;

/// Largest slot count whose two bitmaps and entry array fit after the
/// page header.
pub(crate) const fn slot_capacity(entry_size: usize) -> usize {
    let available = PAGE_SIZE - PageHeader::SIZE;
    if entry_size == 0 {
        return 0;
    }
    let mut n = available * 8 / (entry_size * 8 + 2);
    while n > 0 && 2 * n.div_ceil(8) + n * entry_size > available {
        n -= 1;
    }
    n
}

/// Typed view over a block page's bytes. Holds no data itself; every
/// accessor takes the page it works on.
pub(crate) struct BlockPage<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K: FixedCodec, V: FixedCodec> BlockPage<K, V> {
    pub const ENTRY_SIZE: usize = K::SIZE + V::SIZE;
    pub const CAPACITY: usize = slot_capacity(K::SIZE + V::SIZE);

    const BITMAP_LEN: usize = Self::CAPACITY.div_ceil(8);
    const OCCUPIED_OFFSET: usize = PageHeader::SIZE;
    const READABLE_OFFSET: usize = Self::OCCUPIED_OFFSET + Self::BITMAP_LEN;
    const ARRAY_OFFSET: usize = Self::READABLE_OFFSET + Self::BITMAP_LEN;

    /// Turn a zeroed page into an empty block.
    pub fn format(page: &mut Page) {
        page.reset();
        page.set_header(&PageHeader::new(PageType::HashTableBlock));
    }

    pub fn check(page: &Page, page_id: PageId) -> Result<()> {
        let page_type = page.header().page_type;
        if page_type == PageType::HashTableBlock {
            Ok(())
        } else {
            Err(Error::CorruptedPage {
                page_id: page_id.0,
                reason: format!("expected hash table block, found {:?}", page_type),
            })
        }
    }

    #[inline]
    pub fn is_occupied(page: &Page, slot: usize) -> bool {
        Self::bit(page, Self::OCCUPIED_OFFSET, slot)
    }

    #[inline]
    pub fn is_readable(page: &Page, slot: usize) -> bool {
        Self::bit(page, Self::READABLE_OFFSET, slot)
    }

    pub fn key_at(page: &Page, slot: usize) -> K {
        let offset = Self::entry_offset(slot);
        K::decode(&page.as_slice()[offset..offset + K::SIZE])
    }

    pub fn value_at(page: &Page, slot: usize) -> V {
        let offset = Self::entry_offset(slot) + K::SIZE;
        V::decode(&page.as_slice()[offset..offset + V::SIZE])
    }

    /// Write an entry into `slot` and mark it occupied and readable.
    pub fn insert(page: &mut Page, slot: usize, key: &K, value: &V) {
        let offset = Self::entry_offset(slot);
        let data = page.as_mut_slice();
        key.encode(&mut data[offset..offset + K::SIZE]);
        value.encode(&mut data[offset + K::SIZE..offset + Self::ENTRY_SIZE]);
        Self::set_bit(page, Self::OCCUPIED_OFFSET, slot, true);
        Self::set_bit(page, Self::READABLE_OFFSET, slot, true);
    }

    /// Turn a live entry into a tombstone.
    pub fn remove(page: &mut Page, slot: usize) {
        Self::set_bit(page, Self::READABLE_OFFSET, slot, false);
    }

    /// Every live entry in slot order.
    pub fn live_entries(page: &Page) -> impl Iterator<Item = (K, V)> + '_ {
        (0..Self::CAPACITY)
            .filter(move |&slot| Self::is_readable(page, slot))
            .map(move |slot| (Self::key_at(page, slot), Self::value_at(page, slot)))
    }

    #[inline]
    fn entry_offset(slot: usize) -> usize {
        debug_assert!(slot < Self::CAPACITY, "slot {} out of range", slot);
        Self::ARRAY_OFFSET + slot * Self::ENTRY_SIZE
    }

    #[inline]
    fn bit(page: &Page, base: usize, slot: usize) -> bool {
        debug_assert!(slot < Self::CAPACITY, "slot {} out of range", slot);
        page.as_slice()[base + slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_bit(page: &mut Page, base: usize, slot: usize, on: bool) {
        debug_assert!(slot < Self::CAPACITY, "slot {} out of range", slot);
        let byte = &mut page.as_mut_slice()[base + slot / 8];
        if on {
            *byte |= 1 << (slot % 8);
        } else {
            *byte &= !(1 << (slot % 8));
        }
    }
}
