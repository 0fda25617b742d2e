//! Disk-resident linear probing hash table.
//!
//! The table is a header page plus a fixed list of block pages, all reached
//! through the buffer pool. A key hashes to a bucket; the bucket picks a
//! starting block and a starting slot, and the probe walks forward slot by
//! slot, wrapping from the last block to the first, until it has seen every
//! slot once or hits a never-occupied slot.
//!
//! Multiple values per key are allowed; an exact `(key, value)` pair is
//! stored at most once.
//!
//! # Concurrency
//!
//! A table-level `RwLock` serializes writers against each other and against
//! readers. Lookups share the lock and only ever take page read latches.
//! A page guard is never held while another fetch of the same page is in
//! flight.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::ops::Range;
use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::RwLock;

use crate::buffer::BufferPoolManager;
use crate::common::{Error, PageId, Result, Rid};
use crate::storage::page::Page;

use super::block_page::BlockPage;
use super::codec::{FixedCodec, GenericKey};
use super::header_page::HashTableHeader;
use super::hasher::{Crc32Hasher, DefaultComparator, KeyComparator, KeyHasher};

/// Where the table's slots live. Mirrors the header page.
#[derive(Debug)]
struct Directory {
    num_buckets: usize,
    block_page_ids: Vec<PageId>,
}

impl Directory {
    fn num_blocks(&self) -> usize {
        self.block_page_ids.len()
    }
}

/// The sequence of `(block index, slot range)` a probe visits.
///
/// Step 0 covers the starting block from the starting slot on, the middle
/// steps cover whole blocks, and the last step comes back to the starting
/// block for the slots before the start. Every slot is yielded once.
struct ProbeSequence {
    start_block: usize,
    start_slot: usize,
    num_blocks: usize,
    capacity: usize,
    step: usize,
}

impl Iterator for ProbeSequence {
    type Item = (usize, Range<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.step > self.num_blocks || (self.step == self.num_blocks && self.start_slot == 0) {
            return None;
        }
        let block = (self.start_block + self.step) % self.num_blocks;
        let slots = if self.step == 0 {
            self.start_slot..self.capacity
        } else if self.step == self.num_blocks {
            0..self.start_slot
        } else {
            0..self.capacity
        };
        self.step += 1;
        Some((block, slots))
    }
}

/// A hash index from `K` to `V` stored in buffer pool pages.
///
/// ```ignore
/// let table = LinearProbeHashTable::<i32, i32>::new(Arc::clone(&bpm), 1000)?;
/// table.insert(&1, &10)?;
/// assert_eq!(table.get_value(&1)?, vec![10]);
/// ```
pub struct LinearProbeHashTable<K, V, H = Crc32Hasher, C = DefaultComparator> {
    bpm: Arc<BufferPoolManager>,
    header_page_id: PageId,
    hasher: H,
    comparator: C,
    directory: RwLock<Directory>,
    _marker: PhantomData<fn() -> (K, V)>,
}

/// `i32 -> i32` table with the default hasher and comparator.
pub type IntHashTable = LinearProbeHashTable<i32, i32>;

/// Fixed-width key to record id, the shape a secondary index uses.
pub type GenericHashIndex<const N: usize> = LinearProbeHashTable<GenericKey<N>, Rid>;

impl<K, V> LinearProbeHashTable<K, V>
where
    K: FixedCodec + Ord,
    V: FixedCodec + PartialEq,
{
    /// Create an empty table with `num_buckets` buckets, hashing with CRC32
    /// and comparing keys with `Ord`.
    pub fn new(bpm: Arc<BufferPoolManager>, num_buckets: usize) -> Result<Self> {
        Self::with_hasher_and_comparator(bpm, num_buckets, Crc32Hasher, DefaultComparator)
    }

    /// Reattach to a table whose header page is `header_page_id`.
    pub fn open(bpm: Arc<BufferPoolManager>, header_page_id: PageId) -> Result<Self> {
        Self::open_with_hasher_and_comparator(bpm, header_page_id, Crc32Hasher, DefaultComparator)
    }
}

impl<K, V, H, C> LinearProbeHashTable<K, V, H, C>
where
    K: FixedCodec,
    V: FixedCodec + PartialEq,
    H: KeyHasher<K>,
    C: KeyComparator<K>,
{
    /// Slots per block page for this key/value width.
    pub const SLOTS_PER_BLOCK: usize = BlockPage::<K, V>::CAPACITY;

    /// Create an empty table.
    ///
    /// Allocates a header page and `ceil(num_buckets / SLOTS_PER_BLOCK)`
    /// block pages. Fails with `InvalidArgument` for zero buckets, for
    /// entries too wide to fit a page, or for more blocks than one header
    /// can list. Pages allocated before a failure are released again.
    pub fn with_hasher_and_comparator(
        bpm: Arc<BufferPoolManager>,
        num_buckets: usize,
        hasher: H,
        comparator: C,
    ) -> Result<Self> {
        let num_blocks = Self::blocks_for(num_buckets)?;

        let header_page_id = bpm.new_page()?.page_id();
        let table = Self {
            bpm,
            header_page_id,
            hasher,
            comparator,
            directory: RwLock::new(Directory {
                num_buckets,
                block_page_ids: Vec::new(),
            }),
            _marker: PhantomData,
        };

        let block_page_ids = match table.allocate_blocks(num_blocks) {
            Ok(ids) => ids,
            Err(e) => {
                table.discard_pages(&[header_page_id]);
                return Err(e);
            }
        };
        let directory = Directory {
            num_buckets,
            block_page_ids,
        };
        if let Err(e) = table.write_header(&directory) {
            table.discard_pages(&directory.block_page_ids);
            table.discard_pages(&[header_page_id]);
            return Err(e);
        }
        *table.directory.write() = directory;

        debug!(
            "created hash table at {} with {} buckets in {} blocks",
            header_page_id, num_buckets, num_blocks
        );
        Ok(table)
    }

    /// Reattach to an existing table with explicit collaborators. The
    /// hasher must be the one the table was built with.
    pub fn open_with_hasher_and_comparator(
        bpm: Arc<BufferPoolManager>,
        header_page_id: PageId,
        hasher: H,
        comparator: C,
    ) -> Result<Self> {
        let header = {
            let guard = bpm.fetch_page_read(header_page_id)?;
            HashTableHeader::read_from(&guard, header_page_id)?
        };
        if Self::SLOTS_PER_BLOCK == 0 {
            return Err(Error::InvalidArgument(
                "entry does not fit in a block page".to_string(),
            ));
        }

        debug!(
            "opened hash table at {} with {} buckets in {} blocks",
            header_page_id,
            header.num_buckets,
            header.block_page_ids.len()
        );
        Ok(Self {
            bpm,
            header_page_id,
            hasher,
            comparator,
            directory: RwLock::new(Directory {
                num_buckets: header.num_buckets,
                block_page_ids: header.block_page_ids,
            }),
            _marker: PhantomData,
        })
    }

    /// Every value stored under `key`, in probe order. Empty if none.
    pub fn get_value(&self, key: &K) -> Result<Vec<V>> {
        let directory = self.directory.read();
        let mut values = Vec::new();

        for (block_idx, slots) in self.probe(&directory, key) {
            let page_id = directory.block_page_ids[block_idx];
            let guard = self.bpm.fetch_page_read(page_id)?;
            BlockPage::<K, V>::check(&guard, page_id)?;

            for slot in slots {
                if BlockPage::<K, V>::is_readable(&guard, slot) {
                    if self.keys_equal(&BlockPage::<K, V>::key_at(&guard, slot), key) {
                        values.push(BlockPage::<K, V>::value_at(&guard, slot));
                    }
                } else if !BlockPage::<K, V>::is_occupied(&guard, slot) {
                    return Ok(values);
                }
            }
        }
        Ok(values)
    }

    /// Store `(key, value)`.
    ///
    /// Returns `Ok(false)` if the exact pair is already present and
    /// `Err(HashTableFull)` if the probe found no free or tombstoned slot.
    /// The first tombstone on the probe path is reused.
    pub fn insert(&self, key: &K, value: &V) -> Result<bool> {
        let directory = self.directory.write();
        let inserted = self.insert_into(&directory, key, value)?;
        if inserted {
            trace!("hash table {}: inserted entry", self.header_page_id);
        }
        Ok(inserted)
    }

    /// Remove the exact pair `(key, value)`, leaving a tombstone.
    ///
    /// Returns `Ok(false)` if the pair is not present.
    pub fn remove(&self, key: &K, value: &V) -> Result<bool> {
        let directory = self.directory.write();

        let mut found = None;
        'probe: for (block_idx, slots) in self.probe(&directory, key) {
            let page_id = directory.block_page_ids[block_idx];
            let guard = self.bpm.fetch_page_read(page_id)?;
            BlockPage::<K, V>::check(&guard, page_id)?;

            for slot in slots {
                if BlockPage::<K, V>::is_readable(&guard, slot) {
                    if self.entry_matches(&guard, slot, key, value) {
                        found = Some((page_id, slot));
                        break 'probe;
                    }
                } else if !BlockPage::<K, V>::is_occupied(&guard, slot) {
                    break 'probe;
                }
            }
        }

        let Some((page_id, slot)) = found else {
            return Ok(false);
        };
        let mut guard = self.bpm.fetch_page_write(page_id)?;
        BlockPage::<K, V>::remove(&mut guard, slot);
        trace!("hash table {}: removed entry", self.header_page_id);
        Ok(true)
    }

    /// Rebuild the table with `num_buckets` buckets.
    ///
    /// Every live entry is rehashed into freshly allocated blocks, then the
    /// header is rewritten and the old blocks are deleted. Tombstones do not
    /// survive. On error the table is left as it was.
    pub fn resize(&self, num_buckets: usize) -> Result<()> {
        let num_blocks = Self::blocks_for(num_buckets)?;
        let mut directory = self.directory.write();

        let entries = self.collect_entries(&directory)?;
        if entries.len() > num_blocks * Self::SLOTS_PER_BLOCK {
            return Err(Error::HashTableFull);
        }

        let resized = Directory {
            num_buckets,
            block_page_ids: self.allocate_blocks(num_blocks)?,
        };
        let rebuilt = entries
            .iter()
            .try_for_each(|(key, value)| self.insert_into(&resized, key, value).map(|_| ()))
            .and_then(|()| self.write_header(&resized));
        if let Err(e) = rebuilt {
            self.discard_pages(&resized.block_page_ids);
            return Err(e);
        }

        let old = std::mem::replace(&mut *directory, resized);
        self.discard_pages(&old.block_page_ids);

        debug!(
            "resized hash table {} from {} to {} buckets ({} entries)",
            self.header_page_id,
            old.num_buckets,
            num_buckets,
            entries.len()
        );
        Ok(())
    }

    /// Number of live entries. Scans every block.
    pub fn len(&self) -> Result<usize> {
        let directory = self.directory.read();
        Ok(self.collect_entries(&directory)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    #[inline]
    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    pub fn num_buckets(&self) -> usize {
        self.directory.read().num_buckets
    }

    pub fn num_blocks(&self) -> usize {
        self.directory.read().num_blocks()
    }

    #[inline]
    pub fn slots_per_block(&self) -> usize {
        Self::SLOTS_PER_BLOCK
    }

    /// Block page ids in directory order.
    pub fn block_page_ids(&self) -> Vec<PageId> {
        self.directory.read().block_page_ids.clone()
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.bpm
    }

    // Internal

    fn blocks_for(num_buckets: usize) -> Result<usize> {
        if num_buckets == 0 {
            return Err(Error::InvalidArgument(
                "hash table needs at least one bucket".to_string(),
            ));
        }
        if Self::SLOTS_PER_BLOCK == 0 {
            return Err(Error::InvalidArgument(
                "entry does not fit in a block page".to_string(),
            ));
        }
        let num_blocks = num_buckets.div_ceil(Self::SLOTS_PER_BLOCK);
        if num_blocks > HashTableHeader::MAX_BLOCKS {
            return Err(Error::InvalidArgument(format!(
                "{} buckets need {} blocks, header holds at most {}",
                num_buckets,
                num_blocks,
                HashTableHeader::MAX_BLOCKS
            )));
        }
        Ok(num_blocks)
    }

    fn probe(&self, directory: &Directory, key: &K) -> ProbeSequence {
        let num_blocks = directory.num_blocks();
        let bucket = (self.hasher.hash_key(key) % directory.num_buckets as u64) as usize;
        ProbeSequence {
            start_block: bucket % num_blocks,
            start_slot: (bucket / num_blocks) % Self::SLOTS_PER_BLOCK,
            num_blocks,
            capacity: Self::SLOTS_PER_BLOCK,
            step: 0,
        }
    }

    #[inline]
    fn keys_equal(&self, a: &K, b: &K) -> bool {
        self.comparator.compare(a, b) == Ordering::Equal
    }

    fn entry_matches(&self, page: &Page, slot: usize, key: &K, value: &V) -> bool {
        self.keys_equal(&BlockPage::<K, V>::key_at(page, slot), key)
            && BlockPage::<K, V>::value_at(page, slot) == *value
    }

    /// Insert under an already-held directory lock.
    fn insert_into(&self, directory: &Directory, key: &K, value: &V) -> Result<bool> {
        let mut target = None;

        'probe: for (block_idx, slots) in self.probe(directory, key) {
            let page_id = directory.block_page_ids[block_idx];
            let guard = self.bpm.fetch_page_read(page_id)?;
            BlockPage::<K, V>::check(&guard, page_id)?;

            for slot in slots {
                if BlockPage::<K, V>::is_readable(&guard, slot) {
                    if self.entry_matches(&guard, slot, key, value) {
                        return Ok(false);
                    }
                } else {
                    target.get_or_insert((page_id, slot));
                    if !BlockPage::<K, V>::is_occupied(&guard, slot) {
                        break 'probe;
                    }
                }
            }
        }

        let (page_id, slot) = target.ok_or(Error::HashTableFull)?;
        let mut guard = self.bpm.fetch_page_write(page_id)?;
        BlockPage::<K, V>::insert(&mut guard, slot, key, value);
        Ok(true)
    }

    fn collect_entries(&self, directory: &Directory) -> Result<Vec<(K, V)>> {
        let mut entries = Vec::new();
        for &page_id in &directory.block_page_ids {
            let guard = self.bpm.fetch_page_read(page_id)?;
            BlockPage::<K, V>::check(&guard, page_id)?;
            entries.extend(BlockPage::<K, V>::live_entries(&guard));
        }
        Ok(entries)
    }

    /// Allocate and format `count` block pages. On failure the pages
    /// allocated so far are released.
    fn allocate_blocks(&self, count: usize) -> Result<Vec<PageId>> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            match self.bpm.new_page() {
                Ok(mut guard) => {
                    BlockPage::<K, V>::format(&mut guard);
                    ids.push(guard.page_id());
                }
                Err(e) => {
                    self.discard_pages(&ids);
                    return Err(e);
                }
            }
        }
        Ok(ids)
    }

    fn write_header(&self, directory: &Directory) -> Result<()> {
        let mut guard = self.bpm.fetch_page_write(self.header_page_id)?;
        HashTableHeader::new(directory.num_buckets, directory.block_page_ids.clone())
            .write_to(&mut guard);
        Ok(())
    }

    /// Give pages back to the disk. A page is fetched first so that one
    /// evicted from the pool is still deallocated on disk.
    fn discard_pages(&self, page_ids: &[PageId]) {
        for &page_id in page_ids {
            let result = self
                .bpm
                .fetch_page_read(page_id)
                .map(drop)
                .and_then(|()| self.bpm.delete_page(page_id));
            if let Err(e) = result {
                warn!("failed to release hash table page {}: {}", page_id, e);
            }
        }
    }
}
