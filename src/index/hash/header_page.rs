//! Hash index header page.
//!
//! # Layout
//! ```text
//! Offset  Size      Field
//! ------  ----      -----
//! 0       8         PageHeader (type = HashTableHeader)
//! 8       8         num_buckets (u64)
//! 16      4         num_blocks (u32)
//! 20      4 * n     block page ids (u32 each, in block order)
//! ```
//!
//! The page checksum is stamped on every write and verified on every read.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

/// In-memory copy of a header page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HashTableHeader {
    pub num_buckets: usize,
    pub block_page_ids: Vec<PageId>,
}

impl HashTableHeader {
    const OFFSET_NUM_BUCKETS: usize = PageHeader::SIZE;
    const OFFSET_NUM_BLOCKS: usize = Self::OFFSET_NUM_BUCKETS + 8;
    const OFFSET_BLOCK_IDS: usize = Self::OFFSET_NUM_BLOCKS + 4;

    /// Most block ids one header page can list.
    pub const MAX_BLOCKS: usize = (PAGE_SIZE - Self::OFFSET_BLOCK_IDS) / 4;

    pub fn new(num_buckets: usize, block_page_ids: Vec<PageId>) -> Self {
        Self {
            num_buckets,
            block_page_ids,
        }
    }

    /// Parse a header page, rejecting anything that is not a well-formed,
    /// checksummed header.
    pub fn read_from(page: &Page, page_id: PageId) -> Result<Self> {
        let corrupted = |reason: String| Error::CorruptedPage {
            page_id: page_id.0,
            reason,
        };

        let header = page.header();
        if header.page_type != PageType::HashTableHeader {
            return Err(corrupted(format!(
                "expected hash table header, found {:?}",
                header.page_type
            )));
        }
        if !page.verify_checksum() {
            return Err(corrupted("header checksum mismatch".to_string()));
        }

        let data = page.as_slice();
        let num_buckets = read_u64(data, Self::OFFSET_NUM_BUCKETS);
        let num_blocks = read_u32(data, Self::OFFSET_NUM_BLOCKS) as usize;
        if num_blocks == 0 || num_blocks > Self::MAX_BLOCKS {
            return Err(corrupted(format!("block count {} out of range", num_blocks)));
        }
        if num_buckets == 0 {
            return Err(corrupted("bucket count is zero".to_string()));
        }
        let num_buckets = usize::try_from(num_buckets)
            .map_err(|_| corrupted(format!("bucket count {} overflows", num_buckets)))?;

        let block_page_ids = (0..num_blocks)
            .map(|i| PageId::new(read_u32(data, Self::OFFSET_BLOCK_IDS + i * 4)))
            .collect();

        Ok(Self {
            num_buckets,
            block_page_ids,
        })
    }

    /// Overwrite `page` with this header and stamp its checksum.
    ///
    /// # Panics
    /// Panics if there are more than [`Self::MAX_BLOCKS`] block ids.
    pub fn write_to(&self, page: &mut Page) {
        assert!(
            self.block_page_ids.len() <= Self::MAX_BLOCKS,
            "too many blocks for one header page"
        );

        page.reset();
        page.set_header(&PageHeader::new(PageType::HashTableHeader));

        let data = page.as_mut_slice();
        data[Self::OFFSET_NUM_BUCKETS..Self::OFFSET_NUM_BUCKETS + 8]
            .copy_from_slice(&(self.num_buckets as u64).to_le_bytes());
        data[Self::OFFSET_NUM_BLOCKS..Self::OFFSET_NUM_BLOCKS + 4]
            .copy_from_slice(&(self.block_page_ids.len() as u32).to_le_bytes());
        for (i, pid) in self.block_page_ids.iter().enumerate() {
            let offset = Self::OFFSET_BLOCK_IDS + i * 4;
            data[offset..offset + 4].copy_from_slice(&pid.0.to_le_bytes());
        }

        page.update_checksum();
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(buf)
}
