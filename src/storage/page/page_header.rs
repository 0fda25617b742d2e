//! Page header and type definitions.
//!
//! Self-describing pages (the hash index's header and block pages) start
//! with a [`PageHeader`]: a [`PageType`] discriminator and a CRC32 checksum.
//! Raw data pages handed out by the buffer pool carry no header at all.

/// Type of page stored on disk.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Zeroed, never-formatted or unrecognized page.
    #[default]
    Invalid = 0,
    /// Generic data page.
    Data = 1,
    /// Hash index header page (bucket count + block directory).
    HashTableHeader = 2,
    /// Hash index block page (slot array).
    HashTableBlock = 3,
    /// Page released back to the disk manager.
    Free = 4,
}

impl PageType {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::Data,
            2 => PageType::HashTableHeader,
            3 => PageType::HashTableBlock,
            4 => PageType::Free,
            _ => PageType::Invalid,
        }
    }
}

/// Metadata stored at the beginning of a self-describing page.
///
/// # Layout (8 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     page_type (PageType as u8)
/// 1       4     checksum (CRC32, little-endian)
/// 5       3     reserved (zero)
/// ```
///
/// The checksum covers the whole page with the checksum field read as zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub checksum: u32,
}

impl PageHeader {
    /// Size of the header in bytes. Payload starts here.
    pub const SIZE: usize = 8;

    pub const OFFSET_PAGE_TYPE: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 1;

    pub fn new(page_type: PageType) -> Self {
        Self {
            page_type,
            checksum: 0,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        let mut checksum = [0u8; 4];
        checksum.copy_from_slice(&data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]);

        Self {
            page_type: PageType::from_u8(data[Self::OFFSET_PAGE_TYPE]),
            checksum: u32::from_le_bytes(checksum),
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_PAGE_TYPE] = self.page_type as u8;
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&self.checksum.to_le_bytes());
        data[Self::OFFSET_CHECKSUM + 4..Self::SIZE].fill(0);
    }

    /// CRC32 of a full page, with the checksum field fed as zeros.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&page_data[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&page_data[Self::OFFSET_CHECKSUM + 4..]);
        hasher.finalize()
    }

    pub fn verify_checksum(&self, page_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(page_data)
    }
}
