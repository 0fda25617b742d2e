//! Compile-time configuration for pinstore.

/// Size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems, so a page is also the unit of
/// aligned I/O. Every frame in the buffer pool holds exactly one page.
pub const PAGE_SIZE: usize = 4096;

/// Number of addressable pages with a `u32` page id. The top id is reserved
/// for [`PageId::INVALID`](crate::PageId::INVALID).
pub const MAX_PAGES: u64 = u32::MAX as u64;

/// Maximum database size in bytes.
pub const MAX_DB_SIZE_BYTES: u64 = MAX_PAGES * PAGE_SIZE as u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_max_db_size() {
        // Just under 16TB: the sentinel id is not a real page.
        let sixteen_tb = 16 * 1024u64 * 1024 * 1024 * 1024;
        assert_eq!(MAX_DB_SIZE_BYTES, sixteen_tb - PAGE_SIZE as u64);
    }
}
