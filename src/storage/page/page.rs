//! Page - the 4KB unit of transfer between disk and memory.

use crate::common::config::PAGE_SIZE;

use super::page_header::PageHeader;

/// A page of data (4KB, 4KB-aligned).
///
/// A `Page` is only bytes. Identity, pin count and dirty state belong to
/// the [`Frame`](crate::buffer::Frame) that currently holds it.
///
/// `Page` does not implement `Clone` outside of tests: copying 4KB should
/// be explicit, via [`Page::copy_from`].
///
/// # Example
/// ```
/// use pinstore::storage::page::Page;
///
/// let mut page = Page::new();
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Overwrite this page with the bytes of `other`.
    #[inline]
    pub fn copy_from(&mut self, other: &Page) {
        self.data.copy_from_slice(&other.data);
    }

    /// Zero the entire page so no bytes leak into the next occupant.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }

    /// Whether every byte is zero (a freshly allocated page).
    pub fn is_zeroed(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    pub fn set_header(&mut self, header: &PageHeader) {
        header.write_to(&mut self.data);
    }

    /// Compute and store the checksum in the header.
    ///
    /// Call after the last modification of a self-describing page.
    pub fn update_checksum(&mut self) {
        let checksum = PageHeader::compute_checksum(&self.data);
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    pub fn verify_checksum(&self) -> bool {
        self.header().verify_checksum(&self.data)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut page = Page::new();
        page.copy_from(self);
        page
    }
}
