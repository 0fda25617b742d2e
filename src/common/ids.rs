//! Identifier types: pages on disk, frames in memory, and record ids.

use std::fmt;

/// Identifies a page on disk.
///
/// A `u32` addresses 2^32 pages of 4KB, i.e. 16TB of data. `u32::MAX` is
/// reserved as the "no page" sentinel.
///
/// # Example
/// ```
/// use pinstore::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert!(!PageId::INVALID.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel for an unallocated page.
    pub const INVALID: PageId = PageId(u32::MAX);

    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Whether this is a real page rather than the sentinel.
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Byte offset of this page in a single-file database.
    #[inline]
    pub fn file_offset(&self, page_size: usize) -> u64 {
        u64::from(self.0) * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Page({})", self.0)
        } else {
            write!(f, "Page(INVALID)")
        }
    }
}

/// Index of a frame in the buffer pool's frame array.
///
/// `usize` so it can index `Vec<Frame>` directly: `frames[frame_id.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

impl FrameId {
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

/// Record identifier: the page a tuple lives on and its slot within it.
///
/// This is what table heaps hand to indexes as the value half of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    pub page_id: PageId,
    pub slot: u32,
}

impl Rid {
    pub fn new(page_id: PageId, slot: u32) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}, {})", self.page_id.0, self.slot)
    }
}
