//! The disk collaborator contract.

use crate::common::{PageId, Result};
use crate::storage::page::Page;

/// Page-granular persistent storage.
///
/// The buffer pool is the only caller. It serializes access behind its own
/// mutex, so implementations take `&mut self` and need no interior locking.
pub trait PageStore: Send {
    /// Read the on-disk image of `page_id` into `page`.
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()>;

    /// Persist `page` as the image of `page_id`.
    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()>;

    /// Reserve a page id whose on-disk image is all zeros.
    fn allocate_page(&mut self) -> Result<PageId>;

    /// Release `page_id`. Later reads of it fail until it is reallocated.
    fn deallocate_page(&mut self, page_id: PageId) -> Result<()>;

    /// Number of page ids handed out so far (including deallocated ones).
    fn page_count(&self) -> u32;
}
