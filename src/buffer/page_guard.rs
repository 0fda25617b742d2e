//! RAII guards for page access.
//!
//! A guard is the only way to reach a buffered page's bytes. It owns one pin
//! and one side of the page latch; dropping it releases both, so a page can
//! never be touched after its pin is gone.
//!
//! - [`PageReadGuard`] - Shared access (many at once)
//! - [`PageWriteGuard`] - Exclusive access, marks the page dirty once written

use std::ops::{Deref, DerefMut};

use log::error;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Shared, pinned access to a page.
///
/// ```ignore
/// let guard = bpm.fetch_page_read(page_id)?;
/// let first = guard.as_slice()[0];
/// // guard drops here, page unpinned
/// ```
pub struct PageReadGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    lock: RwLockReadGuard<'a, Page>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.bpm.unpin_page(self.page_id, false) {
            error!("read guard for {} failed to unpin: {}", self.page_id, e);
        }
    }
}

/// Exclusive, pinned access to a page.
///
/// The first mutable dereference marks the guard dirty; the dirty bit is
/// handed to the buffer pool when the guard drops. A write guard that only
/// reads leaves the page clean.
///
/// ```ignore
/// let mut guard = bpm.fetch_page_write(page_id)?;
/// guard.as_mut_slice()[0] = 0xFF;
/// // guard drops here, page marked dirty and unpinned
/// ```
pub struct PageWriteGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    is_dirty: bool,
    lock: RwLockWriteGuard<'a, Page>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            is_dirty: false,
            lock,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Whether this guard has handed out mutable access.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        self.is_dirty = true;
        &mut self.lock
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.bpm.unpin_page(self.page_id, self.is_dirty) {
            error!("write guard for {} failed to unpin: {}", self.page_id, e);
        }
    }
}
