//! Frame - a slot in the buffer pool.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::Page;

/// A frame in the buffer pool: one page of bytes plus its bookkeeping.
///
/// # Thread Safety
/// - `page`: `RwLock`, the per-page reader/writer latch guards hold
/// - `page_id`: `Mutex`
/// - `pin_count`, `is_dirty`: atomics, so they can be read without the
///   pool lock (e.g. by [`BufferPoolManager::get_pin_count`])
///
/// Pin count changes are made while holding the buffer pool's state lock,
/// which keeps them atomic with the page-table lookup that found the frame.
///
/// [`BufferPoolManager::get_pin_count`]: crate::buffer::BufferPoolManager::get_pin_count
pub struct Frame {
    page: RwLock<Page>,
    page_id: Mutex<Option<PageId>>,
    pin_count: AtomicU32,
    is_dirty: AtomicBool,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            page_id: Mutex::new(None),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    /// Acquire the shared page latch.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire the exclusive page latch.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        *self.page_id.lock()
    }

    #[inline]
    pub fn set_page_id(&self, page_id: Option<PageId>) {
        *self.page_id.lock() = page_id;
    }

    /// Increment the pin count. Returns the new count.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the pin count. Returns the new count, or `None` (leaving
    /// the count at zero) if the frame was not pinned.
    #[inline]
    pub fn unpin(&self) -> Option<u32> {
        self.pin_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            })
            .ok()
            .map(|old| old - 1)
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Dirty is sticky: only a write-back or a reset clears it.
    #[inline]
    pub fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Release);
    }

    #[inline]
    pub fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    /// No page loaded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.page_id().is_none()
    }

    #[inline]
    pub fn is_evictable(&self) -> bool {
        !self.is_empty() && !self.is_pinned()
    }

    /// Zero the bytes and forget the page, ready for reuse.
    ///
    /// Only call on an unpinned frame.
    pub fn reset(&self) {
        self.page_mut().reset();
        self.set_page_id(None);
        self.pin_count.store(0, Ordering::Release);
        self.clear_dirty();
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new() {
        let frame = Frame::new();
        assert!(frame.is_empty());
        assert!(!frame.is_pinned());
        assert!(!frame.is_dirty());
        assert_eq!(frame.page_id(), None);
        assert!(frame.page().is_zeroed());
    }

    #[test]
    fn test_frame_pin_unpin() {
        let frame = Frame::new();

        assert_eq!(frame.pin(), 1);
        assert_eq!(frame.pin(), 2);
        assert_eq!(frame.unpin(), Some(1));
        assert!(frame.is_pinned());
        assert_eq!(frame.unpin(), Some(0));
        assert!(!frame.is_pinned());
    }

    #[test]
    fn test_frame_unpin_never_underflows() {
        let frame = Frame::new();
        assert_eq!(frame.unpin(), None);
        assert_eq!(frame.pin_count(), 0);

        frame.pin();
        frame.unpin();
        assert_eq!(frame.unpin(), None);
        assert_eq!(frame.pin_count(), 0);
    }

    #[test]
    fn test_frame_dirty_flag() {
        let frame = Frame::new();
        frame.mark_dirty();
        frame.mark_dirty();
        assert!(frame.is_dirty());

        frame.clear_dirty();
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_frame_evictable() {
        let frame = Frame::new();
        assert!(!frame.is_evictable());

        frame.set_page_id(Some(PageId::new(1)));
        assert!(frame.is_evictable());

        frame.pin();
        assert!(!frame.is_evictable());

        frame.unpin();
        assert!(frame.is_evictable());
    }

    #[test]
    fn test_frame_reset() {
        let frame = Frame::new();
        frame.set_page_id(Some(PageId::new(99)));
        frame.mark_dirty();
        frame.page_mut().as_mut_slice()[100] = 0xFF;

        frame.reset();

        assert!(frame.is_empty());
        assert!(!frame.is_dirty());
        assert_eq!(frame.page().as_slice()[100], 0);
    }

    #[test]
    fn test_frame_concurrent_readers() {
        use std::sync::Arc;
        use std::thread;

        let frame = Arc::new(Frame::new());
        frame.page_mut().as_mut_slice()[0] = 0x42;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let frame = Arc::clone(&frame);
                thread::spawn(move || {
                    let page = frame.page();
                    assert_eq!(page.as_slice()[0], 0x42);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
