//! Buffer Pool Manager - the page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between the disk collaborator and memory
//! - Pin-based reference counting through RAII guards
//! - Deferred dirty page write-back at eviction time
//! - A pluggable eviction policy (CLOCK by default)

use std::collections::{HashMap, VecDeque};

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::buffer::replacer::{ClockReplacer, Replacer};
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::PageStore;

/// Everything that changes when a page enters or leaves the pool.
///
/// These three structures share invariants (a frame is either on the free
/// list or named by exactly one page-table entry, and only table-resident
/// frames are known to the replacer), so they live behind one lock.
struct PoolState {
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    replacer: Box<dyn Replacer>,
}

/// Manages a fixed pool of frames caching disk pages.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌───────────── state: Mutex<PoolState> ─────────────┐      │
/// │  │ page_table         free_list        replacer      │      │
/// │  │ PageId → FrameId   VecDeque<Fid>    ClockReplacer │      │
/// │  └───────────────────────────────────────────────────┘      │
/// │  ┌───────────────────────────────────┐  ┌──────────────┐    │
/// │  │        frames: Vec<Frame>         │  │ disk: Mutex  │    │
/// │  │  [Frame0] [Frame1] [Frame2] ...   │  │ dyn PageStore│    │
/// │  └───────────────────────────────────┘  └──────────────┘    │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Locking
/// - `state` serializes residency changes and pin-count updates.
/// - Each frame's `RwLock<Page>` is the per-page latch held by guards.
/// - `disk` is a leaf lock, taken last and never held across another lock
///   acquisition.
///
/// Eviction latches the victim's page while holding `state`. That is safe
/// because a victim has no pins, so the only latch holder it can meet is a
/// guard that has already unpinned and is about to release.
///
/// # Usage
/// ```
/// use pinstore::buffer::BufferPoolManager;
/// use pinstore::storage::MemoryDisk;
///
/// let bpm = BufferPoolManager::new(10, MemoryDisk::new());
///
/// let page_id = {
///     let mut guard = bpm.new_page().unwrap();
///     guard.as_mut_slice()[0] = 0xAB;
///     guard.page_id()
/// }; // dirty, unpinned
///
/// let guard = bpm.fetch_page_read(page_id).unwrap();
/// assert_eq!(guard.as_slice()[0], 0xAB);
/// ```
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    state: Mutex<PoolState>,
    disk: Mutex<Box<dyn PageStore>>,
    stats: BufferPoolStats,
    pool_size: usize,
}

impl BufferPoolManager {
    /// Create a buffer pool with `pool_size` frames and CLOCK replacement.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk: impl PageStore + 'static) -> Self {
        Self::with_replacer(pool_size, disk, ClockReplacer::new(pool_size))
    }

    /// Create a buffer pool with a caller-chosen replacement policy.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn with_replacer(
        pool_size: usize,
        disk: impl PageStore + 'static,
        replacer: impl Replacer + 'static,
    ) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: VecDeque<FrameId> = (0..pool_size).map(FrameId::new).collect();

        debug!("buffer pool created with {} frames", pool_size);

        Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                free_list,
                replacer: Box::new(replacer),
            }),
            disk: Mutex::new(Box::new(disk)),
            stats: BufferPoolStats::new(),
            pool_size,
        }
    }

    // ========================================================================
    // Fetch
    // ========================================================================

    /// Fetch a page for shared access, pinning it.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if the page is not resident and every frame
    ///   is pinned
    /// - `Error::PageNotFound` if the page does not exist on disk
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_frame(page_id)?;
        let lock = self.frames[frame_id.0].page();
        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for exclusive access, pinning it.
    ///
    /// # Errors
    /// Same as [`fetch_page_read`](Self::fetch_page_read).
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_frame(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// [`fetch_page_read`](Self::fetch_page_read), with any failure
    /// reported as `None`.
    pub fn checked_read_page(&self, page_id: PageId) -> Option<PageReadGuard<'_>> {
        self.fetch_page_read(page_id).ok()
    }

    /// [`fetch_page_write`](Self::fetch_page_write), with any failure
    /// reported as `None`.
    pub fn checked_write_page(&self, page_id: PageId) -> Option<PageWriteGuard<'_>> {
        self.fetch_page_write(page_id).ok()
    }

    // ========================================================================
    // Create and delete
    // ========================================================================

    /// Allocate a fresh page on disk and return it zeroed and pinned.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned
    /// - Errors from disk allocation
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let mut state = self.state.lock();
        let frame_id = self.acquire_frame(&mut state)?;

        let page_id = match self.disk.lock().allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                state.free_list.push_back(frame_id);
                return Err(e);
            }
        };
        BufferPoolStats::bump(&self.stats.pages_allocated);

        let frame = &self.frames[frame_id.0];
        frame.set_page_id(Some(page_id));
        frame.pin();
        state.page_table.insert(page_id, frame_id);
        state.replacer.pin(frame_id);
        drop(state);

        trace!("new {} in {}", page_id, frame_id);

        let lock = frame.page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Allocate a page id on disk without bringing the page into the pool.
    pub fn allocate_page_id(&self) -> Result<PageId> {
        let page_id = self.disk.lock().allocate_page()?;
        BufferPoolStats::bump(&self.stats.pages_allocated);
        Ok(page_id)
    }

    /// Delete a page: deallocate it on disk and free its frame.
    ///
    /// A page that is not resident is left alone and reported as success.
    ///
    /// # Errors
    /// - `Error::PagePinned` if the page is resident and pinned; the page
    ///   is left untouched
    /// - Errors from disk deallocation
    pub fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.state.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()),
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            debug!("refusing to delete pinned {}", page_id);
            return Err(Error::PagePinned(page_id.0));
        }

        self.disk.lock().deallocate_page(page_id)?;
        BufferPoolStats::bump(&self.stats.pages_deallocated);

        state.page_table.remove(&page_id);
        state.replacer.remove(frame_id);
        frame.reset();
        state.free_list.push_back(frame_id);

        trace!("deleted {} from {}", page_id, frame_id);
        Ok(())
    }

    // ========================================================================
    // Unpin
    // ========================================================================

    /// Release one pin on a resident page, OR-ing in `is_dirty`.
    ///
    /// Guards call this on drop. When the pin count reaches zero the frame
    /// becomes a replacement candidate.
    ///
    /// # Errors
    /// - `Error::PageNotResident` if the page is not in the pool
    /// - `Error::PageNotPinned` if the pin count is already zero
    pub(crate) fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<()> {
        let mut state = self.state.lock();

        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(Error::PageNotResident(page_id.0))?;
        let frame = &self.frames[frame_id.0];

        let remaining = frame.unpin().ok_or_else(|| {
            warn!("unpin of {} with pin count 0", page_id);
            Error::PageNotPinned(page_id.0)
        })?;

        if is_dirty {
            frame.mark_dirty();
        }
        if remaining == 0 {
            state.replacer.unpin(frame_id);
        }

        Ok(())
    }

    // ========================================================================
    // Flush
    // ========================================================================

    /// Write a resident page to disk if it is dirty, then clear its dirty
    /// flag.
    ///
    /// # Errors
    /// - `Error::PageNotResident` if the page is not in the pool
    /// - Errors from the disk write
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let state = self.state.lock();
        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(Error::PageNotResident(page_id.0))?;
        let frame = &self.frames[frame_id.0];

        // Unpinned: write back under the state lock, as eviction does, and
        // leave the replacer alone.
        if !frame.is_pinned() {
            return self.write_back(frame_id, page_id);
        }

        // The replacer already holds the frame as pinned; an extra pin keeps
        // it resident once the state lock is gone.
        frame.pin();
        drop(state);

        let flushed = self.write_back(frame_id, page_id);
        let unpinned = self.unpin_page(page_id, false);
        flushed.and(unpinned)
    }

    /// Flush every resident page.
    pub fn flush_all_pages(&self) -> Result<()> {
        let resident: Vec<PageId> = self.state.lock().page_table.keys().copied().collect();

        for page_id in resident {
            match self.flush_page(page_id) {
                // Evicted in the meantime, and written back if it was dirty.
                Ok(()) | Err(Error::PageNotResident(_)) => {}
                Err(e) => return Err(e),
            }
        }

        debug!("flushed all pages");
        Ok(())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Number of resident pages.
    pub fn page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Number of frames the replacer could evict right now.
    pub fn evictable_count(&self) -> usize {
        self.state.lock().replacer.size()
    }

    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.state.lock().page_table.contains_key(&page_id)
    }

    /// Pin count of a resident page, `None` if not resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|fid| self.frames[fid.0].pin_count())
    }

    /// Dirty flag of a resident page, `None` if not resident.
    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|fid| self.frames[fid.0].is_dirty())
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// Pin `page_id` in a frame, loading it from disk on a miss.
    fn fetch_frame(&self, page_id: PageId) -> Result<FrameId> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }

        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.frames[frame_id.0].pin();
            state.replacer.pin(frame_id);
            BufferPoolStats::bump(&self.stats.cache_hits);
            trace!("hit {} in {}", page_id, frame_id);
            return Ok(frame_id);
        }

        BufferPoolStats::bump(&self.stats.cache_misses);
        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id.0];

        {
            let mut page = frame.page_mut();
            if let Err(e) = self.disk.lock().read_page(page_id, &mut page) {
                page.reset();
                drop(page);
                state.free_list.push_back(frame_id);
                return Err(e);
            }
        }
        BufferPoolStats::bump(&self.stats.pages_read);

        frame.set_page_id(Some(page_id));
        frame.clear_dirty();
        frame.pin();
        state.page_table.insert(page_id, frame_id);
        state.replacer.pin(frame_id);

        trace!("miss {}, loaded into {}", page_id, frame_id);
        Ok(frame_id)
    }

    /// Take a frame from the free list, or evict one.
    ///
    /// The returned frame is empty, zeroed and in no structure.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = state.replacer.victim().ok_or_else(|| {
            debug!("no victim: all {} frames pinned", self.pool_size);
            Error::NoFreeFrames
        })?;
        let frame = &self.frames[frame_id.0];
        debug_assert!(!frame.is_pinned(), "replacer chose pinned {}", frame_id);

        if let Some(old_page_id) = frame.page_id() {
            if frame.is_dirty() {
                let page = frame.page();
                if let Err(e) = self.disk.lock().write_page(old_page_id, &page) {
                    drop(page);
                    state.replacer.unpin(frame_id);
                    return Err(e);
                }
                BufferPoolStats::bump(&self.stats.pages_written);
                BufferPoolStats::bump(&self.stats.dirty_writebacks);
            }
            state.page_table.remove(&old_page_id);
            trace!("evicted {} from {}", old_page_id, frame_id);
        }

        frame.reset();
        BufferPoolStats::bump(&self.stats.evictions);
        Ok(frame_id)
    }

    /// Write a frame's page to disk if dirty. The frame must be pinned or
    /// the caller must hold the state lock.
    fn write_back(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];
        let page = frame.page();

        if frame.is_dirty() {
            self.disk.lock().write_page(page_id, &page)?;
            frame.clear_dirty();
            BufferPoolStats::bump(&self.stats.pages_written);
            trace!("flushed {}", page_id);
        }

        Ok(())
    }
}
