//! Buffer pool statistics.
//!
//! Counters are relaxed atomics: each one is exact, but a snapshot taken
//! while other threads run may mix values from slightly different moments.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the buffer pool.
#[derive(Debug, Default)]
pub struct BufferPoolStats {
    /// Fetches served from a resident frame.
    pub cache_hits: AtomicU64,
    /// Fetches that had to read from disk.
    pub cache_misses: AtomicU64,
    /// Frames reclaimed from the replacer.
    pub evictions: AtomicU64,
    /// Evictions that had to write a dirty page back first.
    pub dirty_writebacks: AtomicU64,
    /// Pages read from the disk collaborator.
    pub pages_read: AtomicU64,
    /// Pages written to the disk collaborator (write-backs and flushes).
    pub pages_written: AtomicU64,
    /// Pages allocated through the pool.
    pub pages_allocated: AtomicU64,
    /// Pages deallocated through the pool.
    pub pages_deallocated: AtomicU64,
}

impl BufferPoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy every counter out.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            dirty_writebacks: self.dirty_writebacks.load(Ordering::Relaxed),
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
            pages_allocated: self.pages_allocated.load(Ordering::Relaxed),
            pages_deallocated: self.pages_deallocated.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.cache_hits,
            &self.cache_misses,
            &self.evictions,
            &self.dirty_writebacks,
            &self.pages_read,
            &self.pages_written,
            &self.pages_allocated,
            &self.pages_deallocated,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A plain copy of [`BufferPoolStats`] that can be compared and printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub dirty_writebacks: u64,
    pub pages_read: u64,
    pub pages_written: u64,
    pub pages_allocated: u64,
    pub pages_deallocated: u64,
}

impl StatsSnapshot {
    /// Cache hit rate in `[0.0, 1.0]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Disk operations (reads plus writes) since the counters were reset.
    pub fn disk_io(&self) -> u64 {
        self.pages_read + self.pages_written
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, evictions: {} ({} dirty), reads: {}, writes: {}, hit_rate: {:.2}% }}",
            self.cache_hits,
            self.cache_misses,
            self.evictions,
            self.dirty_writebacks,
            self.pages_read,
            self.pages_written,
            self.hit_rate() * 100.0
        )
    }
}
