//! Eviction policy implementations (replacers).
//!
//! The buffer pool talks to its policy only through [`Replacer`], so a
//! different policy can be dropped in with
//! [`BufferPoolManager::with_replacer`](crate::buffer::BufferPoolManager::with_replacer).
//!
//! - [`ClockReplacer`] - CLOCK / second chance

mod clock;

pub use clock::ClockReplacer;

use crate::common::FrameId;

/// Chooses which unpinned frame to reclaim.
///
/// The buffer pool calls every method while holding its pool-wide lock.
pub trait Replacer: Send {
    /// The frame is in use and must not be victimized.
    fn pin(&mut self, frame_id: FrameId);

    /// The frame's pin count dropped to zero; it may now be victimized.
    fn unpin(&mut self, frame_id: FrameId);

    /// Pick a victim and stop tracking it. `None` if nothing is evictable.
    fn victim(&mut self) -> Option<FrameId>;

    /// Stop tracking the frame (its page was deleted).
    fn remove(&mut self, frame_id: FrameId);

    /// Number of frames currently eligible for eviction.
    fn size(&self) -> usize;
}
