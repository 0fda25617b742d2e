//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between index structures and
//! disk. It manages a fixed set of frames, each holding one page.
//!
//! - [`BufferPoolManager`] - The page cache
//! - [`Frame`] - A slot holding a page plus pin count and dirty flag
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII guards for page access
//! - [`BufferPoolStats`] - Counters
//! - [`replacer`] - Eviction policies

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
