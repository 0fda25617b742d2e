//! pinstore - A buffer pool with a clock replacer and a disk-resident
//! linear probing hash index.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            pinstore                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Index Layer (index/)                    │   │
//! │  │   LinearProbeHashTable: header page + block pages       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Buffer Pool (buffer/)                   │   │
//! │  │   ┌─────────────────────────────────────────────────┐   │   │
//! │  │   │   Replacer: CLOCK (second chance)               │   │   │
//! │  │   └─────────────────────────────────────────────────┘   │   │
//! │  │   BufferPoolManager + Frame + PageGuards + Statistics   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Storage Layer (storage/)                 │   │
//! │  │      PageStore: DiskManager | MemoryDisk + Page         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Rid, Error, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`buffer`] - Buffer pool management and the clock replacer
//! - [`index`] - Linear probing hash index
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//!
//! use pinstore::{BufferPoolManager, DiskManager, IntHashTable};
//!
//! let disk = DiskManager::create("my_database.db").unwrap();
//! let bpm = Arc::new(BufferPoolManager::new(64, disk));
//!
//! let table = IntHashTable::new(Arc::clone(&bpm), 1000).unwrap();
//! table.insert(&1, &10).unwrap();
//! assert_eq!(table.get_value(&1).unwrap(), vec![10]);
//!
//! bpm.flush_all_pages().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, PageId, Result, Rid};

pub use buffer::replacer::{ClockReplacer, Replacer};
pub use buffer::{
    BufferPoolManager, BufferPoolStats, Frame, PageReadGuard, PageWriteGuard, StatsSnapshot,
};
pub use index::{
    Crc32Hasher, DefaultComparator, FixedCodec, GenericHashIndex, GenericKey, IntHashTable,
    KeyComparator, KeyHasher, LinearProbeHashTable,
};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::{DiskManager, MemoryDisk, PageStore};
