//! Storage layer - disk I/O and page formats.
//!
//! - [`PageStore`] - The page I/O contract the buffer pool consumes
//! - [`DiskManager`] - Single-file implementation
//! - [`MemoryDisk`] - Heap-backed implementation for tests and scratch pools
//! - [`page`] - Page types and layouts

mod disk_manager;
mod memory_disk;
pub mod page;
mod page_store;

pub use disk_manager::DiskManager;
pub use memory_disk::MemoryDisk;
pub use page_store::PageStore;
