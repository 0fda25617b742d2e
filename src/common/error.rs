//! Error types for pinstore.
//!
//! Every failure in the core is a recoverable return signal. Nothing here is
//! meant to abort the process; callers decide whether to back off or give up.

use thiserror::Error;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors surfaced by the buffer pool, the disk layer and the hash index.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the disk collaborator.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on disk (never allocated or deallocated).
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// Every frame is pinned: the free list is empty and the replacer has
    /// no victim.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// The page is not resident in the buffer pool.
    #[error("Page {0} is not resident in the buffer pool")]
    PageNotResident(u32),

    /// The page is pinned and cannot be deleted.
    #[error("Page {0} is pinned")]
    PagePinned(u32),

    /// Attempted to unpin a page whose pin count is already zero.
    #[error("Page {0} is not pinned")]
    PageNotPinned(u32),

    /// The provided page ID is invalid (sentinel or past the address space).
    #[error("Invalid page ID: {0}")]
    InvalidPageId(u32),

    /// A probe visited every slot without finding room for the entry.
    #[error("Hash table is full")]
    HashTableFull,

    /// A page did not have the layout its reader expected.
    #[error("Page {page_id} is corrupted: {reason}")]
    CorruptedPage { page_id: u32, reason: String },

    /// A caller-supplied parameter is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
