//! Disk Manager - single-file page storage.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, trace};

use crate::common::config::{MAX_PAGES, PAGE_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;
use crate::storage::PageStore;

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096    ...    N×4096
/// ```
///
/// # Deallocation
/// Deallocated ids are kept in an in-memory set and handed out again
/// (lowest first, zero-filled) by [`allocate_page`](PageStore::allocate_page).
/// The set is not persisted: after reopening, previously freed pages read
/// back as whatever was last written there.
///
/// # Durability
/// Writes and allocations are followed by `fsync()`.
pub struct DiskManager {
    file: File,
    page_count: u32,
    free_pages: BTreeSet<u32>,
}

impl DiskManager {
    /// Create a new database file. Fails if the file already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;
        debug!("created database file {}", path.as_ref().display());

        Ok(Self {
            file,
            page_count: 0,
            free_pages: BTreeSet::new(),
        })
    }

    /// Open an existing database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;
        debug!(
            "opened database file {} with {} pages",
            path.as_ref().display(),
            page_count
        );

        Ok(Self {
            file,
            page_count,
            free_pages: BTreeSet::new(),
        })
    }

    /// Open an existing database file, or create it if missing.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Total size of the database file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        PageId::new(self.page_count).file_offset(PAGE_SIZE)
    }

    fn check_live(&self, page_id: PageId) -> Result<()> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }
        if page_id.0 >= self.page_count || self.free_pages.contains(&page_id.0) {
            return Err(Error::PageNotFound(page_id.0));
        }
        Ok(())
    }

    fn write_at(&mut self, page_id: PageId, bytes: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        self.file.write_all(bytes)?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl PageStore for DiskManager {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        self.check_live(page_id)?;
        self.file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        self.file.read_exact(page.as_mut_slice())?;
        trace!("read {}", page_id);
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.check_live(page_id)?;
        self.write_at(page_id, page.as_slice())?;
        trace!("wrote {}", page_id);
        Ok(())
    }

    fn allocate_page(&mut self) -> Result<PageId> {
        let zeros = [0u8; PAGE_SIZE];

        if let Some(reused) = self.free_pages.pop_first() {
            let page_id = PageId::new(reused);
            self.write_at(page_id, &zeros)?;
            trace!("reallocated {}", page_id);
            return Ok(page_id);
        }

        if u64::from(self.page_count) >= MAX_PAGES {
            return Err(Error::InvalidPageId(self.page_count));
        }

        let page_id = PageId::new(self.page_count);
        self.write_at(page_id, &zeros)?;
        self.page_count += 1;
        trace!("allocated {}", page_id);
        Ok(page_id)
    }

    fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        self.check_live(page_id)?;
        self.free_pages.insert(page_id.0);
        trace!("deallocated {}", page_id);
        Ok(())
    }

    #[inline]
    fn page_count(&self) -> u32 {
        self.page_count
    }
}
