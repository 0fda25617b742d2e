//! Heap-backed page store.

use std::collections::{BTreeSet, HashMap};

use crate::common::config::MAX_PAGES;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;
use crate::storage::PageStore;

/// A [`PageStore`] that keeps every page in memory.
///
/// Same id allocation rules as [`DiskManager`](super::DiskManager):
/// sequential ids, freed ids reused lowest first.
#[derive(Default)]
pub struct MemoryDisk {
    pages: HashMap<PageId, Box<Page>>,
    free_pages: BTreeSet<u32>,
    page_count: u32,
}

impl MemoryDisk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (allocated and not freed) pages.
    pub fn live_pages(&self) -> usize {
        self.pages.len()
    }

    fn live_page(&mut self, page_id: PageId) -> Result<&mut Page> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }
        self.pages
            .get_mut(&page_id)
            .map(|page| &mut **page)
            .ok_or(Error::PageNotFound(page_id.0))
    }
}

impl PageStore for MemoryDisk {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        page.copy_from(self.live_page(page_id)?);
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.live_page(page_id)?.copy_from(page);
        Ok(())
    }

    fn allocate_page(&mut self) -> Result<PageId> {
        let page_id = match self.free_pages.pop_first() {
            Some(reused) => PageId::new(reused),
            None => {
                if u64::from(self.page_count) >= MAX_PAGES {
                    return Err(Error::InvalidPageId(self.page_count));
                }
                self.page_count += 1;
                PageId::new(self.page_count - 1)
            }
        };
        self.pages.insert(page_id, Box::new(Page::new()));
        Ok(page_id)
    }

    fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        if self.pages.remove(&page_id).is_none() {
            return Err(Error::PageNotFound(page_id.0));
        }
        self.free_pages.insert(page_id.0);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.page_count
    }
}
