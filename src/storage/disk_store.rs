//! Disk store - durable mapping from page id to a byte offset in one file.
//!
//! The [`DiskStore`] owns the backing file and the in-memory bookkeeping of
//! which offset each page lives at. The mapping and the free-slot list are
//! **not persisted**: reopening the file loses all knowledge of which
//! offsets are allocated. That is an explicit non-goal of this layer, not
//! an accident.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::{Error, PageId, Result};

/// Maps page ids to slots in a single flat file of fixed-size pages.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Slot 0  │ Slot 1  │ Slot 2  │  ...    │
/// └─────────┴─────────┴─────────┴─────────┘
/// Offset:  0   page_size  2×page_size
/// ```
///
/// The file starts sized to one page and doubles its page capacity whenever
/// allocation would exceed it. Slots freed by [`delete_page`] are reused
/// before the file grows again; page *ids* are never reused — that is the
/// caller's contract — only their slots are.
///
/// # Thread Safety
/// `DiskStore` is single-threaded; all methods take `&mut self`. The
/// [`IoScheduler`] owns the store behind one `Mutex`, so file I/O is never
/// concurrent within this component.
///
/// [`delete_page`]: DiskStore::delete_page
/// [`IoScheduler`]: crate::storage::IoScheduler
pub struct DiskStore {
    file: File,
    page_size: usize,
    /// Byte offset of each materialized page.
    offsets: HashMap<PageId, u64>,
    /// Slot indices freed by deletion, reused before the file grows.
    free_slots: Vec<u64>,
    /// Current file capacity in pages.
    capacity_pages: u64,
}

impl DiskStore {
    /// Create (or truncate) the backing file, sized to a single page.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or resized.
    pub fn create<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        assert!(page_size > 0, "page_size must be > 0");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(page_size as u64)?;

        Ok(Self {
            file,
            page_size,
            offsets: HashMap::new(),
            free_slots: Vec::new(),
            capacity_pages: 1,
        })
    }

    /// Assign an offset to `page_id`.
    ///
    /// Reuses a freed slot if one exists; otherwise takes the next slot,
    /// doubling the file's page capacity when the new slot would exceed it.
    /// A no-op if the page already has an offset.
    ///
    /// # Errors
    /// Returns an error if growing the file fails.
    pub fn allocate_page(&mut self, page_id: PageId) -> Result<()> {
        if self.offsets.contains_key(&page_id) {
            return Ok(());
        }

        let slot = match self.free_slots.pop() {
            Some(slot) => slot,
            None => {
                // With no free slots, slots [0, len) are all occupied.
                let slot = self.offsets.len() as u64;
                if slot + 1 > self.capacity_pages {
                    self.capacity_pages *= 2;
                    self.file
                        .set_len(self.capacity_pages * self.page_size as u64)?;
                }
                slot
            }
        };

        self.offsets.insert(page_id, slot * self.page_size as u64);
        Ok(())
    }

    /// Read a full page into `buf`.
    ///
    /// # Errors
    /// - [`Error::UnknownPage`] if the id has no offset mapping
    /// - [`Error::ShortRead`] if the file ends mid-page
    /// - [`Error::Io`] for any other read failure
    pub fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.page_size);

        let offset = match self.offsets.get(&page_id) {
            Some(&offset) => offset,
            None => return Err(Error::UnknownPage(page_id)),
        };

        self.file.seek(SeekFrom::Start(offset))?;

        // A short read must surface as a typed failure, never be ignored.
        let mut read = 0;
        while read < buf.len() {
            match self.file.read(&mut buf[read..]) {
                Ok(0) => {
                    return Err(Error::ShortRead {
                        page_id,
                        expected: self.page_size,
                        got: read,
                    })
                }
                Ok(n) => read += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Write a full page from `buf`.
    ///
    /// Implicitly allocates an offset if the id is unknown, lazily
    /// materializing a page that so far existed only in memory.
    ///
    /// # Errors
    /// Returns an error if the write or the fsync fails.
    pub fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.page_size);

        if !self.offsets.contains_key(&page_id) {
            self.allocate_page(page_id)?;
        }
        let offset = self.offsets[&page_id];

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Remove the page's mapping and return its slot to the free list.
    ///
    /// A no-op if the id was never materialized on disk.
    pub fn delete_page(&mut self, page_id: PageId) {
        if let Some(offset) = self.offsets.remove(&page_id) {
            self.free_slots.push(offset / self.page_size as u64);
        }
    }

    /// Check whether the page id has an offset mapping.
    #[inline]
    pub fn page_exists(&self, page_id: PageId) -> bool {
        self.offsets.contains_key(&page_id)
    }

    /// Get the configured page size in bytes.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Get the number of pages currently materialized on disk.
    #[inline]
    pub fn allocated_pages(&self) -> usize {
        self.offsets.len()
    }

    /// Get the file capacity in pages.
    #[inline]
    pub fn capacity_pages(&self) -> u64 {
        self.capacity_pages
    }
}
