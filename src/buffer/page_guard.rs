//! Scoped guards for page access.
//!
//! A guard is a move-only capability over one frame's bytes, and the only
//! sanctioned way to touch page memory:
//! - [`PageReadGuard`] - shared access (multiple readers allowed)
//! - [`PageWriteGuard`] - exclusive access; mutable access marks the frame
//!   dirty
//!
//! The frame is pinned (and marked not evictable) by the buffer pool
//! manager before the guard is handed out; the guard owns that pin plus the
//! frame's reader/writer lock until it is released. Release happens at
//! scope exit, or earlier via the idempotent [`drop_guard`]: the lock is
//! released first, then the pin is dropped, so the frame only becomes
//! eligible for eviction once nobody can be touching its bytes.
//!
//! [`drop_guard`]: PageReadGuard::drop_guard

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId, Result};

use super::buffer_pool_manager::BufferPoolManager;

/// Guard for read-only page access.
///
/// Multiple `PageReadGuard`s can exist for the same page simultaneously.
///
/// # Example
/// ```ignore
/// let guard = bpm.fetch_page_read(page_id)?.unwrap();
/// let first = guard.data()[0];
/// // guard drops here: lock released, frame unpinned
/// ```
pub struct PageReadGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    /// `None` once the guard has been released.
    lock: Option<RwLockReadGuard<'a, Box<[u8]>>>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Box<[u8]>>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Read-only view of the page bytes.
    ///
    /// # Panics
    /// Panics if the guard has already been released.
    #[inline]
    pub fn data(&self) -> &[u8] {
        match &self.lock {
            Some(lock) => lock.as_ref(),
            None => panic!("page guard accessed after release"),
        }
    }

    /// Release the lock and the pin.
    ///
    /// Idempotent: a second call, or the implicit drop after an explicit
    /// call, is a no-op.
    pub fn drop_guard(&mut self) {
        if let Some(lock) = self.lock.take() {
            drop(lock);
            self.bpm.unpin_frame(self.frame_id);
        }
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.data()
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}

/// Guard for exclusive write access to a page.
///
/// Only one `PageWriteGuard` can exist for a page at a time, and no readers
/// coexist with it, so no reader ever observes a torn write. Any mutable
/// access marks the frame dirty.
///
/// # Example
/// ```ignore
/// let mut guard = bpm.fetch_page_write(page_id)?.unwrap();
/// guard.data_mut()[0] = 0xFF;
/// guard.flush()?; // force durability without giving up the pin
/// ```
pub struct PageWriteGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    /// `None` once the guard has been released.
    lock: Option<RwLockWriteGuard<'a, Box<[u8]>>>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Box<[u8]>>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Read-only view of the page bytes.
    ///
    /// # Panics
    /// Panics if the guard has already been released.
    #[inline]
    pub fn data(&self) -> &[u8] {
        match &self.lock {
            Some(lock) => lock.as_ref(),
            None => panic!("page guard accessed after release"),
        }
    }

    /// Mutable view of the page bytes.
    ///
    /// Marks the frame dirty on every call: any mutable access is assumed
    /// to modify the page.
    ///
    /// # Panics
    /// Panics if the guard has already been released.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.bpm.frame(self.frame_id).mark_dirty();
        match &mut self.lock {
            Some(lock) => lock.as_mut(),
            None => panic!("page guard accessed after release"),
        }
    }

    /// Synchronously write the current bytes back to disk.
    ///
    /// Independent of eviction-triggered flushing: forces durability
    /// without giving up the pin or the lock.
    ///
    /// # Errors
    /// Propagates the disk fault from the scheduled write, if any.
    pub fn flush(&self) -> Result<()> {
        let data = self.data().to_vec().into_boxed_slice();
        self.bpm.write_through(self.page_id, data)
    }

    /// Release the lock and the pin.
    ///
    /// Idempotent: a second call, or the implicit drop after an explicit
    /// call, is a no-op.
    pub fn drop_guard(&mut self) {
        if let Some(lock) = self.lock.take() {
            drop(lock);
            self.bpm.unpin_frame(self.frame_id);
        }
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.data()
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        self.data_mut()
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}
