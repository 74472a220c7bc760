//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] is the single authority mediating between
//! logical pages and physical frames:
//! - page caching between disk and memory
//! - pin-based reference counting via [`PageReadGuard`] / [`PageWriteGuard`]
//! - automatic dirty write-back on eviction
//! - LRU-K victim selection

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;

use crate::buffer::replacer::LruKReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{BufferPoolConfig, FrameId, PageId, Result};
use crate::storage::{DiskStore, IoRequest, IoScheduler};

/// Structural state behind the manager lock.
///
/// The forward and reverse page tables must always agree on membership;
/// every mutation of either happens with this struct locked.
struct PoolState {
    /// Maps resident page ids to frame ids.
    page_table: HashMap<PageId, FrameId>,

    /// Maps bound frame ids back to their page ids.
    frame_table: HashMap<FrameId, PageId>,

    /// Frames not associated with any page (LIFO).
    free_list: Vec<FrameId>,

    /// Monotonically increasing; ids are never reused, even after deletion,
    /// so a stale reference to a deleted page resolves to "unknown" instead
    /// of aliasing an unrelated page.
    next_page_id: u64,
}

/// Manages a pool of buffer frames caching disk pages.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                      BufferPoolManager                       │
/// │  ┌──────────────────┐   ┌────────────────────────────────┐   │
/// │  │ state (Mutex)    │   │       frames: Vec<Frame>       │   │
/// │  │  page_table ────────▶│  [Frame0] [Frame1] [Frame2] …  │   │
/// │  │  frame_table     │   └────────────────────────────────┘   │
/// │  │  free_list       │   ┌──────────────┐  ┌─────────────┐    │
/// │  │  next_page_id    │   │   replacer   │  │  scheduler  │    │
/// │  └──────────────────┘   │ LruKReplacer │  │ IoScheduler │    │
/// │                         └──────────────┘  └─────────────┘    │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Locking
/// - `state`: the manager lock. One process-wide lock over all structural
///   state, held across the entire free-frame resolution — including the
///   synchronous wait for an eviction flush or a miss read. That serializes
///   structural mutations behind disk latency; a deliberate
///   simplicity-over-throughput trade-off, and the main scalability
///   limiter of this design.
/// - `replacer`: the policy's own lock, only ever taken as the innermost.
/// - per-frame `RwLock`: owned by guards. A frame is pinned under the
///   manager lock *before* its lock is acquired, so blocking on a contended
///   frame never stalls other pages' traffic and never races eviction.
///
/// Lock order: manager lock → frame lock → replacer lock.
///
/// # Usage
/// ```ignore
/// let bpm = BufferPoolManager::new(config, disk_store);
///
/// let pid = bpm.new_page()?;
/// let mut guard = bpm.fetch_page_write(pid)?.unwrap();
/// guard.data_mut()[0] = 0xAB;
/// drop(guard); // unpinned, evictable again
/// ```
pub struct BufferPoolManager {
    /// Fixed pool of frames allocated at construction.
    frames: Vec<Frame>,

    /// Structural state: page tables, free list, id allocation.
    state: Mutex<PoolState>,

    /// Eviction policy, behind its own lock.
    replacer: Mutex<LruKReplacer>,

    /// Worker pool owning the disk store.
    scheduler: IoScheduler,

    /// Performance counters.
    stats: BufferPoolStats,

    /// Page size in bytes (immutable after construction).
    page_size: usize,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager over the given disk store.
    ///
    /// # Panics
    /// Panics if the config requests zero frames, or if its page size
    /// disagrees with the disk store's.
    pub fn new(config: BufferPoolConfig, disk_store: DiskStore) -> Self {
        assert!(config.num_frames > 0, "num_frames must be > 0");
        assert_eq!(
            config.page_size,
            disk_store.page_size(),
            "config and disk store disagree on page size"
        );

        let frames = (0..config.num_frames)
            .map(|_| Frame::new(config.page_size))
            .collect();
        let free_list = (0..config.num_frames).map(FrameId::new).collect();

        Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                frame_table: HashMap::new(),
                free_list,
                next_page_id: 0,
            }),
            replacer: Mutex::new(LruKReplacer::new(config.num_frames, config.replacer_k)),
            scheduler: IoScheduler::new(disk_store, config.io_workers),
            stats: BufferPoolStats::new(),
            page_size: config.page_size,
        }
    }

    // ========================================================================
    // Public API: Create and delete pages
    // ========================================================================

    /// Reserve the next page id and bind it to a frame.
    ///
    /// The frame starts dirty so that its first flush materializes the page
    /// on disk; no disk space is reserved here. The new page is not pinned.
    /// Returns [`PageId::INVALID`] if no frame could be freed.
    ///
    /// # Errors
    /// Propagates a disk fault from flushing an evicted dirty page.
    pub fn new_page(&self) -> Result<PageId> {
        let mut state = self.state.lock();

        let Some(frame_id) = self.get_free_frame(&mut state)? else {
            return Ok(PageId::INVALID);
        };

        let page_id = PageId::new(state.next_page_id);
        state.next_page_id += 1;

        self.frames[frame_id.0].mark_dirty();
        state.page_table.insert(page_id, frame_id);
        state.frame_table.insert(frame_id, page_id);

        Ok(page_id)
    }

    /// Delete a page.
    ///
    /// Returns `false`, with no state change, if the page's frame is
    /// pinned. Otherwise unbinds the frame, returns it to the free list,
    /// drops the replacer history, and releases the disk slot. The page id
    /// is never reassigned.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.0];

            if frame.is_pinned() {
                return false;
            }

            // No flush: the content dies with the page.
            frame.reset();
            state.page_table.remove(&page_id);
            state.frame_table.remove(&frame_id);
            state.free_list.push(frame_id);

            self.replacer.lock().remove(frame_id);
        }

        self.scheduler.delete_page(page_id);
        true
    }

    // ========================================================================
    // Public API: Guard acquisition
    // ========================================================================

    /// Fetch a page for reading (shared access).
    ///
    /// Returns `Ok(None)` if the page id is neither resident nor known to
    /// the disk store, or if no frame could be freed for it.
    ///
    /// # Errors
    /// Propagates a disk fault from the load, or from flushing an evicted
    /// dirty page.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<Option<PageReadGuard<'_>>> {
        let Some(frame_id) = self.resolve_frame(page_id)? else {
            return Ok(None);
        };
        let lock = self.frames[frame_id.0].data();

        Ok(Some(PageReadGuard::new(self, frame_id, page_id, lock)))
    }

    /// Fetch a page for writing (exclusive access).
    ///
    /// Same resolution as [`fetch_page_read`], but the returned guard holds
    /// the frame's lock exclusively.
    ///
    /// [`fetch_page_read`]: BufferPoolManager::fetch_page_read
    ///
    /// # Errors
    /// Propagates a disk fault from the load, or from flushing an evicted
    /// dirty page.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<Option<PageWriteGuard<'_>>> {
        let Some(frame_id) = self.resolve_frame(page_id)? else {
            return Ok(None);
        };
        let lock = self.frames[frame_id.0].data_mut();

        Ok(Some(PageWriteGuard::new(self, frame_id, page_id, lock)))
    }

    // ========================================================================
    // Public API: Diagnostics
    // ========================================================================

    /// Pin count of the page's frame, or `None` if the page is not
    /// resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<usize> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|&frame_id| self.frames[frame_id.0].pin_count())
    }

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// Configured page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of frames not bound to any page.
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Number of pages currently resident.
    pub fn resident_page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    // ========================================================================
    // Internal: Guard support
    // ========================================================================

    pub(crate) fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id.0]
    }

    /// Called by guards on release: drop the pin; at zero the frame becomes
    /// evictable again.
    pub(crate) fn unpin_frame(&self, frame_id: FrameId) {
        if self.frames[frame_id.0].unpin() == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }
    }

    /// Synchronously write `data` back as `page_id`'s content. Used by
    /// [`PageWriteGuard::flush`].
    ///
    /// [`PageWriteGuard::flush`]: crate::buffer::PageWriteGuard::flush
    pub(crate) fn write_through(&self, page_id: PageId, data: Box<[u8]>) -> Result<()> {
        let (request, completion) = IoRequest::write(page_id, data);
        self.scheduler.schedule(request);
        completion.wait()?;
        self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    // ========================================================================
    // Internal: Frame resolution
    // ========================================================================

    /// Resolve a page to a pinned frame, loading from disk on a miss.
    ///
    /// On success the frame is pinned, recorded with the replacer, and
    /// marked not evictable — all before the manager lock is released — so
    /// the caller can acquire the frame's lock without racing eviction.
    fn resolve_frame(&self, page_id: PageId) -> Result<Option<FrameId>> {
        let mut state = self.state.lock();

        // Fast path: already resident.
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            self.pin_frame(frame_id);
            return Ok(Some(frame_id));
        }

        // Neither resident nor on disk: the id is unknown or was deleted.
        if !self.scheduler.page_exists(page_id) {
            return Ok(None);
        }

        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);

        let Some(frame_id) = self.get_free_frame(&mut state)? else {
            return Ok(None);
        };

        state.page_table.insert(page_id, frame_id);
        state.frame_table.insert(frame_id, page_id);

        // Read the page into the frame, blocking on the completion slot.
        let (request, completion) = IoRequest::read(page_id);
        self.scheduler.schedule(request);
        match completion.wait() {
            Ok(data) => {
                self.frames[frame_id.0].data_mut().copy_from_slice(&data);
            }
            Err(e) => {
                // Undo the binding so the failed load leaves no trace.
                state.page_table.remove(&page_id);
                state.frame_table.remove(&frame_id);
                state.free_list.push(frame_id);
                return Err(e);
            }
        }

        self.stats.pages_read.fetch_add(1, Ordering::Relaxed);
        self.pin_frame(frame_id);
        Ok(Some(frame_id))
    }

    /// Pin the frame and update the replacer. Caller holds the manager
    /// lock.
    fn pin_frame(&self, frame_id: FrameId) {
        self.frames[frame_id.0].pin();

        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id);
        replacer.set_evictable(frame_id, false);
    }

    /// Pop a frame from the free list, or evict one.
    ///
    /// A dirty victim is flushed through the scheduler first, blocking
    /// until the write completes — the allocator stalls on I/O rather than
    /// risk losing an update. The reclaimed frame comes back zeroed and
    /// unbound.
    fn get_free_frame(&self, state: &mut PoolState) -> Result<Option<FrameId>> {
        if let Some(frame_id) = state.free_list.pop() {
            return Ok(Some(frame_id));
        }

        let Some(frame_id) = self.replacer.lock().evict() else {
            return Ok(None);
        };

        let frame = &self.frames[frame_id.0];
        assert_eq!(frame.pin_count(), 0, "evicted a pinned frame");

        let prev_page_id = state.frame_table.get(&frame_id).copied();

        if frame.is_dirty() {
            if let Some(prev_page_id) = prev_page_id {
                let data = frame.data().to_vec().into_boxed_slice();
                let (request, completion) = IoRequest::write(prev_page_id, data);
                self.scheduler.schedule(request);
                completion.wait()?;
                self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
            }
            frame.clear_dirty();
        }

        frame.reset();
        if let Some(prev_page_id) = prev_page_id {
            state.page_table.remove(&prev_page_id);
        }
        state.frame_table.remove(&frame_id);

        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        Ok(Some(frame_id))
    }
}
