//! pagepool - a disk-backed page cache for a row/column store.
//!
//! The crate multiplexes a bounded set of in-memory frames over an
//! unbounded file-resident page space, using LRU-K eviction and
//! reference-counted, lock-protected access guards.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Columnar storage layer                   │
//! │            (external: segments, row groups, CLI)            │
//! └─────────────────────────────┬───────────────────────────────┘
//!                               │ guard acquisition only
//! ┌─────────────────────────────▼───────────────────────────────┐
//! │                 Buffer Pool (buffer/)                       │
//! │   BufferPoolManager + Frame + LruKReplacer + PageGuards     │
//! └─────────────────────────────┬───────────────────────────────┘
//!                               │ IoRequest + completion slot
//! ┌─────────────────────────────▼───────────────────────────────┐
//! │                Storage Layer (storage/)                     │
//! │              IoScheduler  ──▶  DiskStore                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Guarantees
//! - No page is evicted while pinned.
//! - Readers never observe a torn write (per-frame reader/writer locks).
//! - Page identity survives eviction and reload; deleted page ids are
//!   never reused.
//! - Disk faults surface as typed errors to the one caller that issued
//!   the request, never as silently corrupt buffers.
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool manager, frames, guards, eviction policy
//! - [`storage`] - Disk store and I/O scheduler
//!
//! # Quick Start
//! ```no_run
//! use pagepool::{BufferPoolConfig, BufferPoolManager, DiskStore};
//!
//! let config = BufferPoolConfig::default();
//! let disk = DiskStore::create("my_database.db", config.page_size).unwrap();
//! let bpm = BufferPoolManager::new(config, disk);
//!
//! // Create a page and write to it through a guard.
//! let page_id = bpm.new_page().unwrap();
//! let mut guard = bpm.fetch_page_write(page_id).unwrap().unwrap();
//! guard.data_mut()[0] = 0xAB;
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{BufferPoolConfig, PAGE_SIZE};
pub use common::{Error, FrameId, PageId, Result};

pub use buffer::replacer::LruKReplacer;
pub use buffer::{BufferPoolManager, BufferPoolStats, Frame, PageReadGuard, PageWriteGuard, StatsSnapshot};
pub use storage::{Completion, DiskStore, IoRequest, IoScheduler};
