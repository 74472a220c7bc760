//! Storage layer - the backing file and the asynchronous I/O scheduler.
//!
//! - [`DiskStore`] - page-id to byte-offset mapping over a single file
//! - [`scheduler`] - worker pool decoupling blocking file I/O from the
//!   buffer manager's critical section

mod disk_store;
pub mod scheduler;

pub use disk_store::DiskStore;
pub use scheduler::{Completion, IoRequest, IoScheduler};
