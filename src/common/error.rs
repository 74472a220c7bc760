//! Error types for pagepool.

use thiserror::Error;

use crate::common::PageId;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All failures surfaced by the buffer pool stack.
///
/// Structural conditions (pool exhausted, unknown page on fetch, pinned
/// delete) are *not* errors; they come back as empty options or `false`.
/// This enum covers the per-request disk faults that the I/O scheduler
/// carries through each request's completion slot to the one caller that
/// issued it.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The page id has no offset mapping in the disk store.
    #[error("page {0} is not allocated on disk")]
    UnknownPage(PageId),

    /// The backing file ended in the middle of a page.
    #[error("short read on page {page_id}: got {got} of {expected} bytes")]
    ShortRead {
        page_id: PageId,
        expected: usize,
        got: usize,
    },

    /// An I/O worker hung up without resolving the request's completion
    /// slot. Confined to the affected request; other in-flight requests
    /// and workers are unaffected.
    #[error("I/O worker hung up before completing the request")]
    WorkerFault,
}
