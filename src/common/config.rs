//! Construction-time configuration for the buffer pool stack.

/// Default size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems and the common database page
/// granularity. Every component sizes its buffers from the configured page
/// size; this constant is only the default.
pub const PAGE_SIZE: usize = 4096;

/// Knobs for the buffer pool stack, passed to [`BufferPoolManager::new`].
///
/// Every value that would otherwise be a compile-time constant lives here:
/// frame count, page size, the LRU-K `k`, and the I/O worker count. The
/// config is consumed at construction; none of these can change at runtime.
///
/// [`BufferPoolManager::new`]: crate::buffer::BufferPoolManager::new
///
/// # Example
/// ```
/// use pagepool::BufferPoolConfig;
///
/// let config = BufferPoolConfig {
///     num_frames: 16,
///     ..BufferPoolConfig::default()
/// };
/// assert_eq!(config.page_size, 4096);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub num_frames: usize,

    /// Size of a page (and of every frame buffer) in bytes.
    pub page_size: usize,

    /// The `k` of the LRU-K replacement policy: how many access timestamps
    /// are tracked per frame.
    pub replacer_k: usize,

    /// Number of worker threads draining the I/O scheduler's request queue.
    pub io_workers: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            num_frames: 64,
            page_size: PAGE_SIZE,
            replacer_k: 2,
            io_workers: 4,
        }
    }
}
