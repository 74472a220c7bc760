//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds one page's bytes plus the metadata needed for buffer
//! management: a pin count for reference counting and a dirty flag for
//! write-back tracking. Which page (if any) occupies the frame is tracked
//! by the buffer pool manager's page tables, not by the frame itself.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A frame in the buffer pool.
///
/// Frames are allocated once at manager construction and live for the
/// manager's lifetime; only their content and page association change.
///
/// # Thread Safety
/// All fields use interior mutability for safe concurrent access:
/// - `data`: `RwLock` — multiple readers or one writer over the bytes
/// - `pin_count`: `AtomicUsize` — lock-free reference counting
/// - `dirty`: `AtomicBool` — lock-free write-back tracking
pub struct Frame {
    /// The page bytes, protected by the frame's reader/writer lock.
    data: RwLock<Box<[u8]>>,

    /// Number of active references to this frame.
    pin_count: AtomicUsize,

    /// Whether the content differs from the last-known disk image.
    dirty: AtomicBool,
}

impl Frame {
    /// Create a new zeroed frame of `page_size` bytes.
    pub fn new(page_size: usize) -> Self {
        Self {
            data: RwLock::new(vec![0u8; page_size].into_boxed_slice()),
            pin_count: AtomicUsize::new(0),
            dirty: AtomicBool::new(false),
        }
    }

    /// Acquire the frame's lock in shared mode.
    #[inline]
    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.data.read()
    }

    /// Acquire the frame's lock in exclusive mode.
    #[inline]
    pub fn data_mut(&self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.data.write()
    }

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub fn pin(&self) -> usize {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if the pin count is already 0.
    #[inline]
    pub fn unpin(&self) -> usize {
        let old = self.pin_count.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    /// Get the current pin count.
    #[inline]
    pub fn pin_count(&self) -> usize {
        self.pin_count.load(Ordering::Relaxed)
    }

    /// Check if the frame is currently pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Mark the frame as dirty (modified since load).
    #[inline]
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    /// Clear the dirty flag.
    #[inline]
    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::Relaxed);
    }

    /// Check if the frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    /// Zero the bytes and clear the dirty flag.
    ///
    /// Called when a frame is unbound from its page. The pin count is left
    /// alone; it must already be 0 when a frame is reset.
    pub fn reset(&self) {
        self.data_mut().fill(0);
        self.clear_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new() {
        let frame = Frame::new(4096);
        assert!(!frame.is_pinned());
        assert!(!frame.is_dirty());
        assert_eq!(frame.pin_count(), 0);
        assert_eq!(frame.data().len(), 4096);
    }

    #[test]
    fn test_frame_pin_unpin() {
        let frame = Frame::new(64);

        assert_eq!(frame.pin(), 1);
        assert!(frame.is_pinned());

        assert_eq!(frame.pin(), 2);
        assert_eq!(frame.pin_count(), 2);

        assert_eq!(frame.unpin(), 1);
        assert!(frame.is_pinned());

        assert_eq!(frame.unpin(), 0);
        assert!(!frame.is_pinned());
    }

    #[test]
    #[should_panic(expected = "pin count underflow")]
    fn test_frame_unpin_underflow() {
        let frame = Frame::new(64);
        frame.unpin();
    }

    #[test]
    fn test_frame_dirty_flag() {
        let frame = Frame::new(64);
        assert!(!frame.is_dirty());

        frame.mark_dirty();
        assert!(frame.is_dirty());

        frame.clear_dirty();
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_frame_data_access() {
        let frame = Frame::new(64);

        frame.data_mut()[0] = 0xAB;
        assert_eq!(frame.data()[0], 0xAB);
    }

    #[test]
    fn test_frame_reset() {
        let frame = Frame::new(64);

        frame.mark_dirty();
        frame.data_mut()[10] = 0xFF;

        frame.reset();

        assert!(!frame.is_dirty());
        assert_eq!(frame.data()[10], 0);
    }

    #[test]
    fn test_frame_concurrent_reads() {
        use std::sync::Arc;
        use std::thread;

        let frame = Arc::new(Frame::new(64));
        frame.data_mut()[0] = 0x42;

        let mut handles = vec![];

        for _ in 0..10 {
            let frame = Arc::clone(&frame);
            handles.push(thread::spawn(move || {
                assert_eq!(frame.data()[0], 0x42);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_frame_concurrent_pin() {
        use std::sync::Arc;
        use std::thread;

        let frame = Arc::new(Frame::new(64));
        let mut handles = vec![];

        for _ in 0..10 {
            let frame = Arc::clone(&frame);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    frame.pin();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(frame.pin_count(), 1000);
    }
}
