//! I/O scheduler - a worker pool that removes blocking disk I/O from the
//! buffer manager's lock-held path.
//!
//! Callers build an [`IoRequest`], hand it to [`IoScheduler::schedule`]
//! (which never blocks), and await the paired [`Completion`] slot. Each
//! request resolves exactly once, with either the payload or the captured
//! disk fault, delivered to the one caller that issued it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::common::{Error, PageId, Result};
use crate::storage::DiskStore;

/// Receiving half of a request's single-assignment result slot.
///
/// `wait` blocks until the worker resolves the request. If the worker hangs
/// up without resolving (it died mid-request, or the request was dropped at
/// shutdown), the caller gets [`Error::WorkerFault`] rather than a hang.
pub struct Completion<T> {
    rx: mpsc::Receiver<Result<T>>,
}

impl<T> Completion<T> {
    /// Block until the request completes, returning its result.
    pub fn wait(self) -> Result<T> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(Error::WorkerFault),
        }
    }
}

/// An I/O descriptor submitted to the scheduler.
///
/// Writes carry an owned copy of the page bytes so the worker needs no
/// access to the caller's frame; reads hand a freshly filled buffer back
/// through the completion slot.
pub enum IoRequest {
    Read {
        page_id: PageId,
        slot: mpsc::SyncSender<Result<Box<[u8]>>>,
    },
    Write {
        page_id: PageId,
        data: Box<[u8]>,
        slot: mpsc::SyncSender<Result<()>>,
    },
}

impl IoRequest {
    /// Build a read request and its completion slot.
    pub fn read(page_id: PageId) -> (Self, Completion<Box<[u8]>>) {
        let (tx, rx) = mpsc::sync_channel(1);
        (Self::Read { page_id, slot: tx }, Completion { rx })
    }

    /// Build a write request and its completion slot.
    pub fn write(page_id: PageId, data: Box<[u8]>) -> (Self, Completion<()>) {
        let (tx, rx) = mpsc::sync_channel(1);
        (
            Self::Write {
                page_id,
                data,
                slot: tx,
            },
            Completion { rx },
        )
    }
}

/// Worker pool draining a blocking queue of [`IoRequest`]s against the
/// [`DiskStore`].
///
/// # Shutdown
/// Dropping the scheduler signals the workers to stop, hangs up the queue,
/// and joins them. In-flight requests complete; requests still queued are
/// dropped (their waiters observe [`Error::WorkerFault`]). Callers must not
/// rely on drain guarantees across shutdown.
pub struct IoScheduler {
    disk: Arc<Mutex<DiskStore>>,
    sender: Option<mpsc::Sender<IoRequest>>,
    workers: Vec<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl IoScheduler {
    /// Spawn `num_workers` threads over the given disk store.
    ///
    /// # Panics
    /// Panics if `num_workers` is 0.
    pub fn new(disk_store: DiskStore, num_workers: usize) -> Self {
        assert!(num_workers > 0, "num_workers must be > 0");

        let disk = Arc::new(Mutex::new(disk_store));
        let stop = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::channel::<IoRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..num_workers)
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                let disk = Arc::clone(&disk);
                let stop = Arc::clone(&stop);
                thread::spawn(move || worker_loop(&receiver, &disk, &stop))
            })
            .collect();

        Self {
            disk,
            sender: Some(sender),
            workers,
            stop,
        }
    }

    /// Enqueue a request without blocking.
    ///
    /// If the queue is already hung up, the request (and its completion
    /// slot) is dropped and the waiting caller observes
    /// [`Error::WorkerFault`] instead.
    pub fn schedule(&self, request: IoRequest) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(request);
        }
    }

    /// Release the page's disk slot. Pass-through to the disk store.
    pub fn delete_page(&self, page_id: PageId) {
        self.disk.lock().delete_page(page_id);
    }

    /// Check whether the page is materialized on disk. Pass-through to the
    /// disk store.
    pub fn page_exists(&self, page_id: PageId) -> bool {
        self.disk.lock().page_exists(page_id)
    }

    /// Get the disk store's configured page size.
    pub fn page_size(&self) -> usize {
        self.disk.lock().page_size()
    }
}

impl Drop for IoScheduler {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // Hang up the queue so blocked workers fall out of recv().
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    receiver: &Mutex<mpsc::Receiver<IoRequest>>,
    disk: &Mutex<DiskStore>,
    stop: &AtomicBool,
) {
    loop {
        // Blocking dequeue; holding the receiver lock across recv() makes
        // the other workers queue up behind it rather than spin.
        let request = {
            let receiver = receiver.lock();
            receiver.recv()
        };
        let Ok(request) = request else {
            return;
        };
        if stop.load(Ordering::Relaxed) {
            // Requests still queued at shutdown are dropped.
            return;
        }

        match request {
            IoRequest::Read { page_id, slot } => {
                let mut disk = disk.lock();
                let mut buf = vec![0u8; disk.page_size()].into_boxed_slice();
                let result = disk.read_page(page_id, &mut buf).map(|()| buf);
                drop(disk);
                // The caller may have given up waiting; that is its problem.
                let _ = slot.send(result);
            }
            IoRequest::Write {
                page_id,
                data,
                slot,
            } => {
                let result = disk.lock().write_page(page_id, &data);
                let _ = slot.send(result);
            }
        }
    }
}
