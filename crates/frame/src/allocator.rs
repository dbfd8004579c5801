use std::sync::{Arc, Condvar, Mutex, Weak};

use crate::error::AllocatorError;
use crate::frame::{Frame, FrameBuffer};

/// A fixed-size pool of reusable buffer slots backing one Output (spec §4.1
/// "Pool allocator (bounded)").
///
/// `alloc` blocks the caller until a slot is available; this is the
/// runtime's only back-pressure mechanism (spec §4.2/§9). `shutdown` wakes
/// every blocked caller and causes subsequent `alloc` calls to fail instead
/// of blocking, mirroring the C++ `unblock()` sentinel-return behavior.
pub struct Allocator {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    condvar: Condvar,
    max_blocks: usize,
}

struct State {
    issued: usize,
    shutting_down: bool,
}

/// A point-in-time snapshot of allocator occupancy, useful for tests and
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorStats {
    pub issued: usize,
    pub max_blocks: usize,
}

impl Allocator {
    /// Create a bounded allocator with `max_blocks` reusable slots.
    pub fn new(max_blocks: usize) -> Self {
        assert!(max_blocks > 0, "allocator must have at least one block");
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    issued: 0,
                    shutting_down: false,
                }),
                condvar: Condvar::new(),
                max_blocks,
            }),
        }
    }

    /// Block until a slot is free, then return a zero-filled [`Frame`] of
    /// `size` bytes tied to this allocator. Returns
    /// `Err(AllocatorError::ShuttingDown)` if the allocator is shut down
    /// while waiting (or already was).
    pub fn alloc(&self, size: usize) -> Result<Frame, AllocatorError> {
        let mut state = self.inner.state.lock().unwrap();
        loop {
            if state.shutting_down {
                return Err(AllocatorError::ShuttingDown);
            }
            if state.issued < self.inner.max_blocks {
                state.issued += 1;
                drop(state);
                let buffer = FrameBuffer::new_owned(vec![0u8; size], Arc::downgrade(&self.inner));
                return Ok(Frame::from_buffer(Arc::new(buffer)));
            }
            state = self.inner.condvar.wait(state).unwrap();
        }
    }

    /// Unblock all pending and future allocations; drained on Pipeline
    /// shutdown (spec §3 invariant: "Pipeline shutdown unblocks all
    /// allocators").
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.shutting_down = true;
        self.inner.condvar.notify_all();
    }

    pub fn stats(&self) -> AllocatorStats {
        let state = self.inner.state.lock().unwrap();
        AllocatorStats {
            issued: state.issued,
            max_blocks: self.inner.max_blocks,
        }
    }
}

/// Release hook invoked when the last reference to an allocated buffer
/// drops; called from [`FrameBuffer`]'s `Drop` impl via the weak back-link.
pub(crate) trait Releasable {
    fn release(&self);
}

impl Releasable for Inner {
    fn release(&self) {
        let mut state = self.state.lock().unwrap();
        state.issued = state.issued.saturating_sub(1);
        self.condvar.notify_one();
    }
}

pub(crate) type AllocatorBackref = Weak<Inner>;

pub(crate) fn release_backref(backref: &AllocatorBackref) {
    if let Some(inner) = backref.upgrade() {
        inner.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn issued_and_freed_balance_on_drop() {
        let alloc = Allocator::new(2);
        let f1 = alloc.alloc(16).unwrap();
        let f2 = alloc.alloc(16).unwrap();
        assert_eq!(alloc.stats().issued, 2);
        drop(f1);
        assert_eq!(alloc.stats().issued, 1);
        drop(f2);
        assert_eq!(alloc.stats().issued, 0);
    }

    #[test]
    fn alloc_blocks_until_slot_freed() {
        let alloc = Arc::new(Allocator::new(1));
        let f1 = alloc.alloc(8).unwrap();

        let alloc2 = alloc.clone();
        let unblocked = Arc::new(AtomicUsize::new(0));
        let unblocked2 = unblocked.clone();
        let handle = thread::spawn(move || {
            let _f2 = alloc2.alloc(8).unwrap();
            unblocked2.store(1, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(50));
        assert_eq!(unblocked.load(Ordering::SeqCst), 0);

        drop(f1);
        handle.join().unwrap();
        assert_eq!(unblocked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shutdown_unblocks_and_fails_future_allocs() {
        let alloc = Arc::new(Allocator::new(1));
        let _f1 = alloc.alloc(8).unwrap();

        let alloc2 = alloc.clone();
        let handle = thread::spawn(move || alloc2.alloc(8));

        thread::sleep(Duration::from_millis(30));
        alloc.shutdown();
        let result = handle.join().unwrap();
        assert_eq!(result, Err(AllocatorError::ShuttingDown));

        assert_eq!(alloc.alloc(8), Err(AllocatorError::ShuttingDown));
    }
}
