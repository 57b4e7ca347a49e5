//! Fixed-capacity blocking FIFO shared by many producers and one consumer.
//!
//! Producers call [`BlockingQueue::try_push`] from any thread; a full queue
//! makes the push fail immediately instead of blocking or dropping, handing
//! the rejected element back so the caller decides its own retry policy. The
//! consumer side blocks in [`BlockingQueue::pop`] until an element arrives.
//! Nothing in the type restricts the number of poppers, but the intended
//! deployment is a single consumer thread driven from across an RPC boundary.

use crate::{TransportError, TransportResult};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// Multi-producer FIFO with a fixed capacity and a blocking consumer side.
pub struct BlockingQueue<T> {
    inner: Mutex<VecDeque<T>>,
    ready: Condvar,
    capacity: usize,
}

impl<T> BlockingQueue<T> {
    /// Creates a queue that holds at most `capacity` elements.
    ///
    /// The capacity is fixed for the lifetime of the queue; storage is
    /// reserved up front so pushes never allocate.
    pub fn with_capacity(capacity: usize) -> TransportResult<Self> {
        if capacity == 0 {
            return Err(TransportError::InvalidCapacity {
                requested: capacity,
            });
        }
        Ok(Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            ready: Condvar::new(),
            capacity,
        })
    }

    /// Appends `value` at the tail without blocking.
    ///
    /// When the queue is already at capacity the element comes straight back
    /// as `Err(value)` and the queue is left untouched.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let mut queue = self.inner.lock();
        if queue.len() == self.capacity {
            return Err(value);
        }
        queue.push_back(value);
        drop(queue);
        self.ready.notify_one();
        Ok(())
    }

    /// Removes and returns the head element, blocking until one exists.
    pub fn pop(&self) -> T {
        let mut queue = self.inner.lock();
        loop {
            if let Some(value) = queue.pop_front() {
                return value;
            }
            self.ready.wait(&mut queue);
        }
    }

    /// Number of queued elements at the instant the lock was held.
    ///
    /// Purely a polling snapshot: by the time the caller acts on it another
    /// thread may have pushed or popped.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Snapshot emptiness check; same caveats as [`BlockingQueue::len`].
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Maximum number of elements the queue accepts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
