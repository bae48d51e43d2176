//! Single-producer/single-consumer ring buffer
//!
//! Fixed-capacity circular queue for lock-free handoff inside one
//! process. The single-producer/single-consumer restriction is enforced
//! by ownership: [`RingBuffer::with_capacity`] splits into one
//! [`Producer`] and one [`Consumer`], neither of which is cloneable.
//! Multi-producer or multi-consumer use needs a different structure.
//!
//! # Ordering contract
//!
//! The producer writes the whole item into its slot, then publishes the
//! advanced cursor with `Release`. The consumer loads the producer cursor
//! with `Acquire` before reading slot contents. That pairing is the sole
//! correctness mechanism; there is no lock on the data path.
//!
//! A capacity-C buffer holds at most C-1 items: the buffer is full when
//! advancing the producer cursor would make it equal the consumer cursor
//! (one slot stays reserved to disambiguate full from empty).

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Push failed because the buffer was full; gives the item back
pub struct Full<T>(pub T);

impl<T> std::fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Full(..)")
    }
}

impl<T> std::fmt::Display for Full<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ring buffer full")
    }
}

impl<T> std::error::Error for Full<T> {}

/// Pop failed because the buffer was empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("ring buffer empty")]
pub struct Empty;

struct Inner<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Consumer cursor (next slot to pop)
    head: CachePadded<AtomicUsize>,
    /// Producer cursor (next slot to fill)
    tail: CachePadded<AtomicUsize>,
}

// Slots are only touched by whichever endpoint the cursors hand them to.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        // Both endpoints are gone; cursors are quiescent.
        let mut head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        while head != tail {
            unsafe { (*self.slots[head].get()).assume_init_drop() };
            head = (head + 1) % self.slots.len();
        }
    }
}

/// SPSC ring buffer constructor
pub struct RingBuffer<T> {
    _marker: std::marker::PhantomData<T>,
}

impl<T: Send> RingBuffer<T> {
    /// Create a buffer with `capacity` slots and split it into its two
    /// endpoints. Holds at most `capacity - 1` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2` (one slot is always reserved).
    pub fn with_capacity(capacity: usize) -> (Producer<T>, Consumer<T>) {
        assert!(capacity >= 2, "ring buffer needs at least 2 slots");

        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let inner = Arc::new(Inner {
            slots,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        });

        (
            Producer {
                inner: Arc::clone(&inner),
            },
            Consumer { inner },
        )
    }
}

/// Producing endpoint; owned by exactly one thread at a time
pub struct Producer<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send> Producer<T> {
    /// Push one item. Never blocks; a full buffer fails immediately and
    /// returns the item, leaving the drop-vs-retry policy to the caller.
    #[inline]
    pub fn push(&mut self, item: T) -> Result<(), Full<T>> {
        let inner = &*self.inner;
        let tail = inner.tail.load(Ordering::Relaxed);
        let next = (tail + 1) % inner.slots.len();

        if next == inner.head.load(Ordering::Acquire) {
            return Err(Full(item));
        }

        unsafe { (*inner.slots[tail].get()).write(item) };
        inner.tail.store(next, Ordering::Release);
        Ok(())
    }

    /// Number of slots (one stays reserved)
    pub fn capacity(&self) -> usize {
        self.inner.slots.len()
    }
}

/// Consuming endpoint; owned by exactly one thread at a time
pub struct Consumer<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send> Consumer<T> {
    /// Pop one item. Never blocks; an empty buffer fails immediately and
    /// the caller should back off or poll.
    #[inline]
    pub fn pop(&mut self) -> Result<T, Empty> {
        let inner = &*self.inner;
        let head = inner.head.load(Ordering::Relaxed);

        if head == inner.tail.load(Ordering::Acquire) {
            return Err(Empty);
        }

        let item = unsafe { (*inner.slots[head].get()).assume_init_read() };
        inner.head.store((head + 1) % inner.slots.len(), Ordering::Release);
        Ok(item)
    }

    /// Number of items currently held (approximate under concurrency)
    pub fn len(&self) -> usize {
        let inner = &*self.inner;
        let head = inner.head.load(Ordering::Relaxed);
        let tail = inner.tail.load(Ordering::Acquire);
        (tail + inner.slots.len() - head) % inner.slots.len()
    }

    /// Whether the buffer currently holds no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots (one stays reserved)
    pub fn capacity(&self) -> usize {
        self.inner.slots.len()
    }
}
