//! Cross-process shared-memory bridge
//!
//! Same handoff contract as the SPSC ring, specialized for two execution
//! contexts that share one memory region but not an allocator: a fixed
//! array of [`FrameSlot`]s plus a single published write index. Only the
//! producer index is published; the consumer privately remembers the last
//! index it consumed and detects new data by comparing indices modulo
//! capacity.
//!
//! # Wire contract (version 1)
//!
//! [`FrameSlot`] is `repr(C)` and versioned by [`SLOT_WIRE_VERSION`]:
//! capture header (caplen, len, ts_sec, ts_usec), derived flow hash,
//! fixed payload array, and a trailing FNV-1a checksum written last by
//! the producer. Any cross-process consumer must match this layout.
//!
//! # Lossy under backpressure
//!
//! If the producer wraps the region before the consumer catches up,
//! not-yet-read slots are silently overwritten. That is the intended
//! delivery policy, not a bug: the bridge trades completeness for bounded
//! producer latency and must never block. Torn reads during an overwrite
//! are detected by the checksum and surfaced as [`SlotError::TornSlot`].
//!
//! # Foreign-owned memory
//!
//! A region built with [`SlotRegion::from_raw_parts`] does not own its
//! backing memory; the caller guarantees the allocation outlives the
//! region. Every slot access is bounds-checked against the declared
//! capacity rather than trusting the external writer.

use crate::DEFAULT_SLOT_COUNT;
use flowgate_common::{CapturedFrame, FlowHash, MAX_SNAPLEN};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Version of the slot layout; bump on any `FrameSlot` change
pub const SLOT_WIRE_VERSION: u32 = 1;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

#[inline(always)]
fn fnv1a(mut h: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// One shared-memory slot (wire contract v1)
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct FrameSlot {
    /// Bytes captured into `payload`
    pub caplen: u32,
    /// Original wire length
    pub len: u32,
    /// Capture timestamp, seconds part
    pub ts_sec: u32,
    /// Capture timestamp, microseconds part
    pub ts_usec: u32,
    /// Derived flow hash
    pub flow_hash: u64,
    /// Payload bytes; only `caplen` are valid
    pub payload: [u8; MAX_SNAPLEN],
    /// FNV-1a over all fields above, written last by the producer
    pub checksum: u64,
}

impl FrameSlot {
    /// An all-zero slot (valid: zero checksum matches zero body)
    pub const fn zeroed() -> Self {
        Self {
            caplen: 0,
            len: 0,
            ts_sec: 0,
            ts_usec: 0,
            flow_hash: 0,
            payload: [0; MAX_SNAPLEN],
            checksum: 0,
        }
    }

    /// Build a slot body from a captured frame (checksum left unset)
    fn from_frame(frame: &CapturedFrame, flow_hash: FlowHash) -> Self {
        let mut slot = Self::zeroed();
        slot.caplen = frame.header.caplen;
        slot.len = frame.header.len;
        slot.ts_sec = frame.header.ts_sec;
        slot.ts_usec = frame.header.ts_usec;
        slot.flow_hash = flow_hash.0;
        slot.payload[..frame.caplen()].copy_from_slice(frame.payload());
        slot
    }

    /// Checksum over the slot body (everything except `checksum`)
    fn body_checksum(&self) -> u64 {
        let caplen = (self.caplen as usize).min(MAX_SNAPLEN);
        let mut h = fnv1a(FNV_OFFSET, &self.caplen.to_le_bytes());
        h = fnv1a(h, &self.len.to_le_bytes());
        h = fnv1a(h, &self.ts_sec.to_le_bytes());
        h = fnv1a(h, &self.ts_usec.to_le_bytes());
        h = fnv1a(h, &self.flow_hash.to_le_bytes());
        fnv1a(h, &self.payload[..caplen])
    }

    /// Whether the stored checksum matches the body
    pub fn verify(&self) -> bool {
        if self.caplen == 0 && self.checksum == 0 {
            // Never-written slot.
            return true;
        }
        self.checksum == self.body_checksum()
    }

    /// Valid payload bytes
    #[inline(always)]
    pub fn payload(&self) -> &[u8] {
        &self.payload[..(self.caplen as usize).min(MAX_SNAPLEN)]
    }
}

impl std::fmt::Debug for FrameSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSlot")
            .field("caplen", &self.caplen)
            .field("len", &self.len)
            .field("ts_sec", &self.ts_sec)
            .field("ts_usec", &self.ts_usec)
            .field("flow_hash", &format_args!("{:016x}", self.flow_hash))
            .field("checksum", &format_args!("{:016x}", self.checksum))
            .finish()
    }
}

/// Slot access errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    /// Checksum mismatch: the slot was being overwritten while read
    #[error("torn slot at index {index}")]
    TornSlot {
        /// Index of the inconsistent slot
        index: usize,
    },
}

/// A fixed array of frame slots with one published producer index
///
/// The write index lives beside the region, not inside the foreign
/// memory; external consumers poll it through the session boundary.
pub struct SlotRegion {
    ptr: NonNull<FrameSlot>,
    capacity: usize,
    write_index: AtomicUsize,
    owned: bool,
}

// Slot contents are raced by design (checksum-validated); the index is
// atomic. The raw pointer is never reallocated for the region's lifetime.
unsafe impl Send for SlotRegion {}
unsafe impl Sync for SlotRegion {}

impl SlotRegion {
    /// Allocate an in-process region with `capacity` slots
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "slot region needs at least one slot");

        let slots = vec![FrameSlot::zeroed(); capacity].into_boxed_slice();
        let ptr = Box::into_raw(slots) as *mut FrameSlot;

        Self {
            // Just came out of a Box.
            ptr: unsafe { NonNull::new_unchecked(ptr) },
            capacity,
            write_index: AtomicUsize::new(0),
            owned: true,
        }
    }

    /// Allocate a region sized by [`DEFAULT_SLOT_COUNT`]
    pub fn with_default_capacity() -> Self {
        Self::with_capacity(DEFAULT_SLOT_COUNT)
    }

    /// Build a region over foreign-owned memory
    ///
    /// # Safety
    ///
    /// `ptr` must point to `capacity` properly aligned, initialized
    /// `FrameSlot`s that remain valid (not freed, not moved) for the
    /// whole lifetime of the returned region, and no other producer may
    /// write through this mapping while the region exists.
    pub unsafe fn from_raw_parts(ptr: *mut FrameSlot, capacity: usize) -> Self {
        assert!(capacity > 0, "slot region needs at least one slot");
        assert!(!ptr.is_null(), "null slot region pointer");
        Self {
            ptr: unsafe { NonNull::new_unchecked(ptr) },
            capacity,
            write_index: AtomicUsize::new(0),
            owned: false,
        }
    }

    /// Number of slots
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current published producer index, in `[0, capacity)`
    #[inline(always)]
    pub fn write_index(&self) -> usize {
        self.write_index.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn publish(&self, next: usize) {
        self.write_index.store(next, Ordering::Release);
    }

    /// Bounds-checked slot pointer; validated on every access
    #[inline(always)]
    fn slot_ptr(&self, index: usize) -> *mut FrameSlot {
        assert!(index < self.capacity, "slot index out of bounds");
        unsafe { self.ptr.as_ptr().add(index) }
    }
}

impl Drop for SlotRegion {
    fn drop(&mut self) {
        if self.owned {
            unsafe {
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                    self.ptr.as_ptr(),
                    self.capacity,
                )));
            }
        }
    }
}

/// Producer view over a region; exactly one writer per region
pub struct SlotWriter {
    region: Arc<SlotRegion>,
    cursor: usize,
}

impl SlotWriter {
    /// Create the writer for a region, starting at its published index
    pub fn new(region: Arc<SlotRegion>) -> Self {
        let cursor = region.write_index();
        Self { region, cursor }
    }

    /// Write the next slot and publish the advanced index
    ///
    /// Never blocks and never fails: a slow consumer's unread slots are
    /// overwritten (lossy-under-backpressure delivery).
    pub fn publish(&mut self, frame: &CapturedFrame, flow_hash: FlowHash) {
        let mut slot = FrameSlot::from_frame(frame, flow_hash);
        let checksum = slot.body_checksum();
        slot.checksum = 0;

        let p = self.region.slot_ptr(self.cursor);
        // Volatile so a concurrently polling reader sees a torn body with
        // a stale checksum rather than a compiler-elided write; the body
        // lands first, the checksum last.
        unsafe {
            ptr::write_volatile(p, slot);
            ptr::write_volatile(ptr::addr_of_mut!((*p).checksum), checksum);
        }

        let next = (self.cursor + 1) % self.region.capacity();
        self.region.publish(next);
        self.cursor = next;
    }

    /// The shared region this writer publishes into
    pub fn region(&self) -> &Arc<SlotRegion> {
        &self.region
    }
}

/// Consumer view over a region
///
/// Tracks its own read position; the producer never sees it. A reader
/// that falls a full lap behind silently loses that lap of slots.
pub struct SlotReader {
    region: Arc<SlotRegion>,
    last_read: usize,
}

impl SlotReader {
    /// Create a reader starting at slot 0
    pub fn new(region: Arc<SlotRegion>) -> Self {
        Self {
            region,
            last_read: 0,
        }
    }

    /// Number of slots published but not yet read
    pub fn pending(&self) -> usize {
        let published = self.region.write_index();
        (published + self.region.capacity() - self.last_read) % self.region.capacity()
    }

    /// Copy out the next unread slot, if any
    ///
    /// Advances past torn slots so one overwrite race cannot wedge the
    /// reader.
    pub fn poll_next(&mut self) -> Option<Result<FrameSlot, SlotError>> {
        let published = self.region.write_index();
        if self.last_read == published {
            return None;
        }

        let index = self.last_read;
        let slot = unsafe { ptr::read_volatile(self.region.slot_ptr(index)) };
        self.last_read = (index + 1) % self.region.capacity();

        if slot.verify() {
            Some(Ok(slot))
        } else {
            Some(Err(SlotError::TornSlot { index }))
        }
    }

    /// Drain all currently pending slots into `out`, skipping torn ones;
    /// returns how many valid slots were copied
    pub fn drain_into(&mut self, out: &mut Vec<FrameSlot>) -> usize {
        let mut copied = 0;
        while let Some(result) = self.poll_next() {
            if let Ok(slot) = result {
                out.push(slot);
                copied += 1;
            }
        }
        copied
    }
}
